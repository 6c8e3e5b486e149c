use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pl_copilot::db::{PgExecutor, PgSchemaProvider};
use pl_copilot::schema::CachedSchemaProvider;
use pl_copilot::{
    route, validate_and_patch, Copilot, CopilotConfig, LlmClient, PipelineOutput, RunOptions,
    SchemaSnapshot,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pl-copilot")]
#[command(about = "Natural-language questions over the Premier League analytics database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question (or every line of --file)
    Ask {
        /// The question in natural language
        question: Option<String>,

        /// File with one question per line
        #[arg(short, long, conflicts_with = "question")]
        file: Option<PathBuf>,

        /// Generate and run several candidate queries concurrently
        #[arg(long)]
        multi: bool,

        /// Skip the natural-language summary
        #[arg(long)]
        no_summary: bool,

        /// Omit result rows from the output
        #[arg(long)]
        no_rows: bool,

        /// Exit with an error instead of printing a retry token
        #[arg(long)]
        strict: bool,

        /// Print the full output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the routing decision for a question without calling any service
    Route { question: String },

    /// Validate and patch SQL against the allow-list (no database needed)
    Validate {
        sql: String,

        /// Question the SQL is meant to answer, for intent advisories
        #[arg(long)]
        question: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pl_copilot=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CopilotConfig::from_env()?;

    match cli.command {
        Command::Route { question } => {
            println!("{}", serde_json::to_string_pretty(&route(&question))?);
        }

        Command::Validate { sql, question } => {
            let snapshot = SchemaSnapshot::relations_only();
            match validate_and_patch(&sql, config.default_limit, &snapshot.allowed, question.as_deref()) {
                Ok(validated) => println!("{}", serde_json::to_string_pretty(&validated)?),
                Err(e) => {
                    error!("Rejected: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Command::Ask {
            question,
            file,
            multi,
            no_summary,
            no_rows,
            strict,
            json,
        } => {
            let questions = match (question, file) {
                (Some(q), _) => vec![q],
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_string)
                    .collect(),
                (None, None) => anyhow::bail!("provide a question or --file"),
            };

            let copilot = build_copilot(&config).await?;
            let options = RunOptions {
                summarize: !no_summary,
                include_rows: !no_rows,
                raise_on_terminal_failure: strict,
            };

            for question in &questions {
                info!("Question: {}", question);
                let output = if multi {
                    copilot.run_multi_candidate(question, &options).await?
                } else {
                    copilot.run(question, &options).await?
                };
                print_output(&output, json)?;
            }
        }
    }

    Ok(())
}

async fn build_copilot(config: &CopilotConfig) -> Result<Copilot> {
    let llm = LlmClient::from_config(config)?;
    let executor = PgExecutor::connect(config).await?;
    let schema = CachedSchemaProvider::new(PgSchemaProvider::new(executor.pool().clone()));
    Ok(Copilot::new(Arc::new(llm), Arc::new(executor), Arc::new(schema)).with_config(config))
}

fn print_output(output: &PipelineOutput, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }

    println!("\n=== {} ===", output.question);
    println!("Intent: {} ({})", output.routing.intent, output.routing.recommended_relation);
    println!("Attempts: {}", output.attempt_count);
    if !output.sql.is_empty() {
        println!("\nSQL:\n{}", output.sql);
    }
    if !output.rows.is_empty() {
        println!("\nRows ({}):", output.row_count);
        for row in &output.rows {
            println!("  {}", serde_json::to_string(row)?);
        }
    }
    println!("\n{}", output.summary);
    Ok(())
}
