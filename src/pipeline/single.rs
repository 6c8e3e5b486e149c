//! Single-candidate orchestration
//!
//! One query per attempt, at most `MAX_ATTEMPTS` attempts. Routing hints go
//! into the first prompt only; every later prompt carries the previous SQL
//! and the reason it was rejected.

use super::prompts::{sql_prompt, Feedback, PromptHints};
use super::summary::{fallback_summary, summarize, summary_prompt};
use super::{
    merge_warnings, AttemptResult, AttemptTrace, Copilot, PipelineOutput, RunContext, RunOptions,
    TraceOutcome, MAX_ATTEMPTS,
};
use crate::audit::audit_source;
use crate::error::{CopilotError, Result};
use crate::execution::ExecutionResult;
use crate::routing::RoutingDecision;
use crate::schema::AllowedSchema;
use crate::sql::validate_and_patch;
use tracing::{info, warn};

/// Query accepted by one attempt.
struct Accepted {
    sql: String,
    result: ExecutionResult,
}

impl Copilot {
    /// Answer `question` with one candidate query per attempt.
    pub async fn run(&self, question: &str, options: &RunOptions) -> Result<PipelineOutput> {
        let ctx = RunContext::new(question, self.router.route(question));
        info!(
            "[{}] Routed question: intent={}, relation={}",
            ctx.run_id, ctx.routing.intent, ctx.routing.recommended_relation
        );

        let snapshot = match self.schema.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return ctx.terminal(format!("Schema unavailable: {}", e), Vec::new(), Vec::new(), options)
            }
        };
        let hints = PromptHints::assemble(question, &ctx.routing, self.default_limit);

        let mut trace: Vec<AttemptTrace> = Vec::with_capacity(MAX_ATTEMPTS);
        let mut feedback: Option<Feedback> = None;
        let mut last_reason = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            info!("[{}] SQL attempt {} of {}", ctx.run_id, attempt, MAX_ATTEMPTS);

            let prompt = if attempt == 1 {
                sql_prompt(question, &snapshot.schema_text, Some(&hints), None)
            } else {
                sql_prompt(question, &snapshot.schema_text, None, feedback.as_ref())
            };

            let mut entry = AttemptTrace::new(attempt);
            let outcome = self
                .attempt(&prompt, question, &snapshot.allowed, &ctx.routing, attempt, &mut entry)
                .await;

            match outcome {
                AttemptResult::Success(accepted) => {
                    entry.outcome = TraceOutcome::Success;
                    trace.push(entry);
                    info!(
                        "[{}] Attempt {} accepted ({} rows)",
                        ctx.run_id, attempt, accepted.result.row_count
                    );
                    let summary = if options.summarize {
                        let prompt = summary_prompt(question, &accepted.sql, &accepted.result);
                        summarize(self.generator.as_ref(), &prompt, accepted.result.row_count).await
                    } else {
                        fallback_summary(accepted.result.row_count)
                    };
                    return Ok(ctx.success(
                        accepted.sql,
                        accepted.result,
                        summary,
                        trace,
                        Vec::new(),
                        options,
                    ));
                }
                AttemptResult::Retryable(reason) if attempt < MAX_ATTEMPTS => {
                    warn!("[{}] Attempt {} rejected: {}", ctx.run_id, attempt, reason);
                    entry.outcome = TraceOutcome::Retry;
                    entry.error = Some(reason.clone());
                    entry.retry_reason = Some(reason.clone());
                    feedback = Some(Feedback {
                        previous_sql: entry.validated_sql.clone().or_else(|| entry.raw_sql.clone()),
                        reason,
                    });
                    trace.push(entry);
                }
                AttemptResult::Retryable(reason) | AttemptResult::Terminal(reason) => {
                    entry.outcome = TraceOutcome::Error;
                    entry.error = Some(reason.clone());
                    trace.push(entry);
                    last_reason = reason;
                    break;
                }
            }
        }

        ctx.terminal(last_reason, trace, Vec::new(), options)
    }

    /// Generate, validate, audit and execute once, recording what happened
    /// in `entry`.
    async fn attempt(
        &self,
        prompt: &str,
        question: &str,
        allowed: &AllowedSchema,
        routing: &RoutingDecision,
        attempt: usize,
        entry: &mut AttemptTrace,
    ) -> AttemptResult<Accepted> {
        let raw = match self.generator.generate_sql(prompt).await {
            Ok(sql) => sql,
            Err(e @ CopilotError::Config(_)) => return AttemptResult::Terminal(e.to_string()),
            Err(e) => return AttemptResult::Retryable(format!("SQL generation failed: {}", e)),
        };
        entry.raw_sql = Some(raw.clone());

        let validated = match validate_and_patch(&raw, self.default_limit, allowed, Some(question)) {
            Ok(validated) => validated,
            Err(e) => return AttemptResult::Retryable(e.to_string()),
        };
        entry.validated_sql = Some(validated.sql.clone());

        let source = audit_source(&validated.sql, routing);
        let warning = merge_warnings(validated.warning.as_ref(), source.as_ref());
        entry.warning = warning.clone();
        if let Some(warning) = warning {
            if attempt == 1 {
                return AttemptResult::Retryable(warning);
            }
            warn!("Executing attempt {} despite advisory: {}", attempt, warning);
        }

        let result = match self.executor.execute_read_only(&validated.sql).await {
            Ok(result) => result,
            Err(e) => return AttemptResult::Retryable(e.to_string()),
        };
        entry.row_count = Some(result.row_count);

        if result.is_empty() {
            return AttemptResult::Retryable(
                "Query returned 0 rows. Check team names, season filters and the relation used."
                    .to_string(),
            );
        }
        if routing.superlative && result.row_count == 1 {
            info!("Record question answered by a single row; check the query keeps ties");
        }

        AttemptResult::Success(Accepted {
            sql: validated.sql,
            result,
        })
    }
}
