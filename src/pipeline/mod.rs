//! Orchestration
//!
//! Drives question -> routing -> generation -> validation -> audit ->
//! execution -> summary, either one candidate at a time with a bounded
//! retry budget (`single`) or as a concurrent batch of candidates (`multi`).

pub mod candidates;
pub mod multi;
pub mod prompts;
pub mod single;
pub mod summary;

use crate::config::CopilotConfig;
use crate::error::{Advisory, CopilotError, Result};
use crate::execution::{ExecutionResult, QueryExecutor, Row};
use crate::llm::TextGenerator;
use crate::routing::{format_retry_token, Router, RoutingDecision, RETRY_TOKEN};
use crate::schema::SchemaProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Total generate/validate/execute attempts on the single-candidate path.
pub const MAX_ATTEMPTS: usize = 3;

/// Candidates requested per multi-candidate batch.
pub const CANDIDATE_COUNT: usize = 3;

/// Batches on the multi-candidate path: the first plus one consolidated retry.
pub const MAX_BATCHES: usize = 2;

/// Rows sent to the summarizer on the single-candidate path.
pub const SUMMARY_ROW_CAP: usize = 20;

/// Rows per candidate sent to the summarizer on the multi-candidate path.
pub const CANDIDATE_SUMMARY_ROW_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub summarize: bool,
    pub include_rows: bool,
    /// Return `Err(CopilotError::TerminalFailure)` instead of a retry-token output.
    pub raise_on_terminal_failure: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            summarize: true,
            include_rows: true,
            raise_on_terminal_failure: false,
        }
    }
}

/// What one attempt (or one batch) amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult<T> {
    Success(T),
    Retryable(String),
    Terminal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    Success,
    Retry,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptTrace {
    pub attempt_number: usize,
    pub raw_sql: Option<String>,
    pub validated_sql: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
    pub row_count: Option<usize>,
    pub outcome: TraceOutcome,
    pub retry_reason: Option<String>,
}

impl AttemptTrace {
    fn new(attempt_number: usize) -> Self {
        Self {
            attempt_number,
            raw_sql: None,
            validated_sql: None,
            warning: None,
            error: None,
            row_count: None,
            outcome: TraceOutcome::Error,
            retry_reason: None,
        }
    }
}

/// Per-candidate detail on the multi-candidate path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub batch: usize,
    pub index: usize,
    pub approach: String,
    pub primary_relation: String,
    pub raw_sql: String,
    pub validated_sql: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
    pub row_count: Option<usize>,
    pub timed_out: bool,
}

impl CandidateReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.row_count.map_or(false, |n| n > 0)
    }
}

/// Terminal value of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub question: String,
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows the query returned, even when `rows` is omitted from the output.
    pub row_count: usize,
    pub summary: String,
    pub retry_token: Option<String>,
    pub retry_reason: Option<String>,
    pub attempt_count: usize,
    pub trace: Vec<AttemptTrace>,
    pub routing: RoutingDecision,
    pub candidates: Vec<CandidateReport>,
}

impl PipelineOutput {
    pub fn is_success(&self) -> bool {
        self.retry_token.is_none()
    }
}

/// Joins validator and auditor advisories into one feedback string.
fn merge_warnings(validator: Option<&Advisory>, auditor: Option<&Advisory>) -> Option<String> {
    let parts: Vec<String> = [validator, auditor]
        .into_iter()
        .flatten()
        .map(|a| a.to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// Identity of one run, shared by both orchestrators when building output.
struct RunContext<'a> {
    run_id: Uuid,
    question: &'a str,
    routing: RoutingDecision,
}

impl<'a> RunContext<'a> {
    fn new(question: &'a str, routing: RoutingDecision) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            question,
            routing,
        }
    }

    fn success(
        self,
        sql: String,
        result: ExecutionResult,
        summary: String,
        trace: Vec<AttemptTrace>,
        candidates: Vec<CandidateReport>,
        options: &RunOptions,
    ) -> PipelineOutput {
        let ExecutionResult {
            columns,
            rows,
            row_count,
        } = result;
        PipelineOutput {
            run_id: self.run_id,
            question: self.question.to_string(),
            sql,
            columns,
            rows: if options.include_rows { rows } else { Vec::new() },
            row_count,
            summary,
            retry_token: None,
            retry_reason: None,
            attempt_count: trace.len(),
            trace,
            routing: self.routing,
            candidates,
        }
    }

    /// Retry-token output, or `TerminalFailure` when the caller asked for it.
    fn terminal(
        self,
        reason: String,
        trace: Vec<AttemptTrace>,
        candidates: Vec<CandidateReport>,
        options: &RunOptions,
    ) -> Result<PipelineOutput> {
        let attempts = trace.len();
        warn!("[{}] Giving up after {} attempt(s): {}", self.run_id, attempts, reason);
        if options.raise_on_terminal_failure {
            return Err(CopilotError::TerminalFailure { reason, attempts });
        }

        let summary = if self.routing.ambiguous {
            format_retry_token(self.question, &self.routing)
        } else {
            format!("{}\nRETRY_REASON: {}", RETRY_TOKEN, reason)
        };
        let sql = trace
            .iter()
            .rev()
            .find_map(|t| t.validated_sql.clone().or_else(|| t.raw_sql.clone()))
            .unwrap_or_default();

        Ok(PipelineOutput {
            run_id: self.run_id,
            question: self.question.to_string(),
            sql,
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            summary,
            retry_token: Some(RETRY_TOKEN.to_string()),
            retry_reason: Some(reason),
            attempt_count: attempts,
            trace,
            routing: self.routing,
            candidates,
        })
    }
}

/// Natural-language-to-SQL copilot over the Premier League analytics schema.
pub struct Copilot {
    generator: Arc<dyn TextGenerator>,
    executor: Arc<dyn QueryExecutor>,
    schema: Arc<dyn SchemaProvider>,
    router: Router,
    default_limit: u64,
    candidate_timeout: Duration,
}

impl Copilot {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        executor: Arc<dyn QueryExecutor>,
        schema: Arc<dyn SchemaProvider>,
    ) -> Self {
        let defaults = CopilotConfig::default();
        Self {
            generator,
            executor,
            schema,
            router: Router::default(),
            default_limit: defaults.default_limit,
            candidate_timeout: defaults.candidate_timeout,
        }
    }

    pub fn with_config(mut self, config: &CopilotConfig) -> Self {
        self.default_limit = config.default_limit;
        self.candidate_timeout = config.candidate_timeout;
        self
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_warnings() {
        let intent = Advisory::IntentMismatch("player view".to_string());
        let source = Advisory::SourceMismatch("WRONG SOURCE: use v_team_season_summary".to_string());
        assert_eq!(merge_warnings(None, None), None);
        assert_eq!(
            merge_warnings(Some(&intent), Some(&source)).unwrap(),
            "INTENT MISMATCH: player view\nWRONG SOURCE: use v_team_season_summary"
        );
    }

    #[test]
    fn test_terminal_output_carries_token() {
        let ctx = RunContext::new("Which player scored most?", crate::routing::route("Which player scored most?"));
        let mut entry = AttemptTrace::new(1);
        entry.raw_sql = Some("SELECT 1".to_string());
        let output = ctx
            .terminal("returned 0 rows".to_string(), vec![entry], Vec::new(), &RunOptions::default())
            .unwrap();
        assert!(!output.is_success());
        assert_eq!(output.attempt_count, 1);
        assert_eq!(output.sql, "SELECT 1");
        assert_eq!(output.summary, format!("{}\nRETRY_REASON: returned 0 rows", RETRY_TOKEN));
    }

    #[test]
    fn test_terminal_can_raise() {
        let ctx = RunContext::new("q", crate::routing::route("q"));
        let options = RunOptions {
            raise_on_terminal_failure: true,
            ..RunOptions::default()
        };
        let err = ctx.terminal("boom".to_string(), Vec::new(), Vec::new(), &options).unwrap_err();
        assert!(matches!(err, CopilotError::TerminalFailure { attempts: 0, .. }));
    }

    #[test]
    fn test_candidate_success_requires_rows() {
        let mut report = CandidateReport {
            batch: 1,
            index: 0,
            approach: "direct".to_string(),
            primary_relation: "v_team_season_summary".to_string(),
            raw_sql: "SELECT 1".to_string(),
            validated_sql: Some("SELECT 1 LIMIT 200".to_string()),
            warning: None,
            error: None,
            row_count: Some(0),
            timed_out: false,
        };
        assert!(!report.succeeded());
        report.row_count = Some(2);
        assert!(report.succeeded());
        report.error = Some("boom".to_string());
        assert!(!report.succeeded());
    }
}
