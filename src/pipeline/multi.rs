//! Multi-candidate orchestration
//!
//! Asks for `CANDIDATE_COUNT` structurally different queries in one JSON
//! response, validates them in generation order and executes the valid ones
//! concurrently. A batch succeeds when any candidate returns rows; otherwise
//! one consolidated retry batch is generated from every failure reason.

use super::candidates::{parse_candidates, Candidate};
use super::prompts::{multi_candidate_prompt, PromptHints};
use super::summary::{candidates_prompt, fallback_summary, summarize};
use super::{
    merge_warnings, AttemptTrace, CandidateReport, Copilot, PipelineOutput, RunContext, RunOptions,
    TraceOutcome, CANDIDATE_COUNT, MAX_BATCHES,
};
use crate::audit::audit_source;
use crate::error::{CopilotError, Result};
use crate::execution::ExecutionResult;
use crate::routing::RoutingDecision;
use crate::schema::AllowedSchema;
use crate::sql::validate_and_patch;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// One candidate's report and, when it executed, its rows.
type CandidateRun = (CandidateReport, Option<ExecutionResult>);

impl Copilot {
    /// Answer `question` from a concurrent batch of candidate queries.
    ///
    /// Falls back to [`Copilot::run`] when the first batch yields no usable
    /// candidate at all.
    pub async fn run_multi_candidate(
        &self,
        question: &str,
        options: &RunOptions,
    ) -> Result<PipelineOutput> {
        let ctx = RunContext::new(question, self.router.route(question));
        info!(
            "[{}] Routed question (multi-candidate): intent={}, relation={}",
            ctx.run_id, ctx.routing.intent, ctx.routing.recommended_relation
        );

        let snapshot = match self.schema.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return ctx.terminal(format!("Schema unavailable: {}", e), Vec::new(), Vec::new(), options)
            }
        };
        let hints = PromptHints::assemble(question, &ctx.routing, self.default_limit);

        let mut trace: Vec<AttemptTrace> = Vec::with_capacity(MAX_BATCHES);
        let mut reports: Vec<CandidateReport> = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        for batch in 1..=MAX_BATCHES {
            info!("[{}] Candidate batch {} of {}", ctx.run_id, batch, MAX_BATCHES);

            let batch_hints = if batch == 1 { Some(&hints) } else { None };
            let prompt = multi_candidate_prompt(
                question,
                &snapshot.schema_text,
                batch_hints,
                &failures,
                CANDIDATE_COUNT,
            );

            let candidates = match self.generator.generate_json(&prompt).await {
                Ok(text) => parse_candidates(&text),
                Err(e) => {
                    warn!("[{}] Candidate generation failed: {}", ctx.run_id, e);
                    Vec::new()
                }
            };

            let mut entry = AttemptTrace::new(batch);
            if candidates.is_empty() {
                if batch == 1 {
                    info!("[{}] No usable candidates, falling back to single-candidate path", ctx.run_id);
                    return self.run(question, options).await;
                }
                let reason = "Retry batch produced no usable candidates".to_string();
                entry.error = Some(reason.clone());
                trace.push(entry);
                failures = vec![reason];
                break;
            }

            let runs = self
                .run_batch(batch, candidates, &snapshot.allowed, question, &ctx.routing)
                .await;
            reports.extend(runs.iter().map(|(report, _)| report.clone()));

            if let Some(selected) = select(&runs) {
                let (report, result) = &runs[selected];
                let result = result.clone().unwrap_or_default();
                let sql = report.validated_sql.clone().unwrap_or_default();
                entry.raw_sql = Some(report.raw_sql.clone());
                entry.validated_sql = report.validated_sql.clone();
                entry.warning = report.warning.clone();
                entry.row_count = Some(result.row_count);
                entry.outcome = TraceOutcome::Success;
                trace.push(entry);
                info!(
                    "[{}] Batch {} succeeded with candidate {} ({} rows)",
                    ctx.run_id,
                    batch,
                    selected + 1,
                    result.row_count
                );

                let summary = if options.summarize {
                    let prompt = candidates_prompt(question, &ctx.routing, &runs);
                    summarize(self.generator.as_ref(), &prompt, result.row_count).await
                } else {
                    fallback_summary(result.row_count)
                };
                return Ok(ctx.success(sql, result, summary, trace, reports, options));
            }

            failures = runs.iter().map(|(report, _)| failure_line(report)).collect();
            let first = &runs[0].0;
            entry.raw_sql = Some(first.raw_sql.clone());
            entry.validated_sql = first.validated_sql.clone();
            entry.warning = first.warning.clone();
            entry.row_count = first.row_count;
            entry.error = Some(failures.join("; "));
            if batch < MAX_BATCHES {
                entry.outcome = TraceOutcome::Retry;
                entry.retry_reason = entry.error.clone();
                warn!("[{}] Every candidate in batch {} failed", ctx.run_id, batch);
            }
            trace.push(entry);
        }

        ctx.terminal(failures.join("; "), trace, reports, options)
    }

    /// Validate every candidate, then execute the valid ones concurrently,
    /// each under its own timeout. Returns once all of them have finished,
    /// in generation order.
    async fn run_batch(
        &self,
        batch: usize,
        candidates: Vec<Candidate>,
        allowed: &AllowedSchema,
        question: &str,
        routing: &RoutingDecision,
    ) -> Vec<CandidateRun> {
        let permits = Arc::new(Semaphore::new(CANDIDATE_COUNT));
        let timeout = self.candidate_timeout;
        let mut runs: Vec<CandidateRun> = Vec::with_capacity(candidates.len());
        let mut handles = Vec::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let mut report = CandidateReport {
                batch,
                index,
                approach: candidate.approach,
                primary_relation: candidate.primary_relation,
                raw_sql: candidate.sql,
                validated_sql: None,
                warning: None,
                error: None,
                row_count: None,
                timed_out: false,
            };

            match validate_and_patch(&report.raw_sql, self.default_limit, allowed, Some(question)) {
                Ok(validated) => {
                    let source = audit_source(&validated.sql, routing);
                    report.warning = merge_warnings(validated.warning.as_ref(), source.as_ref());
                    if report.primary_relation.is_empty() {
                        report.primary_relation = validated.relations.first().cloned().unwrap_or_default();
                    }
                    report.validated_sql = Some(validated.sql.clone());

                    let executor = Arc::clone(&self.executor);
                    let permits = Arc::clone(&permits);
                    let sql = validated.sql;
                    handles.push((
                        index,
                        tokio::spawn(async move {
                            let _permit = match permits.acquire_owned().await {
                                Ok(permit) => permit,
                                Err(e) => return Some(Err(CopilotError::Execution(e.to_string()))),
                            };
                            tokio::time::timeout(timeout, executor.execute_read_only(&sql))
                                .await
                                .ok()
                        }),
                    ));
                }
                Err(e) => {
                    debug!("Candidate {} of batch {} rejected: {}", index + 1, batch, e);
                    report.error = Some(e.to_string());
                }
            }
            runs.push((report, None));
        }

        for (index, handle) in handles {
            let (report, slot) = &mut runs[index];
            match handle.await {
                Ok(Some(Ok(result))) => {
                    report.row_count = Some(result.row_count);
                    if result.is_empty() {
                        report.error = Some("Query returned 0 rows".to_string());
                    }
                    *slot = Some(result);
                }
                Ok(Some(Err(e))) => report.error = Some(e.to_string()),
                Ok(None) => {
                    report.timed_out = true;
                    report.error = Some(format!("timed out after {}s", timeout.as_secs_f64()));
                }
                Err(e) => report.error = Some(format!("Candidate task failed: {}", e)),
            }
        }

        runs
    }
}

/// First candidate, in generation order, that returned rows. Advisories do
/// not affect selection; the summarizer sees them and discounts the source.
fn select(runs: &[CandidateRun]) -> Option<usize> {
    (0..runs.len()).find(|i| runs[*i].0.succeeded())
}

fn failure_line(report: &CandidateReport) -> String {
    let mut line = format!(
        "Candidate {} ({}): {}",
        report.index + 1,
        if report.approach.is_empty() {
            "unnamed"
        } else {
            report.approach.as_str()
        },
        report.error.as_deref().unwrap_or("no rows")
    );
    if let Some(warning) = &report.warning {
        line.push_str(&format!(" [advisory: {}]", warning.replace('\n', " ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(index: usize, rows: Option<usize>, warning: Option<&str>) -> CandidateReport {
        CandidateReport {
            batch: 1,
            index,
            approach: format!("approach {}", index),
            primary_relation: "v_team_season_summary".to_string(),
            raw_sql: "SELECT 1".to_string(),
            validated_sql: Some("SELECT 1 LIMIT 200".to_string()),
            warning: warning.map(str::to_string),
            error: if rows == Some(0) { Some("Query returned 0 rows".to_string()) } else { None },
            row_count: rows,
            timed_out: false,
        }
    }

    #[test]
    fn test_select_first_success_in_generation_order() {
        let runs = vec![
            (report(0, Some(0), None), None),
            (report(1, Some(3), Some("WRONG SOURCE")), None),
            (report(2, Some(2), None), None),
        ];
        assert_eq!(select(&runs), Some(1));

        let all_ok = vec![(report(0, Some(1), None), None), (report(1, Some(3), None), None)];
        assert_eq!(select(&all_ok), Some(0));

        let none = vec![(report(0, Some(0), None), None)];
        assert_eq!(select(&none), None);
    }

    #[test]
    fn test_failure_line() {
        let mut failed = report(1, None, None);
        failed.error = Some("timed out after 10s".to_string());
        assert_eq!(failure_line(&failed), "Candidate 2 (approach 1): timed out after 10s");
    }
}
