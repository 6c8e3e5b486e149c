//! Result summarization
//!
//! The summarizer only ever sees the validated SQL, its columns and a capped
//! row sample. A failed summary call degrades to a plain-text fallback.

use super::{CandidateReport, CANDIDATE_SUMMARY_ROW_CAP, SUMMARY_ROW_CAP};
use crate::execution::ExecutionResult;
use crate::llm::TextGenerator;
use crate::routing::RoutingDecision;
use tracing::warn;

/// Summary prompt for a single accepted result.
pub fn summary_prompt(question: &str, sql: &str, result: &ExecutionResult) -> String {
    let sample = result.sample(SUMMARY_ROW_CAP);
    format!(
        "Answer the question using ONLY the rows below.\n\
         If several rows tie on the deciding value, mention all of them.\n\
         If the rows do not answer the question, say so.\n\n\
         QUESTION: {question}\n\n\
         SQL:\n{sql}\n\n\
         COLUMNS: {columns}\n\
         RETURNED ROW COUNT: {total}\n\
         ROWS SENT: {sent} (max {cap})\n\
         ROWS (JSON):\n{rows}",
        question = question,
        sql = sql,
        columns = result.columns.join(", "),
        total = result.row_count,
        sent = sample.len(),
        cap = SUMMARY_ROW_CAP,
        rows = serde_json::to_string_pretty(sample).unwrap_or_default()
    )
}

/// Summary prompt over every candidate of a batch, successes and failures.
pub fn candidates_prompt(
    question: &str,
    decision: &RoutingDecision,
    candidates: &[(CandidateReport, Option<ExecutionResult>)],
) -> String {
    let mut prompt = format!(
        "Several candidate queries were run for the question below. Cross-reference them and \
         answer using ONLY their rows. Discount candidates that read a relation inappropriate \
         for the question (for example a streak-length view answering a \"how many times\" \
         count question, or a player view answering a club question) and say which \
         candidate you relied on.\n\n\
         QUESTION: {}\n\
         ROUTING: intent={}, recommended relation={}\n",
        question,
        decision.intent,
        if decision.recommended_relation.is_empty() {
            "(none)"
        } else {
            decision.recommended_relation.as_str()
        }
    );

    for (report, result) in candidates {
        prompt.push_str(&format!(
            "\n--- CANDIDATE {} ({}) relation={} ---\nSQL:\n{}\n",
            report.index + 1,
            report.approach,
            if report.primary_relation.is_empty() {
                "?"
            } else {
                report.primary_relation.as_str()
            },
            report.validated_sql.as_deref().unwrap_or(&report.raw_sql)
        ));
        if let Some(warning) = &report.warning {
            prompt.push_str(&format!("AUDITOR WARNING: {}\n", warning));
        }
        match (&report.error, result) {
            (Some(error), _) => prompt.push_str(&format!("FAILED: {}\n", error)),
            (None, Some(result)) => {
                let sample = result.sample(CANDIDATE_SUMMARY_ROW_CAP);
                prompt.push_str(&format!(
                    "COLUMNS: {}\nRETURNED ROW COUNT: {}\nROWS (first {}):\n{}\n",
                    result.columns.join(", "),
                    result.row_count,
                    sample.len(),
                    serde_json::to_string(sample).unwrap_or_default()
                ));
            }
            (None, None) => prompt.push_str("NOT EXECUTED\n"),
        }
    }
    prompt
}

/// Text used when summarization is disabled or fails.
pub fn fallback_summary(row_count: usize) -> String {
    format!("Query returned {} row(s).", row_count)
}

/// Run the summarizer, falling back to plain text on failure.
pub async fn summarize(generator: &dyn TextGenerator, prompt: &str, row_count: usize) -> String {
    match generator.generate_text(prompt).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => fallback_summary(row_count),
        Err(e) => {
            warn!("Summarization failed, using fallback text: {}", e);
            fallback_summary(row_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::Row;
    use crate::routing::route;
    use serde_json::json;

    fn result(n: usize) -> ExecutionResult {
        let rows: Vec<Row> = (0..n)
            .map(|i| {
                let mut row = Row::new();
                row.insert("team".to_string(), json!(format!("team-{}", i)));
                row
            })
            .collect();
        ExecutionResult::new(vec!["team".to_string()], rows)
    }

    #[test]
    fn test_summary_prompt_caps_rows() {
        let prompt = summary_prompt("q", "SELECT team FROM v_team_season_summary", &result(50));
        assert!(prompt.contains("RETURNED ROW COUNT: 50"));
        assert!(prompt.contains("ROWS SENT: 20 (max 20)"));
        assert!(prompt.contains("team-19"));
        assert!(!prompt.contains("team-20"));
    }

    #[test]
    fn test_candidates_prompt_includes_failures_and_caps() {
        let decision = route("Which club has the most clean sheets in a row?");
        let ok = CandidateReport {
            batch: 1,
            index: 0,
            approach: "streak view".to_string(),
            primary_relation: "v_team_clean_sheet_streaks".to_string(),
            raw_sql: "SELECT team FROM v_team_clean_sheet_streaks".to_string(),
            validated_sql: Some("SELECT team FROM v_team_clean_sheet_streaks LIMIT 200".to_string()),
            warning: None,
            error: None,
            row_count: Some(15),
            timed_out: false,
        };
        let failed = CandidateReport {
            index: 1,
            error: Some("timed out after 10s".to_string()),
            validated_sql: None,
            row_count: None,
            timed_out: true,
            ..ok.clone()
        };
        let prompt = candidates_prompt("q", &decision, &[(ok, Some(result(15))), (failed, None)]);
        assert!(prompt.contains("CANDIDATE 1 (streak view)"));
        assert!(prompt.contains("ROWS (first 10)"));
        assert!(prompt.contains("FAILED: timed out after 10s"));
        assert!(!prompt.contains("team-10"));
    }
}
