//! Prompt construction for SQL generation
//!
//! Hints are assembled once per question and only sent on the first
//! attempt; later attempts carry feedback about what went wrong instead.

use crate::routing::{routing_hint, streak_view_hint, RoutingDecision};
use crate::teams::team_filter_hint;

const SQL_RULES: &str = "\
RULES:
- Return exactly one Postgres SELECT (or WITH ... SELECT) statement and nothing else.
- Query a single relation from the schema below. JOINs are not allowed; UNION ALL is the only set operation allowed.
- Always qualify relations with the public schema.
- End with ORDER BY for ranked questions and a positive LIMIT.
- For record questions (most, fewest, highest) return every tied row: WHERE metric = (SELECT MAX/MIN(metric) ...).
- Per-90 rates need playing_time_min >= 900.";

/// Per-question hints for the first generation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptHints {
    pub routing: Option<String>,
    pub streak_views: Option<String>,
    pub teams: Option<String>,
}

impl PromptHints {
    pub fn assemble(question: &str, decision: &RoutingDecision, limit: u64) -> Self {
        Self {
            routing: routing_hint(decision, limit),
            streak_views: streak_view_hint(question),
            teams: team_filter_hint(question),
        }
    }

    pub fn lines(&self) -> Vec<&str> {
        [&self.routing, &self.streak_views, &self.teams]
            .into_iter()
            .filter_map(|h| h.as_deref())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }
}

/// What the previous attempt produced and why it was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub previous_sql: Option<String>,
    pub reason: String,
}

fn push_feedback(prompt: &mut String, feedback: &Feedback) {
    prompt.push_str("\n\nPREVIOUS ATTEMPT FAILED:\n");
    if let Some(sql) = &feedback.previous_sql {
        prompt.push_str("SQL:\n");
        prompt.push_str(sql);
        prompt.push('\n');
    }
    prompt.push_str("PROBLEM: ");
    prompt.push_str(&feedback.reason);
    prompt.push_str("\nWrite a corrected query that avoids this problem.");
}

/// Prompt for one single-candidate attempt. `hints` is `Some` only on the
/// first attempt.
pub fn sql_prompt(
    question: &str,
    schema_text: &str,
    hints: Option<&PromptHints>,
    feedback: Option<&Feedback>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(schema_text);
    prompt.push_str("\n\n");
    prompt.push_str(SQL_RULES);

    if let Some(hints) = hints.filter(|h| !h.is_empty()) {
        prompt.push_str("\n\nHINTS:\n");
        prompt.push_str(&hints.lines().join("\n"));
    }
    if let Some(feedback) = feedback {
        push_feedback(&mut prompt, feedback);
    }

    prompt.push_str("\n\nQUESTION: ");
    prompt.push_str(question);
    prompt.push_str("\nSQL:");
    prompt
}

/// Prompt asking for `count` structurally different candidates in one JSON
/// response. `failures` lists every reason the previous batch failed.
pub fn multi_candidate_prompt(
    question: &str,
    schema_text: &str,
    hints: Option<&PromptHints>,
    failures: &[String],
    count: usize,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(schema_text);
    prompt.push_str("\n\n");
    prompt.push_str(SQL_RULES);

    if let Some(hints) = hints.filter(|h| !h.is_empty()) {
        prompt.push_str("\n\nHINTS:\n");
        prompt.push_str(&hints.lines().join("\n"));
    }
    if !failures.is_empty() {
        prompt.push_str("\n\nEVERY CANDIDATE IN THE PREVIOUS BATCH FAILED:\n");
        for (i, failure) in failures.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, failure));
        }
        prompt.push_str("Do not repeat these mistakes.");
    }

    prompt.push_str(&format!(
        "\n\nWrite {count} structurally different SQL queries that could each answer the question \
         (for example a different source relation, a tie-safe subquery, or a different filter). \
         Respond with JSON only, in this shape:\n\
         {{\"candidates\": [{{\"approach\": \"short description\", \"primary_relation\": \"relation name\", \"sql\": \"SELECT ...\"}}]}}\n\
         The array must hold exactly {count} entries.",
        count = count
    ));
    prompt.push_str("\n\nQUESTION: ");
    prompt.push_str(question);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route;

    #[test]
    fn test_first_attempt_carries_hints() {
        let question = "Which club scored the most goals in a single Premier League season?";
        let hints = PromptHints::assemble(question, &route(question), 200);
        assert!(hints.routing.is_some());
        let prompt = sql_prompt(question, "SCHEMA", Some(&hints), None);
        assert!(prompt.contains("HINTS:"));
        assert!(prompt.contains("CLUB METRIC ROUTING"));
        assert!(prompt.ends_with("\nSQL:"));
    }

    #[test]
    fn test_retry_carries_feedback_not_hints() {
        let feedback = Feedback {
            previous_sql: Some("SELECT * FROM secrets".to_string()),
            reason: "Relation(s) not in the allow-list: secrets".to_string(),
        };
        let prompt = sql_prompt("q", "SCHEMA", None, Some(&feedback));
        assert!(!prompt.contains("HINTS:"));
        assert!(prompt.contains("PREVIOUS ATTEMPT FAILED"));
        assert!(prompt.contains("SELECT * FROM secrets"));
    }

    #[test]
    fn test_team_hint_included() {
        let question = "How many titles have Arsenal won?";
        let hints = PromptHints::assemble(question, &route(question), 200);
        assert!(hints.lines().iter().any(|l| l.starts_with("TEAM FILTER")));
    }

    #[test]
    fn test_multi_prompt_lists_failures() {
        let failures = vec!["JOINs are not allowed".to_string(), "returned 0 rows".to_string()];
        let prompt = multi_candidate_prompt("q", "SCHEMA", None, &failures, 3);
        assert!(prompt.contains("1. JOINs are not allowed"));
        assert!(prompt.contains("2. returned 0 rows"));
        assert!(prompt.contains("exactly 3 entries"));
    }
}
