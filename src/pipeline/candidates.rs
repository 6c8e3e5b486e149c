//! Candidate parsing for the multi-candidate path
//!
//! The generator is asked for `{"candidates": [...]}`. When the response is
//! not well-formed, individual SQL fragments are recovered from the text.

use super::CANDIDATE_COUNT;
use crate::sql::strip_code_fences;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref SQL_FIELD: Regex = Regex::new(r#"(?s)"sql"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap();
    static ref SQL_FENCE: Regex = Regex::new(r"(?is)```sql\s*(.*?)```").unwrap();
    static ref BARE_SELECT: Regex = Regex::new(r"(?is)\b((?:with|select)\b[^;]*?);").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub approach: String,
    #[serde(default, alias = "relation", alias = "primary_view")]
    pub primary_relation: String,
    #[serde(alias = "query")]
    pub sql: String,
}

#[derive(Deserialize)]
struct Envelope {
    candidates: Vec<Candidate>,
}

/// Candidates in generation order, at most `CANDIDATE_COUNT`. Empty when
/// nothing usable could be recovered.
pub fn parse_candidates(text: &str) -> Vec<Candidate> {
    let candidates = parse_json(text).unwrap_or_else(|| recover_fragments(text));
    candidates
        .into_iter()
        .filter(|c| !c.sql.trim().is_empty())
        .take(CANDIDATE_COUNT)
        .collect()
}

fn parse_json(text: &str) -> Option<Vec<Candidate>> {
    let body = strip_code_fences(text);
    if let Ok(envelope) = serde_json::from_str::<Envelope>(&body) {
        return Some(envelope.candidates);
    }
    if let Ok(list) = serde_json::from_str::<Vec<Candidate>>(&body) {
        return Some(list);
    }
    // JSON object embedded in surrounding prose.
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Envelope>(&body[start..=end])
        .ok()
        .map(|e| e.candidates)
}

/// Text scanning fallback: `"sql": "..."` fields, then ```sql fences, then
/// bare `SELECT ...;` / `WITH ...;` statements.
fn recover_fragments(text: &str) -> Vec<Candidate> {
    let from_fields: Vec<String> = SQL_FIELD
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| serde_json::from_str::<String>(&format!("\"{}\"", m.as_str())).ok())
        .collect();
    let fragments = if !from_fields.is_empty() {
        from_fields
    } else {
        let fenced: Vec<String> = SQL_FENCE
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        if !fenced.is_empty() {
            fenced
        } else {
            BARE_SELECT
                .captures_iter(text)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect()
        }
    };

    let mut out: Vec<Candidate> = Vec::new();
    for sql in fragments {
        let sql = sql.trim().to_string();
        if sql.is_empty() || out.iter().any(|c| c.sql == sql) {
            continue;
        }
        out.push(Candidate {
            approach: "recovered from unstructured response".to_string(),
            primary_relation: String::new(),
            sql,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_envelope() {
        let text = r#"{"candidates": [
            {"approach": "season summary", "primary_relation": "v_team_season_summary", "sql": "SELECT team FROM v_team_season_summary"},
            {"approach": "standings", "primary_relation": "pl_season_table", "sql": "SELECT team FROM pl_season_table"}
        ]}"#;
        let candidates = parse_candidates(text);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].primary_relation, "pl_season_table");
    }

    #[test]
    fn test_fenced_bare_array_is_capped() {
        let text = "```json\n[{\"sql\": \"SELECT 1\"}, {\"sql\": \"SELECT 2\"}, {\"sql\": \"SELECT 3\"}, {\"sql\": \"SELECT 4\"}]\n```";
        let candidates = parse_candidates(text);
        assert_eq!(candidates.len(), CANDIDATE_COUNT);
        assert_eq!(candidates[0].sql, "SELECT 1");
    }

    #[test]
    fn test_recovers_sql_fields_from_broken_json() {
        let text = r#"{"candidates": [{"approach": "a", "sql": "SELECT team FROM pl_season_table WHERE team = \"x\""}, {"sql": "SELECT 2"#;
        let candidates = parse_candidates(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].sql, "SELECT team FROM pl_season_table WHERE team = \"x\"");
    }

    #[test]
    fn test_recovers_fenced_and_bare_sql() {
        let fenced = "Option A:\n```sql\nSELECT 1\n```\nOption B:\n```sql\nSELECT 2\n```";
        assert_eq!(parse_candidates(fenced).len(), 2);

        let bare = "First try SELECT team FROM pl_season_table; then WITH t AS (SELECT 1) SELECT * FROM t;";
        let candidates = parse_candidates(bare);
        assert_eq!(candidates.len(), 2);
        assert!(candidates[1].sql.starts_with("WITH t AS"));
    }

    #[test]
    fn test_nothing_recoverable() {
        assert!(parse_candidates("I cannot answer that.").is_empty());
        assert!(parse_candidates(r#"{"candidates": []}"#).is_empty());
    }
}
