//! SQL guardrails
//!
//! Parsing, shape extraction, the validation/patching pipeline and the
//! relation catalogue the guardrails check against.

pub mod relations;
pub mod shape;
pub mod validator;

pub use shape::SqlShape;
pub use validator::{validate_and_patch, ValidatedQuery};

use lazy_static::lazy_static;
use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::{Parser, ParserError};

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?is)```[a-z]*[ \t]*\r?\n?(.*?)```").unwrap();
    /// Opening fence of a truncated block that never closes.
    static ref OPEN_FENCE: Regex = Regex::new(r"(?i)^```[a-z]*[ \t]*\r?\n?").unwrap();
}

/// Parse with the Postgres dialect.
pub fn parse(sql: &str) -> Result<Vec<Statement>, ParserError> {
    Parser::parse_sql(&PostgreSqlDialect {}, sql)
}

/// Strip markdown code fences generators like to wrap SQL in. Text without
/// fences is returned trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
        None => OPEN_FENCE
            .replace(trimmed, "")
            .trim_matches('`')
            .trim()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("Here you go:\n```\nSELECT 2;\n```\n"), "SELECT 2;");
        assert_eq!(strip_code_fences("  SELECT 3  "), "SELECT 3");
        assert_eq!(strip_code_fences("`SELECT 4`"), "SELECT 4");
    }

    #[test]
    fn test_unclosed_fence_drops_language_tag() {
        assert_eq!(
            strip_code_fences("```sql\nSELECT team FROM pl_season_table LIMIT 1"),
            "SELECT team FROM pl_season_table LIMIT 1"
        );
        assert_eq!(strip_code_fences("```\nSELECT 5"), "SELECT 5");
        assert!(parse(&strip_code_fences("```sql\nSELECT team FROM pl_season_table LIMIT 1")).is_ok());
    }
}
