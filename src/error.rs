use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopilotError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gave up after {attempts} attempt(s): {reason}")]
    TerminalFailure { reason: String, attempts: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CopilotError {
    fn from(err: sqlx::Error) -> Self {
        CopilotError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CopilotError>;

/// Policy violations raised by the SQL validator. Each one is fatal to the
/// attempt that produced the SQL, never to the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Could not parse SQL: {0}")]
    Unparseable(String),

    #[error("Multiple statements are not allowed (found {0})")]
    MultipleStatements(usize),

    #[error("Only SELECT/WITH queries are allowed")]
    NotASelect,

    #[error("Write operations are not allowed (found {0})")]
    WriteNotAllowed(String),

    #[error("Relation(s) not in the allow-list: {}", .0.join(", "))]
    DisallowedRelation(Vec<String>),

    #[error("JOINs are not allowed; query a single view instead")]
    JoinNotAllowed,

    #[error("Set operation {0} is not allowed (only UNION ALL)")]
    SetOperationNotAllowed(String),

    #[error("LIMIT must be a positive integer (got {0})")]
    InvalidLimit(String),

    #[error("Column(s) not present on {relation}: {}", .columns.join(", "))]
    DisallowedColumn {
        relation: String,
        columns: Vec<String>,
    },
}

/// Non-fatal signal that a valid query probably answers the wrong question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Advisory {
    /// Derived from the question text alone, raised by the validator.
    IntentMismatch(String),
    /// Derived from the routing decision, raised by the auditor.
    SourceMismatch(String),
}

impl Advisory {
    pub fn message(&self) -> &str {
        match self {
            Advisory::IntentMismatch(msg) | Advisory::SourceMismatch(msg) => msg,
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::IntentMismatch(msg) => write!(f, "INTENT MISMATCH: {}", msg),
            Advisory::SourceMismatch(msg) => write!(f, "{}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disallowed_relation_lists_offenders() {
        let err = ValidationError::DisallowedRelation(vec!["pg_user".to_string(), "secrets".to_string()]);
        assert_eq!(err.to_string(), "Relation(s) not in the allow-list: pg_user, secrets");
    }

    #[test]
    fn test_validation_error_converts() {
        let err: CopilotError = ValidationError::JoinNotAllowed.into();
        assert!(matches!(err, CopilotError::Validation(ValidationError::JoinNotAllowed)));
    }
}
