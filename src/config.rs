//! Runtime configuration
//!
//! Read once from the process environment (and `.env`, when present).

use crate::error::{CopilotError, Result};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_LIMIT: u64 = 200;
pub const DEFAULT_CANDIDATE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct CopilotConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub database_url: Option<String>,
    pub statement_timeout_ms: u64,
    pub default_limit: u64,
    pub candidate_timeout: Duration,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            database_url: None,
            statement_timeout_ms: DEFAULT_STATEMENT_TIMEOUT_MS,
            default_limit: DEFAULT_LIMIT,
            candidate_timeout: Duration::from_secs(DEFAULT_CANDIDATE_TIMEOUT_SECS),
        }
    }
}

impl CopilotConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing credentials are not an error here; they are reported by
    /// [`CopilotConfig::require_api_key`] / [`CopilotConfig::require_database_url`]
    /// when a collaborator actually needs them.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_model: non_empty("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            database_url: non_empty("DATABASE_URL_READONLY"),
            statement_timeout_ms: parse_number("STATEMENT_TIMEOUT_MS", non_empty("STATEMENT_TIMEOUT_MS"))?
                .unwrap_or(defaults.statement_timeout_ms),
            default_limit: match parse_number("DEFAULT_LIMIT", non_empty("DEFAULT_LIMIT"))? {
                Some(0) => return Err(CopilotError::Config("DEFAULT_LIMIT must be positive".to_string())),
                Some(n) => n,
                None => defaults.default_limit,
            },
            candidate_timeout: parse_number("CANDIDATE_TIMEOUT_SECS", non_empty("CANDIDATE_TIMEOUT_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(defaults.candidate_timeout),
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| CopilotError::Config("OPENAI_API_KEY is not set".to_string()))
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| CopilotError::Config("DATABASE_URL_READONLY is not set".to_string()))
    }
}

fn parse_number(key: &str, raw: Option<String>) -> Result<Option<u64>> {
    raw.map(|value| {
        value
            .parse::<u64>()
            .map_err(|e| CopilotError::Config(format!("{} must be an unsigned integer: {}", key, e)))
    })
    .transpose()
}
