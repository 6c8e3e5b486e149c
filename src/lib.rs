pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod llm;
pub mod pipeline;
pub mod routing;
pub mod schema;
pub mod sql;
pub mod teams;
pub mod text;

pub use audit::audit_source;
pub use config::CopilotConfig;
pub use error::{Advisory, CopilotError, Result, ValidationError};
pub use execution::{ExecutionResult, QueryExecutor, Row};
pub use llm::{LlmClient, TextGenerator};
pub use pipeline::{AttemptTrace, CandidateReport, Copilot, PipelineOutput, RunOptions, TraceOutcome};
pub use routing::{route, Intent, Router, RouterPolicy, RoutingDecision, RETRY_TOKEN};
pub use schema::{AllowedSchema, CachedSchemaProvider, SchemaProvider, SchemaSnapshot, StaticSchemaProvider};
pub use sql::{validate_and_patch, ValidatedQuery};
