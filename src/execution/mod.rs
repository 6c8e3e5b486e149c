//! Query execution contract
//!
//! The orchestrators only ever talk to a `QueryExecutor`; the Postgres
//! implementation lives in `db::executor`.

pub mod result;

pub use result::{ExecutionResult, Row};

use crate::error::Result;
use async_trait::async_trait;

/// Runs already-validated SQL. Implementations enforce their own
/// server-side timeout and read-only guarantees.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute_read_only(&self, sql: &str) -> Result<ExecutionResult>;
}
