//! Read-only Postgres executor
//!
//! Every query runs inside its own transaction that is marked
//! `READ ONLY`, carries a `statement_timeout`, and is always rolled back.

use super::connection::{init_pool, DbPool};
use crate::config::CopilotConfig;
use crate::error::{CopilotError, Result};
use crate::execution::{ExecutionResult, QueryExecutor, Row};
use async_trait::async_trait;
use sqlx::{Column, Executor};
use tracing::{debug, warn};

/// Postgres `query_canceled`, raised when `statement_timeout` fires.
const QUERY_CANCELED: &str = "57014";

/// Enough for the multi-candidate fan-out plus schema introspection.
const POOL_SIZE: u32 = 5;

pub struct PgExecutor {
    pool: DbPool,
    statement_timeout_ms: u64,
}

impl PgExecutor {
    pub fn new(pool: DbPool, statement_timeout_ms: u64) -> Self {
        Self {
            pool,
            statement_timeout_ms,
        }
    }

    pub async fn connect(config: &CopilotConfig) -> Result<Self> {
        let pool = init_pool(config.require_database_url()?, POOL_SIZE).await?;
        Ok(Self::new(pool, config.statement_timeout_ms))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn execute_read_only(&self, sql: &str) -> Result<ExecutionResult> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        let timeout = format!("SET LOCAL statement_timeout = {}", self.statement_timeout_ms);
        sqlx::query(&timeout).execute(&mut *tx).await?;

        let described = match (&mut *tx).describe(sql).await {
            Ok(describe) => describe
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect::<Vec<_>>(),
            Err(e) => {
                debug!("describe failed, inferring columns from rows: {}", e);
                Vec::new()
            }
        };

        let wrapped = format!("SELECT row_to_json(q) FROM ({}) q", sql);
        let fetched = sqlx::query_scalar::<_, serde_json::Value>(&wrapped)
            .fetch_all(&mut *tx)
            .await;

        if let Err(e) = tx.rollback().await {
            warn!("rollback of read-only transaction failed: {}", e);
        }

        let values = fetched.map_err(classify_error)?;
        let rows: Vec<Row> = values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();

        let columns = if described.is_empty() {
            ExecutionResult::infer_columns(&rows)
        } else {
            described
        };
        Ok(ExecutionResult::new(columns, rows))
    }
}

fn classify_error(err: sqlx::Error) -> CopilotError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(QUERY_CANCELED) {
            return CopilotError::Timeout(db.message().to_string());
        }
        return CopilotError::Execution(db.message().to_string());
    }
    CopilotError::Database(err.to_string())
}
