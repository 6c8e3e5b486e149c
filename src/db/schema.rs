//! Information-schema backed schema provider

use super::connection::DbPool;
use crate::error::{CopilotError, Result};
use crate::schema::{ColumnInfo, SchemaProvider, SchemaSnapshot};
use crate::sql::relations::{ALLOWED_RELATIONS, DEFAULT_SCHEMA};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

const COLUMNS_SQL: &str = "\
SELECT table_name::text, column_name::text, data_type::text
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = ANY($2)
ORDER BY table_name, ordinal_position";

pub struct PgSchemaProvider {
    pool: DbPool,
}

impl PgSchemaProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaProvider for PgSchemaProvider {
    async fn snapshot(&self) -> Result<Arc<SchemaSnapshot>> {
        let names: Vec<String> = ALLOWED_RELATIONS.iter().map(|r| r.to_string()).collect();
        let rows: Vec<(String, String, String)> = sqlx::query_as(COLUMNS_SQL)
            .bind(DEFAULT_SCHEMA)
            .bind(&names)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CopilotError::Schema(format!("Failed to read information_schema: {}", e)))?;

        let mut columns: BTreeMap<String, Vec<ColumnInfo>> = BTreeMap::new();
        for (table, column, data_type) in rows {
            columns.entry(table).or_default().push(ColumnInfo {
                name: column,
                data_type,
            });
        }

        let missing: Vec<&str> = ALLOWED_RELATIONS
            .iter()
            .copied()
            .filter(|r| !columns.contains_key(*r))
            .collect();
        if !missing.is_empty() {
            warn!("Relations missing from the database: {}", missing.join(", "));
        }
        info!("Loaded schema for {} of {} relations", columns.len(), ALLOWED_RELATIONS.len());

        Ok(Arc::new(SchemaSnapshot::from_columns(&columns)))
    }
}
