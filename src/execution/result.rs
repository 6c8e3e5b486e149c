//! Query Result - rows returned by a read-only execution

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys keep insertion order (`serde_json` `preserve_order`), so they follow
/// the select list.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Column names, in select-list order
    pub columns: Vec<String>,

    /// One JSON object per row, keyed by column name
    pub rows: Vec<Row>,

    /// Number of rows returned
    pub row_count: usize,
}

impl ExecutionResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// First `cap` rows, for prompts. Never the full result set.
    pub fn sample(&self, cap: usize) -> &[Row] {
        &self.rows[..self.rows.len().min(cap)]
    }

    /// Columns from the first row when the executor could not describe them.
    pub fn infer_columns(rows: &[Row]) -> Vec<String> {
        rows.first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}
