use async_trait::async_trait;
use common::types::SchemaField;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Rows returned by a query executor.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct QueryResult {
    pub columns: Vec<SchemaField>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<SchemaField>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Runs SQL text against an engine. Failures come back as `QueryError::Execution`
/// carrying the engine's message.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs a query scoped to one project's schema.
    async fn execute(&self, project: &str, sql: &str) -> Result<QueryResult>;
    /// Runs a statement outside of any project, e.g. DDL.
    async fn execute_raw(&self, sql: &str) -> Result<QueryResult>;
}
