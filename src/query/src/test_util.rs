//! Doubles for the collaborators of the user storage.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use common::types::FieldType;
use common::types::SchemaField;
use metadata::metastore;

use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::QueryResult;
use crate::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutedQuery {
    /// `None` for raw statements.
    pub project: Option<String>,
    pub sql: String,
}

/// Records every statement and answers with a fixed result or failure.
pub struct RecordingExecutor {
    response: std::result::Result<QueryResult, String>,
    queries: Mutex<Vec<ExecutedQuery>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::with_result(QueryResult::empty())
    }

    pub fn with_result(result: QueryResult) -> Self {
        Self {
            response: Ok(result),
            queries: Mutex::new(vec![]),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            queries: Mutex::new(vec![]),
        }
    }

    pub fn queries(&self) -> Vec<ExecutedQuery> {
        self.queries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    fn record(&self, project: Option<&str>, sql: &str) -> Result<QueryResult> {
        self.queries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(ExecutedQuery {
                project: project.map(|p| p.to_string()),
                sql: sql.to_string(),
            });

        self.response
            .clone()
            .map_err(QueryError::Execution)
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute(&self, project: &str, sql: &str) -> Result<QueryResult> {
        self.record(Some(project), sql)
    }

    async fn execute_raw(&self, sql: &str) -> Result<QueryResult> {
        self.record(None, sql)
    }
}

/// Metastore holding `collections` of `project`, each with the given string fields.
pub fn create_metastore(
    project: &str,
    collections: &[(&str, &[&str])],
) -> Result<Arc<metastore::ProviderImpl>> {
    let md = metastore::ProviderImpl::new();
    for (collection, fields) in collections {
        md.create_collection(
            project,
            collection,
            fields
                .iter()
                .map(|name| SchemaField::new(*name, FieldType::String, true))
                .collect(),
        )?;
    }

    Ok(Arc::new(md))
}
