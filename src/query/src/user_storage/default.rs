use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::user_storage::attribute::user_table;
use crate::user_storage::attribute::AttributeSearch;
use crate::user_storage::CreateSegmentRequest;
use crate::user_storage::SearchUsersRequest;
use crate::user_storage::UserStorage;
use crate::QueryResult;
use crate::Result;

/// Searches the user table by attributes only.
pub struct DefaultUserStorage {
    executor: Arc<dyn QueryExecutor>,
}

impl DefaultUserStorage {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl UserStorage for DefaultUserStorage {
    async fn search_users(&self, project: &str, req: SearchUsersRequest) -> Result<QueryResult> {
        if !req.event_filters.is_empty() {
            return Err(QueryError::BadRequest(
                "event filters are not supported by this user storage".to_string(),
            ));
        }

        let sql = AttributeSearch::build(user_table(project, None)?, &req, vec![])?.to_string();
        debug!(project, sql = %sql, "searching users");
        self.executor.execute(project, &sql).await
    }

    async fn create_segment(&self, _project: &str, _req: CreateSegmentRequest) -> Result<()> {
        Err(QueryError::BadRequest(
            "segments are not supported by this user storage".to_string(),
        ))
    }
}
