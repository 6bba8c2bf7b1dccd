//! User search and segmentation.
//!
//! [`UserStorage`] is implemented by [`DefaultUserStorage`], which only knows the user
//! table, and by [`PrestoUserStorage`], which also understands event filters. Which one
//! serves requests is decided by configuration in [`build`].

pub mod attribute;
pub mod default;
pub mod presto;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::config;
use common::config::UserStorageKind;
use common::query::EventFilter;
use common::query::Expr;
use common::query::Sorting;
pub use default::DefaultUserStorage;
use metadata::materialized_views;
use metadata::metastore;
pub use presto::PrestoUserStorage;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::executor::QueryExecutor;
use crate::QueryResult;
use crate::Result;

pub const DEFAULT_LIMIT: u64 = 100;

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersRequest {
    /// Columns of the user table to return. Empty means all of them.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Predicate over user attributes.
    #[serde(default)]
    pub filter: Option<Expr>,
    #[serde(default)]
    pub event_filters: Vec<EventFilter>,
    #[serde(default)]
    pub sorting: Option<Sorting>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: Option<u64>,
}

impl Default for SearchUsersRequest {
    fn default() -> Self {
        Self {
            columns: vec![],
            filter: None,
            event_filters: vec![],
            sorting: None,
            limit: DEFAULT_LIMIT,
            offset: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSegmentRequest {
    pub name: String,
    pub table_name: String,
    #[serde(default)]
    pub filter: Option<Expr>,
    #[serde(default)]
    pub event_filters: Vec<EventFilter>,
    #[serde(default)]
    pub interval: Option<Duration>,
}

#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn search_users(&self, project: &str, req: SearchUsersRequest) -> Result<QueryResult>;
    /// Registers a recurring materialized view holding the users of the segment.
    async fn create_segment(&self, project: &str, req: CreateSegmentRequest) -> Result<()>;
}

pub struct Dependencies {
    /// Executor of the event engine.
    pub event_executor: Arc<dyn QueryExecutor>,
    /// Executor of the store holding the user table.
    pub user_executor: Arc<dyn QueryExecutor>,
    pub metastore: Arc<dyn metastore::Provider>,
    pub materialized_views: Arc<dyn materialized_views::Provider>,
}

/// Creates and initializes the configured user storage.
pub async fn build(cfg: &config::UserStorage, deps: Dependencies) -> Result<Arc<dyn UserStorage>> {
    cfg.validate()?;
    info!(kind = ?cfg.kind, "initializing user storage");

    Ok(match cfg.kind {
        UserStorageKind::Default => Arc::new(DefaultUserStorage::new(deps.user_executor)),
        UserStorageKind::Presto => {
            let storage = PrestoUserStorage::new(cfg.clone(), deps);
            storage.init().await?;
            Arc::new(storage)
        }
    })
}
