pub mod provider_impl;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
pub use provider_impl::ProviderImpl;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Scheduled creation and refresh of materialized query results.
#[async_trait]
pub trait Provider: Sync + Send {
    async fn create(&self, project: &str, view: MaterializedView) -> Result<()>;
}

/// A recurring query whose result is kept as a table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MaterializedView {
    pub table_name: String,
    pub name: String,
    pub description: Option<String>,
    pub query: String,
    pub update_interval: Option<Duration>,
    pub incremental: bool,
    pub options: BTreeMap<String, serde_json::Value>,
}
