use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use common::validation::check_collection;
use common::validation::check_project;
use tracing::info;

use crate::error::MetadataError;
use crate::materialized_views::MaterializedView;
use crate::materialized_views::Provider;
use crate::Result;

/// Keeps views in memory; scheduling is left to whoever reads them back.
#[derive(Default)]
pub struct ProviderImpl {
    views: RwLock<HashMap<String, BTreeMap<String, MaterializedView>>>,
}

impl ProviderImpl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project: &str, table_name: &str) -> Result<MaterializedView> {
        self.views
            .read()?
            .get(project)
            .and_then(|views| views.get(table_name))
            .cloned()
            .ok_or_else(|| {
                MetadataError::NotFound(format!("materialized view {table_name} not found"))
            })
    }

    pub fn list(&self, project: &str) -> Result<Vec<MaterializedView>> {
        Ok(self
            .views
            .read()?
            .get(project)
            .map(|views| views.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl Provider for ProviderImpl {
    async fn create(&self, project: &str, view: MaterializedView) -> Result<()> {
        check_project(project)?;
        check_collection(&view.table_name)?;

        let mut views = self.views.write()?;
        let project_views = views.entry(project.to_string()).or_default();
        if project_views.contains_key(&view.table_name) {
            return Err(MetadataError::AlreadyExists(format!(
                "materialized view {} already exists",
                view.table_name
            )));
        }

        info!(project, table = %view.table_name, "materialized view created");
        project_views.insert(view.table_name.clone(), view);
        Ok(())
    }
}
