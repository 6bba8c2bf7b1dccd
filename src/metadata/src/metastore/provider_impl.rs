use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::RwLock;

use common::types::SchemaField;
use common::validation::check_collection;
use common::validation::check_project;
use common::validation::check_table_column;
use tracing::debug;

use crate::error::MetadataError;
use crate::metastore::Provider;
use crate::Result;

type Collections = BTreeMap<String, Vec<SchemaField>>;

/// In-memory metastore.
#[derive(Default)]
pub struct ProviderImpl {
    projects: RwLock<HashMap<String, Collections>>,
}

impl ProviderImpl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_collection(
        &self,
        project: &str,
        collection: &str,
        fields: Vec<SchemaField>,
    ) -> Result<Vec<SchemaField>> {
        check_project(project)?;
        check_collection(collection)?;
        for field in fields.iter() {
            check_table_column(&field.name, "field")?;
        }

        let mut projects = self.projects.write()?;
        let collections = projects.entry(project.to_string()).or_default();
        if collections.contains_key(collection) {
            return Err(MetadataError::AlreadyExists(format!(
                "collection {collection} already exists"
            )));
        }

        debug!(project, collection, fields = fields.len(), "collection created");
        collections.insert(collection.to_string(), fields.clone());
        Ok(fields)
    }

    /// Adds fields to a collection, creating it when missing. Fields already present by
    /// name are left untouched.
    pub fn add_fields(
        &self,
        project: &str,
        collection: &str,
        fields: Vec<SchemaField>,
    ) -> Result<Vec<SchemaField>> {
        check_project(project)?;
        check_collection(collection)?;
        for field in fields.iter() {
            check_table_column(&field.name, "field")?;
        }

        let mut projects = self.projects.write()?;
        let existing = projects
            .entry(project.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        for field in fields {
            if !existing.iter().any(|f| f.name == field.name) {
                existing.push(field);
            }
        }

        Ok(existing.clone())
    }
}

impl Provider for ProviderImpl {
    fn get_collections(&self, project: &str) -> Result<Collections> {
        Ok(self
            .projects
            .read()?
            .get(project)
            .cloned()
            .unwrap_or_default())
    }

    fn get_collection(&self, project: &str, collection: &str) -> Result<Vec<SchemaField>> {
        Ok(self
            .projects
            .read()?
            .get(project)
            .and_then(|c| c.get(collection))
            .cloned()
            .unwrap_or_default())
    }
}
