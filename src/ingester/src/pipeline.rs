use std::sync::Arc;

use common::types::SchemaField;
use metadata::metastore;
use metadata::metastore::Provider;
use tracing::debug;

use crate::error::Result;
use crate::event::Event;
use crate::mapper::EventMapper;
use crate::mapper::FieldDependency;
use crate::mapper::FieldDependencyBuilder;

/// Ordered chain of mappers with their merged field dependency.
pub struct Pipeline {
    mappers: Vec<Arc<dyn EventMapper>>,
    dependency: FieldDependency,
}

impl Pipeline {
    pub fn new(mappers: Vec<Arc<dyn EventMapper>>) -> Self {
        let mut builder = FieldDependencyBuilder::new();
        for mapper in mappers.iter() {
            mapper.add_field_dependency(&mut builder);
        }

        Self {
            mappers,
            dependency: builder.build(),
        }
    }

    pub fn dependency(&self) -> &FieldDependency {
        &self.dependency
    }

    /// Runs every mapper in order, stopping at the first failure.
    pub fn map(&self, event: &mut Event) -> Result<()> {
        for mapper in self.mappers.iter() {
            mapper.map(event)?;
        }

        Ok(())
    }

    /// Adds the fields mappers may write to a collection, returning its fields.
    pub fn apply_dependency(
        &self,
        md: &metastore::ProviderImpl,
        project: &str,
        collection: &str,
    ) -> Result<Vec<SchemaField>> {
        let existing = md.get_collection(project, collection)?;
        let missing = self.dependency.missing_fields(&existing);
        if missing.is_empty() {
            return Ok(existing);
        }

        debug!(
            project,
            collection,
            fields = missing.len(),
            "adding dependent fields"
        );
        Ok(md.add_fields(project, collection, missing)?)
    }
}
