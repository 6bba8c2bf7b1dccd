//! Read side of the schema registry: which collections a project has and which fields
//! they carry.

pub mod provider_impl;

use std::collections::BTreeMap;

use common::types::SchemaField;
pub use provider_impl::ProviderImpl;

use crate::Result;

pub trait Provider: Sync + Send {
    /// All collections of the project, ordered by name.
    fn get_collections(&self, project: &str) -> Result<BTreeMap<String, Vec<SchemaField>>>;
    /// Fields of one collection. Unknown collections have no fields.
    fn get_collection(&self, project: &str, collection: &str) -> Result<Vec<SchemaField>>;
}
