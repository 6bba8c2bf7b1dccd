use std::collections::BTreeMap;

use common::types::has_field;
use common::types::SchemaField;
use tracing::warn;

use crate::error::Result;
use crate::event::Event;

/// Enriches events in place before they are stored.
pub trait EventMapper: Send + Sync {
    fn map(&self, event: &mut Event) -> Result<()>;

    /// Declares the fields this mapper may write.
    fn add_field_dependency(&self, _builder: &mut FieldDependencyBuilder) {}
}

/// Fields mappers add to collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDependency {
    /// Present in every collection.
    pub constant_fields: Vec<SchemaField>,
    /// Present in collections having the key field.
    pub dependent_fields: BTreeMap<String, Vec<SchemaField>>,
}

impl FieldDependency {
    pub fn is_empty(&self) -> bool {
        self.constant_fields.is_empty() && self.dependent_fields.is_empty()
    }

    /// Fields missing from a collection with the given fields.
    pub fn missing_fields(&self, existing: &[SchemaField]) -> Vec<SchemaField> {
        let mut out: Vec<SchemaField> = vec![];
        let dependent = self
            .dependent_fields
            .iter()
            .filter(|(source, _)| has_field(existing, source))
            .flat_map(|(_, fields)| fields.iter());

        for field in self.constant_fields.iter().chain(dependent) {
            if !has_field(existing, &field.name) && !has_field(&out, &field.name) {
                out.push(field.clone());
            }
        }

        out
    }
}

#[derive(Debug, Default)]
pub struct FieldDependencyBuilder {
    constant_fields: Vec<SchemaField>,
    dependent_fields: BTreeMap<String, Vec<SchemaField>>,
}

fn merge(into: &mut Vec<SchemaField>, fields: Vec<SchemaField>) {
    for field in fields {
        let existing = into.iter().find(|f| f.name == field.name).map(|f| f.typ);
        match existing {
            None => into.push(field),
            Some(typ) if typ != field.typ => {
                warn!(
                    field = %field.name,
                    existing = %typ,
                    declared = %field.typ,
                    "conflicting field dependency ignored"
                );
            }
            Some(_) => {}
        }
    }
}

impl FieldDependencyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fields(&mut self, fields: Vec<SchemaField>) {
        merge(&mut self.constant_fields, fields);
    }

    pub fn add_dependent_fields(&mut self, source: &str, fields: Vec<SchemaField>) {
        merge(
            self.dependent_fields.entry(source.to_string()).or_default(),
            fields,
        );
    }

    pub fn build(self) -> FieldDependency {
        FieldDependency {
            constant_fields: self.constant_fields,
            dependent_fields: self.dependent_fields,
        }
    }
}
