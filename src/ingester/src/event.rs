use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;
use common::types::FieldType;
use common::types::SchemaField;
use serde::Deserialize;
use serde::Serialize;

use crate::error::IngesterError;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Timestamp(DateTime<Utc>),
    String(String),
}

impl PropValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(v) => Some(v),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            PropValue::Null => "NULL",
            PropValue::Bool(_) => "BOOLEAN",
            PropValue::Int64(_) => "LONG",
            PropValue::Float64(_) => "DOUBLE",
            PropValue::Timestamp(_) => "TIMESTAMP",
            PropValue::String(_) => "STRING",
        }
    }

    /// Whether a non null value can be stored in a field of type `typ`.
    fn fits(&self, typ: FieldType) -> bool {
        matches!(
            (self, typ),
            (PropValue::Bool(_), FieldType::Boolean)
                | (PropValue::Int64(_), FieldType::Integer | FieldType::Long)
                | (PropValue::Float64(_), FieldType::Double | FieldType::Decimal)
                | (
                    PropValue::Timestamp(_),
                    FieldType::Timestamp | FieldType::Date | FieldType::Time
                )
                | (PropValue::String(_), FieldType::String)
        )
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::String(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::String(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int64(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float64(v)
    }
}

impl From<DateTime<Utc>> for PropValue {
    fn from(v: DateTime<Utc>) -> Self {
        PropValue::Timestamp(v)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(v: Option<T>) -> Self {
        match v {
            None => PropValue::Null,
            Some(v) => v.into(),
        }
    }
}

/// Property values of one event, checked against the declared schema on write.
///
/// Undeclared properties are accepted as is; schema inference for them happens
/// downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    schema: HashMap<String, SchemaField>,
    values: BTreeMap<String, PropValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(fields: Vec<SchemaField>) -> Self {
        Self {
            schema: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
            values: BTreeMap::new(),
        }
    }

    pub fn declare(&mut self, field: SchemaField) {
        self.schema.insert(field.name.clone(), field);
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.schema.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    pub fn put(&mut self, name: &str, value: impl Into<PropValue>) -> Result<()> {
        let value = value.into();
        if let Some(field) = self.schema.get(name) {
            if value.is_null() {
                if !field.nullable {
                    return Err(IngesterError::NotNullable(name.to_string()));
                }
            } else if !value.fits(field.typ) {
                return Err(IngesterError::TypeMismatch {
                    field: name.to_string(),
                    expected: field.typ,
                    actual: value.type_name(),
                });
            }
        }

        self.values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        self.values.remove(name)
    }

    pub fn values(&self) -> &BTreeMap<String, PropValue> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub project: String,
    pub collection: String,
    pub properties: Properties,
}

impl Event {
    pub fn new(project: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            collection: collection.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_properties(self, properties: Properties) -> Self {
        Self { properties, ..self }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn schema() -> Vec<SchemaField> {
        vec![
            SchemaField::new("url", FieldType::String, false),
            SchemaField::new("price", FieldType::Double, true),
            SchemaField::new("count", FieldType::Long, true),
            SchemaField::new("at", FieldType::Timestamp, true),
        ]
    }

    #[test]
    fn test_put_checks_schema() -> Result<()> {
        let mut props = Properties::with_schema(schema());

        props.put("url", "/index.html")?;
        props.put("price", 9.5)?;
        props.put("count", 3i64)?;
        props.put("at", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())?;
        props.put("price", PropValue::Null)?;
        // undeclared
        props.put("ref", 1i64)?;
        assert_eq!(props.len(), 5);

        let err = props.put("count", "three").unwrap_err();
        assert!(matches!(
            err,
            IngesterError::TypeMismatch {
                expected: FieldType::Long,
                actual: "STRING",
                ..
            }
        ));
        assert_eq!(props.get("count"), Some(&PropValue::Int64(3)));

        let err = props.put("url", None::<String>).unwrap_err();
        assert!(matches!(err, IngesterError::NotNullable(_)));
        assert_eq!(props.get("url").and_then(|v| v.as_str()), Some("/index.html"));
        Ok(())
    }

    #[test]
    fn test_deserialize_values() -> serde_json::Result<()> {
        let values: BTreeMap<String, PropValue> = serde_json::from_str(
            r#"{"a": null, "b": true, "c": 12, "d": 1.5, "e": "2024-01-01T00:00:00Z", "f": "x"}"#,
        )?;

        assert_eq!(values["a"], PropValue::Null);
        assert_eq!(values["b"], PropValue::Bool(true));
        assert_eq!(values["c"], PropValue::Int64(12));
        assert_eq!(values["d"], PropValue::Float64(1.5));
        assert_eq!(
            values["e"],
            PropValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(values["f"], PropValue::String("x".to_string()));
        Ok(())
    }
}
