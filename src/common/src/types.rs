use std::fmt;
use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

/// Identified user id, present on every collection that carries users.
pub const COLUMN_USER: &str = "_user";
/// Anonymous device id.
pub const COLUMN_DEVICE_ID: &str = "_device_id";
pub const COLUMN_TIME: &str = "_time";

/// Table mapping anonymous device ids onto identified users.
pub const TABLE_ANONYMOUS_ID_MAPPING: &str = "_anonymous_id_mapping";
pub const SCHEMA_USERS: &str = "users";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Integer,
    Long,
    Double,
    Decimal,
    Boolean,
    Date,
    Time,
    Timestamp,
}

impl Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{self:?}").to_uppercase())
    }
}

/// One column of a collection as known by the metastore.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: FieldType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl SchemaField {
    pub fn new(name: impl Into<String>, typ: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            typ,
            nullable,
        }
    }
}

pub fn has_field(fields: &[SchemaField], name: &str) -> bool {
    fields.iter().any(|f| f.name == name)
}
