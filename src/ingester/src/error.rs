use std::result;

use common::types::FieldType;
use metadata::error::MetadataError;
use thiserror::Error;

pub type Result<T> = result::Result<T, IngesterError>;

#[derive(Error, Debug)]
pub enum IngesterError {
    #[error("user agent parser: {0}")]
    UserAgentParser(String),
    #[error("field {field} is {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: &'static str,
    },
    #[error("field {0} is not nullable")]
    NotNullable(String),
    #[error("metadata: {0:?}")]
    Metadata(#[from] MetadataError),
}
