use std::result;

use thiserror::Error;

pub type Result<T> = result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("invalid {kind} {name:?}")]
    InvalidIdentifier { kind: String, name: String },
    #[error("BadRequest: {0}")]
    BadRequest(String),
    #[error("sql parser: {0}")]
    SqlParser(#[from] sqlparser::parser::ParserError),
    #[error("serde: {0:?}")]
    Serde(#[from] serde_json::Error),
}

impl CommonError {
    pub fn invalid_identifier(kind: impl ToString, name: impl ToString) -> Self {
        CommonError::InvalidIdentifier {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Whether the error was caused by the request rather than by the system.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            CommonError::InvalidIdentifier { .. }
                | CommonError::BadRequest(_)
                | CommonError::SqlParser(_)
                | CommonError::Serde(_)
        )
    }
}
