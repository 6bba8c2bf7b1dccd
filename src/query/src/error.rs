use std::result;

use common::error::CommonError;
use hyper::StatusCode;
use metadata::error::MetadataError;
use thiserror::Error;

pub type Result<T> = result::Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("execution: {0}")]
    Execution(String),
    #[error("initialization: {0}")]
    Init(String),
    #[error("internal {0:?}")]
    Internal(String),
    #[error("metadata {0:?}")]
    Metadata(#[from] MetadataError),
    #[error("common {0:?}")]
    Common(#[from] CommonError),
}

impl QueryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::BadRequest(_) => StatusCode::BAD_REQUEST,
            QueryError::Common(err) if err.is_bad_request() => StatusCode::BAD_REQUEST,
            QueryError::Metadata(MetadataError::Common(err)) if err.is_bad_request() => {
                StatusCode::BAD_REQUEST
            }
            QueryError::Metadata(MetadataError::NotFound(_)) => StatusCode::NOT_FOUND,
            QueryError::Metadata(MetadataError::AlreadyExists(_)) => StatusCode::CONFLICT,
            QueryError::Execution(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
