use std::result;
use std::sync::PoisonError;

use common::error::CommonError;
use thiserror::Error;

pub type Result<T> = result::Result<T, MetadataError>;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("already exists ({0:?})")]
    AlreadyExists(String),
    #[error("not found {0:?}")]
    NotFound(String),
    #[error("internal: {0:?}")]
    Internal(String),
    #[error("common: {0}")]
    Common(#[from] CommonError),
}

impl<T> From<PoisonError<T>> for MetadataError {
    fn from(err: PoisonError<T>) -> Self {
        MetadataError::Internal(err.to_string())
    }
}
