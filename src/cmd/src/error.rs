use std::result;

use common::error::CommonError;
use ingester::error::IngesterError;
use metadata::error::MetadataError;
use query::error::QueryError;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;

pub type Result<T> = result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("config: {0:?}")]
    Config(#[from] config::ConfigError),
    #[error("SetGlobalDefaultError: {0:?}")]
    SetGlobalDefaultError(SetGlobalDefaultError),
    #[error("StdIO: {0:?}")]
    StdIO(#[from] std::io::Error),
    #[error("ParseDuration: {0:?}")]
    ParseDuration(#[from] parse_duration::parse::Error),
    #[error("serde json: {0:?}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("common: {0:?}")]
    Common(#[from] CommonError),
    #[error("metadata: {0:?}")]
    Metadata(#[from] MetadataError),
    #[error("query: {0:?}")]
    Query(#[from] QueryError),
    #[error("ingester: {0:?}")]
    Ingester(#[from] IngesterError),
}
