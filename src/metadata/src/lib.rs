pub mod error;
pub mod materialized_views;
pub mod metastore;

pub use error::Result;
