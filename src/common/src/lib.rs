pub mod config;
pub mod error;
pub mod query;
pub mod types;
pub mod validation;

pub use error::Result;
