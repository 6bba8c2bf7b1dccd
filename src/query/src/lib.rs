pub mod error;
pub mod event_filter;
pub mod executor;
pub mod sql;
pub mod test_util;
pub mod user_storage;

pub use error::Result;
pub use executor::QueryExecutor;
pub use executor::QueryResult;
pub use user_storage::UserStorage;
