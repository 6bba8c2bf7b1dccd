use serde::Deserialize;
use serde::Serialize;
use tracing::level_filters::LevelFilter;

use crate::error::Result;
use crate::validation::check_table_column;

pub const DEFAULT_IDENTIFIER_COLUMN: &str = "id";
pub const DEFAULT_USER_CONNECTOR: &str = "user";

#[derive(Debug, Clone)]
pub struct Log {
    pub level: LevelFilter,
}

/// Which user storage strategy serves user searches.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub enum UserStorageKind {
    /// Attribute search over the user table only.
    Default,
    /// Event-aware search over the distributed query engine.
    #[default]
    Presto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStorage {
    pub kind: UserStorageKind,
    /// Name of the output user id column.
    pub identifier_column: String,
    /// Unify anonymous and identified users through the anonymous id mapping table.
    pub enable_user_mapping: bool,
    /// Catalog the user table is reachable through from the event engine.
    pub user_connector: String,
}

impl UserStorage {
    pub fn validate(&self) -> Result<()> {
        check_table_column(&self.identifier_column, "identifier column")?;
        check_table_column(&self.user_connector, "user connector")?;
        Ok(())
    }
}

impl Default for UserStorage {
    fn default() -> Self {
        Self {
            kind: UserStorageKind::default(),
            identifier_column: DEFAULT_IDENTIFIER_COLUMN.to_string(),
            enable_user_mapping: false,
            user_connector: DEFAULT_USER_CONNECTOR.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log: Log,
    pub user_storage: UserStorage,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log: Log {
                level: LevelFilter::INFO,
            },
            user_storage: UserStorage::default(),
        }
    }
}
