use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use common::config::DEFAULT_IDENTIFIER_COLUMN;
use common::config::DEFAULT_USER_CONNECTOR;
use common::types::SchemaField;
use serde_derive::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing::Level;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct Log {
    pub level: LogLevel,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub enum UserStorageKind {
    #[serde(rename = "default")]
    Default,
    #[default]
    #[serde(rename = "presto")]
    Presto,
}

impl From<UserStorageKind> for common::config::UserStorageKind {
    fn from(kind: UserStorageKind) -> Self {
        match kind {
            UserStorageKind::Default => common::config::UserStorageKind::Default,
            UserStorageKind::Presto => common::config::UserStorageKind::Presto,
        }
    }
}

fn default_identifier_column() -> String {
    DEFAULT_IDENTIFIER_COLUMN.to_string()
}

fn default_user_connector() -> String {
    DEFAULT_USER_CONNECTOR.to_string()
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct UserStorage {
    #[serde(default)]
    pub kind: UserStorageKind,
    #[serde(default = "default_identifier_column")]
    pub identifier_column: String,
    #[serde(default)]
    pub enable_user_mapping: bool,
    #[serde(default = "default_user_connector")]
    pub user_connector: String,
}

impl Default for UserStorage {
    fn default() -> Self {
        Self {
            kind: UserStorageKind::default(),
            identifier_column: default_identifier_column(),
            enable_user_mapping: false,
            user_connector: default_user_connector(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct Data {
    pub ua_db_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct Config {
    pub log: Log,
    #[serde(default)]
    pub user_storage: UserStorage,
    #[serde(default)]
    pub data: Data,
    /// Collections known to the metastore, by project.
    #[serde(default)]
    pub collections: BTreeMap<String, BTreeMap<String, Vec<SchemaField>>>,
}

impl TryInto<common::config::Config> for Config {
    type Error = crate::error::Error;

    fn try_into(self) -> Result<common::config::Config, Self::Error> {
        let user_storage = common::config::UserStorage {
            kind: self.user_storage.kind.into(),
            identifier_column: self.user_storage.identifier_column,
            enable_user_mapping: self.user_storage.enable_user_mapping,
            user_connector: self.user_storage.user_connector,
        };
        user_storage.validate()?;

        Ok(common::config::Config {
            log: common::config::Log {
                level: self.log.level.into(),
            },
            user_storage,
        })
    }
}

#[derive(Deserialize, Copy, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
        .into()
    }
}
