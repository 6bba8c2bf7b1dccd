use std::fs::File;
use std::path::Path;

use common::types::FieldType;
use common::types::SchemaField;
use tracing::info;
use uaparser::Parser;
use uaparser::UserAgentParser;

use crate::error::IngesterError;
use crate::error::Result;
use crate::event::Event;
use crate::event::PropValue;
use crate::mapper::EventMapper;
use crate::mapper::FieldDependencyBuilder;

pub const FIELD_USER_AGENT: &str = "user_agent";
pub const FIELD_USER_AGENT_VERSION: &str = "user_agent_version";
pub const FIELD_OS: &str = "os";
pub const FIELD_OS_VERSION: &str = "os_version";
pub const FIELD_DEVICE_FAMILY: &str = "device_family";

/// Derives browser, os and device fields from the `user_agent` property.
pub struct UserAgentMapper {
    ua_parser: UserAgentParser,
}

impl UserAgentMapper {
    /// Loads the parser from a regexes yaml file.
    pub fn try_new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "initializing ua parser...");
        let file = File::open(path)
            .map_err(|e| IngesterError::UserAgentParser(format!("{}: {e}", path.display())))?;
        let ua_parser = UserAgentParser::from_file(file)
            .map_err(|e| IngesterError::UserAgentParser(e.to_string()))?;

        Ok(Self { ua_parser })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let ua_parser = UserAgentParser::from_bytes(bytes)
            .map_err(|e| IngesterError::UserAgentParser(e.to_string()))?;

        Ok(Self { ua_parser })
    }

    /// Derived fields for one user agent string.
    pub fn resolve(&self, user_agent: &str) -> Vec<(&'static str, PropValue)> {
        let client = self.ua_parser.parse(user_agent);

        vec![
            (
                FIELD_USER_AGENT,
                PropValue::from(client.user_agent.family.to_string()),
            ),
            (
                FIELD_USER_AGENT_VERSION,
                version(
                    client.user_agent.minor.as_deref(),
                    client.user_agent.major.as_deref(),
                ),
            ),
            (FIELD_OS, PropValue::from(client.os.family.to_string())),
            (
                FIELD_OS_VERSION,
                version(client.os.minor.as_deref(), client.os.major.as_deref()),
            ),
            (
                FIELD_DEVICE_FAMILY,
                PropValue::from(client.device.family.to_string()),
            ),
        ]
    }
}

/// `<minor> / <major>`, null when neither is known.
fn version(minor: Option<&str>, major: Option<&str>) -> PropValue {
    if minor.is_none() && major.is_none() {
        return PropValue::Null;
    }

    PropValue::String(format!(
        "{} / {}",
        minor.unwrap_or_default(),
        major.unwrap_or_default()
    ))
}

impl EventMapper for UserAgentMapper {
    fn map(&self, event: &mut Event) -> Result<()> {
        // only events without a user agent are enriched, parsing an empty agent
        let absent = event
            .properties
            .get(FIELD_USER_AGENT)
            .map_or(true, PropValue::is_null);
        if !absent {
            return Ok(());
        }

        for (name, value) in self.resolve("") {
            event.properties.put(name, value)?;
        }

        Ok(())
    }

    fn add_field_dependency(&self, builder: &mut FieldDependencyBuilder) {
        builder.add_dependent_fields(FIELD_USER_AGENT, vec![
            SchemaField::new(FIELD_OS, FieldType::String, true),
            SchemaField::new(FIELD_OS_VERSION, FieldType::String, true),
            SchemaField::new(FIELD_USER_AGENT_VERSION, FieldType::String, true),
            SchemaField::new(FIELD_DEVICE_FAMILY, FieldType::String, true),
        ]);
    }
}
