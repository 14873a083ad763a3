use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::mcp::McpServer;
use crate::item::{CrudItem, Field};
use crate::lens::ItemLens;

/// A user-level environment variable. These have no stable identity, so
/// the form engine edits them by position through whole-document persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomEnvVar {
    pub key: String,
    pub value: String,
}

impl CustomEnvVar {
    pub const KEY: Field<Self, String> = Field::new("key", |e, v| e.key = v);
    pub const VALUE: Field<Self, String> = Field::new("value", |e, v| e.value = v);

    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl CrudItem for CustomEnvVar {}

impl fmt::Display for CustomEnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Validator for environment variable drafts.
pub fn env_var_validator(draft: &CustomEnvVar, _editing: Option<usize>) -> Option<String> {
    let key = draft.key.trim();
    if key.is_empty() {
        return Some("Key is required".to_string());
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Some(format!(
            "Invalid key '{}': use letters, digits and underscores",
            key
        ));
    }
    None
}

/// The user settings document.
///
/// Fields this crate does not manage are kept in `extra` so a full-document
/// write never drops them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_mcps: Option<Vec<McpServer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_env_vars: Option<Vec<CustomEnvVar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Stamps the document as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    pub fn mcps(&self) -> &[McpServer] {
        MCP_SERVERS.items(self)
    }

    pub fn env_vars(&self) -> &[CustomEnvVar] {
        ENV_VARS.items(self)
    }

    pub fn find_mcp(&self, name: &str) -> Option<&McpServer> {
        self.mcps().iter().find(|m| m.name == name)
    }
}

fn custom_mcps(settings: &Settings) -> Option<&[McpServer]> {
    settings.custom_mcps.as_deref()
}

fn set_custom_mcps(settings: &mut Settings, items: Option<Vec<McpServer>>) {
    settings.custom_mcps = items;
}

fn custom_env_vars(settings: &Settings) -> Option<&[CustomEnvVar]> {
    settings.custom_env_vars.as_deref()
}

fn set_custom_env_vars(settings: &mut Settings, items: Option<Vec<CustomEnvVar>>) {
    settings.custom_env_vars = items;
}

pub const MCP_SERVERS: ItemLens<Settings, McpServer> =
    ItemLens::new("custom_mcps", custom_mcps, set_custom_mcps);

pub const ENV_VARS: ItemLens<Settings, CustomEnvVar> =
    ItemLens::new("custom_env_vars", custom_env_vars, set_custom_env_vars);
