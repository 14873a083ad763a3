use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::item::{non_empty, CrudItem, Field, Toggleable};

pub const NAME_MAX_LEN: usize = 50;
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// How an MCP server is launched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    #[default]
    Npx,
    Bunx,
    Uvx,
    Http,
}

impl CommandType {
    /// Whether the server is reached over HTTP rather than run from a package.
    pub fn is_remote(&self) -> bool {
        matches!(self, CommandType::Http)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::Npx => write!(f, "npx"),
            CommandType::Bunx => write!(f, "bunx"),
            CommandType::Uvx => write!(f, "uvx"),
            CommandType::Http => write!(f, "http"),
        }
    }
}

impl FromStr for CommandType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "npx" => Ok(CommandType::Npx),
            "bunx" => Ok(CommandType::Bunx),
            "uvx" => Ok(CommandType::Uvx),
            "http" => Ok(CommandType::Http),
            _ => Err(format!(
                "Invalid command type '{}'. Valid options: npx, bunx, uvx, http",
                s
            )),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// A user-defined MCP server entry in the settings document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpServer {
    pub name: String,
    pub description: String,
    pub command_type: CommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for McpServer {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            command_type: CommandType::default(),
            package: None,
            url: None,
            env_vars: None,
            args: None,
            enabled: true,
        }
    }
}

impl McpServer {
    /// Stored trimmed, so the name matches what the validator compared.
    pub const NAME: Field<Self, String> =
        Field::new("name", |m, v| m.name = v.trim().to_string());
    pub const DESCRIPTION: Field<Self, String> =
        Field::new("description", |m, v| m.description = v);
    pub const COMMAND_TYPE: Field<Self, CommandType> =
        Field::new("command_type", |m, v| m.command_type = v);
    pub const PACKAGE: Field<Self, Option<String>> = Field::new("package", |m, v| m.package = v);
    pub const URL: Field<Self, Option<String>> = Field::new("url", |m, v| m.url = v);
    pub const ENV_VARS: Field<Self, Option<BTreeMap<String, String>>> =
        Field::new("env_vars", |m, v| m.env_vars = v);
    pub const ARGS: Field<Self, Option<Vec<String>>> = Field::new("args", |m, v| m.args = v);
    pub const ENABLED: Field<Self, bool> = Field::new("enabled", |m, v| m.enabled = v);

    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_package(mut self, command_type: CommandType, package: impl Into<String>) -> Self {
        self.command_type = command_type;
        self.package = Some(package.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.command_type = CommandType::Http;
        self.url = Some(url.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Checks the field rules a server enforces on every write.
    pub fn check(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if name.chars().count() > NAME_MAX_LEN {
            return Err(format!("Name must be at most {} characters", NAME_MAX_LEN));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err("Description is required".to_string());
        }
        if description.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(format!(
                "Description must be at most {} characters",
                DESCRIPTION_MAX_LEN
            ));
        }
        match self.command_type {
            CommandType::Http if blank(&self.url) => Err("URL is required for http servers".to_string()),
            CommandType::Http => Ok(()),
            other if blank(&self.package) => {
                Err(format!("Package is required for {} servers", other))
            }
            _ => Ok(()),
        }
    }

    /// Applies the fields present in `update`, leaving the rest untouched.
    pub fn apply_update(&mut self, update: McpUpdateRequest) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(command_type) = update.command_type {
            self.command_type = command_type;
        }
        if update.package.is_some() {
            self.package = update.package;
        }
        if update.url.is_some() {
            self.url = update.url;
        }
        if update.env_vars.is_some() {
            self.env_vars = update.env_vars;
        }
        if update.args.is_some() {
            self.args = update.args;
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
    }

    /// One-line launch summary, e.g. `npx @scope/pkg --flag` or the URL.
    pub fn launch_summary(&self) -> String {
        if self.command_type.is_remote() {
            return self.url.clone().unwrap_or_default();
        }
        let mut parts = vec![self.command_type.to_string()];
        parts.extend(self.package.clone());
        parts.extend(self.args.iter().flatten().cloned());
        parts.join(" ")
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

impl CrudItem for McpServer {
    fn identity(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

impl Toggleable for McpServer {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl fmt::Display for McpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        writeln!(f, "{} ({})", self.name, state)?;
        writeln!(f, "  {}", self.description)?;
        writeln!(f, "  {}", self.launch_summary())?;
        if let Some(env) = &self.env_vars {
            for key in env.keys() {
                writeln!(f, "  env: {}", key)?;
            }
        }
        Ok(())
    }
}

/// Body of `POST /mcps/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpCreateRequest {
    pub name: String,
    pub description: String,
    pub command_type: CommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl From<&McpServer> for McpCreateRequest {
    fn from(server: &McpServer) -> Self {
        Self {
            name: server.name.clone(),
            description: server.description.clone(),
            command_type: server.command_type,
            package: server.package.clone(),
            url: server.url.clone(),
            env_vars: server.env_vars.clone(),
            args: server.args.clone(),
            enabled: server.enabled,
        }
    }
}

impl From<McpCreateRequest> for McpServer {
    fn from(req: McpCreateRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            command_type: req.command_type,
            package: req.package,
            url: req.url,
            env_vars: req.env_vars,
            args: req.args,
            enabled: req.enabled,
        }
    }
}

/// Body of `PUT /mcps/{name}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct McpUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_type: Option<CommandType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl McpUpdateRequest {
    pub fn enabled_only(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }
}

impl From<&McpServer> for McpUpdateRequest {
    fn from(server: &McpServer) -> Self {
        Self {
            description: Some(server.description.clone()),
            command_type: Some(server.command_type),
            package: server.package.clone(),
            url: server.url.clone(),
            env_vars: server.env_vars.clone(),
            args: server.args.clone(),
            enabled: Some(server.enabled),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    Deleted,
    NotFound,
}

/// Body returned by `DELETE /mcps/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpDeleteResponse {
    pub status: DeleteStatus,
}

/// Builds the form validator for MCP servers.
///
/// `existing` is the list the form edits; a new name may not collide with
/// any entry other than the one being edited.
pub fn mcp_validator(
    existing: Vec<McpServer>,
) -> impl Fn(&McpServer, Option<usize>) -> Option<String> + Send + Sync + 'static {
    move |draft, editing| {
        if let Err(message) = draft.check() {
            return Some(message);
        }
        let name = draft.name.trim();
        let taken = existing
            .iter()
            .enumerate()
            .any(|(i, s)| Some(i) != editing && s.name.trim() == name);
        taken.then(|| format!("An MCP server named '{}' already exists", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npx(name: &str) -> McpServer {
        McpServer::new(name, "A server").with_package(CommandType::Npx, "@acme/server")
    }

    #[test]
    fn test_command_type_from_str() {
        assert_eq!(CommandType::from_str("UVX").unwrap(), CommandType::Uvx);
        assert_eq!(CommandType::from_str("http").unwrap(), CommandType::Http);
        assert!(CommandType::from_str("docker").is_err());
    }

    #[test]
    fn test_default_is_enabled() {
        assert!(McpServer::default().enabled);
        let parsed: McpServer = serde_json::from_str(
            r#"{"name":"a","description":"d","command_type":"bunx","package":"p"}"#,
        )
        .unwrap();
        assert!(parsed.enabled);
        assert_eq!(parsed.command_type, CommandType::Bunx);
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let json = serde_json::to_value(npx("a")).unwrap();
        assert_eq!(json["command_type"], "npx");
        assert!(json.get("url").is_none());
        assert!(json.get("env_vars").is_none());
    }

    #[test]
    fn test_check_rules() {
        assert!(npx("a").check().is_ok());
        assert_eq!(
            McpServer::new("", "d").check().unwrap_err(),
            "Name is required"
        );
        assert!(McpServer::new("x".repeat(51), "d").check().is_err());
        assert!(McpServer::new("a", "").check().is_err());
        assert_eq!(
            McpServer::new("a", "d").check().unwrap_err(),
            "Package is required for npx servers"
        );

        let mut http = McpServer::new("remote", "d");
        http.command_type = CommandType::Http;
        assert_eq!(http.check().unwrap_err(), "URL is required for http servers");
        assert!(http.with_url("https://mcp.example.com").check().is_ok());
    }

    #[test]
    fn test_validator_rejects_duplicate_names() {
        let validate = mcp_validator(vec![npx("a"), npx("b")]);

        assert!(validate(&npx("c"), None).is_none());
        assert!(validate(&npx("a"), None).unwrap().contains("already exists"));
        // Editing "a" in place keeps its own name.
        assert!(validate(&npx("a"), Some(0)).is_none());
        assert!(validate(&npx("b"), Some(0)).is_some());
    }

    #[test]
    fn test_padded_names_collide() {
        let validate = mcp_validator(vec![npx(" a"), npx("b")]);
        assert!(validate(&npx("a"), None).unwrap().contains("already exists"));
        assert!(validate(&npx("b "), None).is_some());

        let mut draft = McpServer::default();
        McpServer::NAME.apply(&mut draft, "  fs ".into());
        assert_eq!(draft.name, "fs");
        assert_eq!(draft.identity(), Some("fs"));
    }

    #[test]
    fn test_apply_update_keeps_missing_fields() {
        let mut server = npx("a").with_args(vec!["--port".into(), "3000".into()]);
        server.apply_update(McpUpdateRequest::enabled_only(false));

        assert!(!server.enabled);
        assert_eq!(server.package.as_deref(), Some("@acme/server"));
        assert_eq!(server.args.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_create_request_round_trips_server() {
        let server = npx("a").with_env_var("TOKEN", "x");
        let req = McpCreateRequest::from(&server);
        assert_eq!(McpServer::from(req), server);
    }

    #[test]
    fn test_delete_status_wire_format() {
        let body = serde_json::to_string(&McpDeleteResponse {
            status: DeleteStatus::NotFound,
        })
        .unwrap();
        assert_eq!(body, r#"{"status":"not_found"}"#);
    }

    #[test]
    fn test_launch_summary() {
        let server = npx("a").with_args(vec!["--verbose".into()]);
        assert_eq!(server.launch_summary(), "npx @acme/server --verbose");
        let http = McpServer::new("r", "d").with_url("https://x.dev/mcp");
        assert_eq!(http.launch_summary(), "https://x.dev/mcp");
    }

    #[test]
    fn test_identity_and_fields() {
        let mut server = McpServer::default();
        assert_eq!(server.identity(), None);
        McpServer::NAME.apply(&mut server, "fs".into());
        McpServer::COMMAND_TYPE.apply(&mut server, CommandType::Uvx);
        assert_eq!(server.identity(), Some("fs"));
        assert_eq!(server.command_type, CommandType::Uvx);
    }
}
