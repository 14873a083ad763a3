use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketplaceAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketplacePlugin {
    pub name: String,
    pub description: String,
    pub category: String,
    /// Source path in the plugin repository
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<MarketplaceAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

/// Kinds of installable plugin components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Agent,
    Command,
    Skill,
    Mcp,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Agent => write!(f, "agent"),
            ComponentKind::Command => write!(f, "command"),
            ComponentKind::Skill => write!(f, "skill"),
            ComponentKind::Mcp => write!(f, "mcp"),
        }
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "agent" => Ok(ComponentKind::Agent),
            "command" => Ok(ComponentKind::Command),
            "skill" => Ok(ComponentKind::Skill),
            "mcp" => Ok(ComponentKind::Mcp),
            _ => Err(format!(
                "Invalid component kind '{}'. Valid options: agent, command, skill, mcp",
                s
            )),
        }
    }
}

/// A `kind:name` component reference as used by install and uninstall.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    pub kind: ComponentKind,
    pub name: String,
}

impl ComponentRef {
    pub fn new(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl FromStr for ComponentRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid component '{}'. Expected kind:name", s))?;
        if name.is_empty() {
            return Err(format!("Invalid component '{}': missing name", s));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PluginComponents {
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<String>,
}

impl PluginComponents {
    /// Every component as a `kind:name` reference.
    pub fn refs(&self) -> Vec<ComponentRef> {
        let groups = [
            (ComponentKind::Agent, &self.agents),
            (ComponentKind::Command, &self.commands),
            (ComponentKind::Skill, &self.skills),
            (ComponentKind::Mcp, &self.mcp_servers),
        ];
        groups
            .into_iter()
            .flat_map(|(kind, names)| names.iter().map(move |n| ComponentRef::new(kind, n.clone())))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
            && self.commands.is_empty()
            && self.skills.is_empty()
            && self.mcp_servers.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginDetails {
    #[serde(flatten)]
    pub plugin: MarketplacePlugin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    #[serde(default)]
    pub components: PluginComponents,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstalledPlugin {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub installed_at: String,
    #[serde(default)]
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallComponentRequest {
    pub plugin_name: String,
    pub components: Vec<String>,
}

impl InstallComponentRequest {
    pub fn new(plugin_name: impl Into<String>, components: &[ComponentRef]) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            components: components.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallComponentResult {
    pub component: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallResponse {
    pub plugin_name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub installed: Vec<String>,
    #[serde(default)]
    pub failed: Vec<InstallComponentResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UninstallComponentRequest {
    pub plugin_name: String,
    pub components: Vec<String>,
}

impl UninstallComponentRequest {
    pub fn new(plugin_name: impl Into<String>, components: &[ComponentRef]) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            components: components.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UninstallResponse {
    pub plugin_name: String,
    #[serde(default)]
    pub uninstalled: Vec<String>,
    #[serde(default)]
    pub failed: Vec<InstallComponentResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_ref_parse() {
        let r: ComponentRef = "agent:code-reviewer".parse().unwrap();
        assert_eq!(r, ComponentRef::new(ComponentKind::Agent, "code-reviewer"));
        assert_eq!(r.to_string(), "agent:code-reviewer");

        assert!("code-reviewer".parse::<ComponentRef>().is_err());
        assert!("agent:".parse::<ComponentRef>().is_err());
        assert!("hook:x".parse::<ComponentRef>().is_err());
    }

    #[test]
    fn test_plugin_details_flattened() {
        let raw = r#"{
            "name": "pr-review-toolkit",
            "description": "Review helpers",
            "category": "development",
            "source": "./plugins/pr-review-toolkit",
            "components": {"agents": ["code-reviewer"], "commands": ["review"]}
        }"#;
        let details: PluginDetails = serde_json::from_str(raw).unwrap();
        assert_eq!(details.plugin.name, "pr-review-toolkit");
        assert_eq!(details.readme, None);
        assert!(details.components.skills.is_empty());

        let refs: Vec<String> = details.components.refs().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["agent:code-reviewer", "command:review"]);
    }

    #[test]
    fn test_components_default_when_missing() {
        let raw = r#"{"name":"p","description":"d","category":"c","source":"s"}"#;
        let details: PluginDetails = serde_json::from_str(raw).unwrap();
        assert!(details.components.is_empty());
    }

    #[test]
    fn test_install_request_body() {
        let req = InstallComponentRequest::new(
            "p",
            &[
                ComponentRef::new(ComponentKind::Skill, "s1"),
                ComponentRef::new(ComponentKind::Mcp, "m1"),
            ],
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["components"][0], "skill:s1");
        assert_eq!(json["components"][1], "mcp:m1");
    }
}
