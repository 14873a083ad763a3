//! CLI configuration.
//!
//! Values are resolved in three layers: built-in defaults, then the YAML
//! config file, then `CRUDSYNC_*` environment variables. Each resolved value
//! remembers which layer it came from so `config show` can report it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "crudsync";
const DEFAULT_CACHE_KEY: &str = "marketplace/installed";

const ENV_SETTINGS_PATH: &str = "CRUDSYNC_SETTINGS_PATH";
const ENV_SERVER_URL: &str = "CRUDSYNC_SERVER_URL";
const ENV_API_KEY: &str = "CRUDSYNC_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
        };
        f.write_str(label)
    }
}

/// A resolved value and the layer it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    fn default_value(value: T) -> Self {
        Self {
            value,
            source: ConfigSource::Default,
        }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        self.value = value;
        self.source = source;
    }
}

/// Connection to a crudsync server. Settings live on the server only when
/// both fields are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerLink {
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ServerLink {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.url.as_deref()?, self.api_key.as_deref()?))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Settings document used when no server is configured
    pub settings_path: ConfigValue<PathBuf>,
    /// Cache key announced after each successful list change
    pub item_cache_key: ConfigValue<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub server: ServerLink,
}

/// On-disk shape of the config file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileLayer {
    settings_path: Option<PathBuf>,
    item_cache_key: Option<String>,
    server: Option<ServerLink>,
}

impl FileLayer {
    /// Reads the file at `path`, or `None` when there is no such file.
    fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_yaml::from_str(&contents)
            .map(Some)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with(config_path, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading environment variables through `env`.
    pub fn load_with(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::defaults();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if let Some(layer) = FileLayer::read(&path)? {
            config.apply_file(layer, &path);
            config.config_file = Some(path);
        }

        config.apply_env(env);
        Ok(config)
    }

    fn defaults() -> Self {
        Self {
            settings_path: ConfigValue::default_value(
                Self::default_data_dir().join("settings.json"),
            ),
            item_cache_key: ConfigValue::default_value(DEFAULT_CACHE_KEY.to_string()),
            config_file: None,
            server: ServerLink::default(),
        }
    }

    fn apply_file(&mut self, layer: FileLayer, file: &Path) {
        if let Some(settings_path) = layer.settings_path {
            // relative to the config file's directory
            let resolved = match file.parent() {
                Some(dir) if settings_path.is_relative() => dir.join(settings_path),
                _ => settings_path,
            };
            self.settings_path.set(resolved, ConfigSource::File);
        }
        if let Some(key) = layer.item_cache_key {
            self.item_cache_key.set(key, ConfigSource::File);
        }
        if let Some(server) = layer.server {
            self.server = server;
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(path) = env(ENV_SETTINGS_PATH) {
            self.settings_path
                .set(PathBuf::from(path), ConfigSource::Environment);
        }
        if let Some(url) = env(ENV_SERVER_URL) {
            self.server.url = Some(url);
        }
        if let Some(key) = env(ENV_API_KEY) {
            self.server.api_key = Some(key);
        }
    }

    /// `<config dir>/crudsync`, e.g. `~/.config/crudsync` on Linux.
    pub fn default_config_dir() -> PathBuf {
        app_dir(dirs::config_dir())
    }

    /// `<data dir>/crudsync`, e.g. `~/.local/share/crudsync` on Linux.
    pub fn default_data_dir() -> PathBuf {
        app_dir(dirs::data_dir())
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

#[derive(Debug)]
pub enum ConfigError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::Parse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
