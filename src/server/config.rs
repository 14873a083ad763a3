//! Server settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `CRUDSYNC_PORT` | `8080` |
//! | `CRUDSYNC_DATA_DIR` | `<data dir>/crudsync-server` |
//! | `CRUDSYNC_CONFIG` | `<config dir>/crudsync-server/config.yaml` |

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8080;

const APP_DIR: &str = "crudsync-server";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Root of the per-user settings documents
    pub data_dir: PathBuf,
    /// YAML file listing the accepted API keys
    pub config_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. An unparsable port falls
    /// back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup("CRUDSYNC_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "ignoring invalid CRUDSYNC_PORT");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let data_dir = lookup("CRUDSYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| platform_dir(dirs::data_dir()));
        let config_path = lookup("CRUDSYNC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| platform_dir(dirs::config_dir()).join("config.yaml"));

        Self {
            port,
            data_dir,
            config_path,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn platform_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}
