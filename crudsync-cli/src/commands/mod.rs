use clap::ValueEnum;

mod config_cmd;
mod env;
mod mcp;
mod plugin;

pub use config_cmd::ConfigCommand;
pub use env::EnvCommand;
pub use mcp::McpCommand;
pub use plugin::PluginCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Runtime for commands that talk to a store or server.
fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Runtime error: {}", e).into())
}

/// Parses a `KEY=VALUE` argument.
fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid environment variable '{}'. Expected KEY=VALUE", s)),
    }
}
