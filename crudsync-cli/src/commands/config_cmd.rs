use clap::{Args, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# crudsync configuration

# Local settings document, used when no server is configured
# (default: ~/.local/share/crudsync/settings.json)
# settings_path: ~/.local/share/crudsync/settings.json

# Cache key announced after each list change
item_cache_key: marketplace/installed

# Server connection; with both values set, settings live on the server
# server:
#   url: "http://localhost:8080"
#   api_key: "your-secret-key-here"
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
                OutputFormat::Text => print_config(config),
            },
            ConfigSubcommand::Init => {
                let path = config_path.unwrap_or_else(Config::default_config_path);
                if write_default_config(&path)? {
                    println!("Wrote {}", path.display());
                } else {
                    println!("{} exists, leaving it untouched.", path.display());
                    println!("Run 'crudsync config show' to see the resolved values.");
                }
            }
        }
        Ok(())
    }
}

fn print_config(config: &Config) {
    match &config.config_file {
        Some(path) => println!("file: {}", path.display()),
        None => println!(
            "file: {} (missing, using defaults)",
            Config::default_config_path().display()
        ),
    }

    println!(
        "settings_path: {} [{}]",
        config.settings_path.value.display(),
        config.settings_path.source
    );
    println!(
        "item_cache_key: {} [{}]",
        config.item_cache_key.value, config.item_cache_key.source
    );

    match config.server.credentials() {
        Some((url, _)) => println!("server: {} (api key set)", url),
        None => println!("server: none, settings are read from settings_path"),
    }
}

/// Creates the file with the commented template. Returns false when a file
/// is already there.
fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG)?;
    Ok(true)
}
