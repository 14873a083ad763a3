use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod backend;
mod commands;
mod config;
mod console;
mod store;

use commands::{ConfigCommand, EnvCommand, McpCommand, PluginCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "crudsync")]
#[command(version)]
#[command(about = "Manage custom MCP servers, environment variables and plugins", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log engine and HTTP activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage custom MCP servers
    Mcp(McpCommand),

    /// Manage custom environment variables
    Env(EnvCommand),

    /// Browse and install marketplace plugins
    Plugin(PluginCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    match &cli.command {
        Some(Commands::Mcp(cmd)) => cmd.run(&config)?,
        Some(Commands::Env(cmd)) => cmd.run(&config)?,
        Some(Commands::Plugin(cmd)) => cmd.run(&config)?,
        Some(Commands::Config(cmd)) => cmd.run(&config, cli_config_path)?,
        None => println!("Use --help to see available commands"),
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "crudsync=debug,crudsync_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
