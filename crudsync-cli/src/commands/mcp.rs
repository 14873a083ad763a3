use clap::{Args, Subcommand};
use crudsync_core::models::{mcp_validator, MCP_SERVERS};
use crudsync_core::{CommandType, CrudForm, CrudOptions, McpServer, Settings};
use std::collections::BTreeMap;

use super::{parse_env_pair, runtime, OutputFormat};
use crate::backend::Backend;
use crate::config::Config;

#[derive(Args)]
pub struct McpCommand {
    #[command(subcommand)]
    pub command: McpSubcommand,
}

#[derive(Subcommand)]
pub enum McpSubcommand {
    /// List custom MCP servers
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a custom MCP server
    Add {
        /// Server name (unique, up to 50 characters)
        name: String,

        #[command(flatten)]
        fields: McpFields,

        /// Add the server disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Update a custom MCP server; only the given fields change
    Update {
        name: String,

        #[command(flatten)]
        fields: McpFields,
    },

    /// Delete a custom MCP server
    Delete { name: String },

    /// Enable a custom MCP server
    Enable { name: String },

    /// Disable a custom MCP server
    Disable { name: String },
}

/// Editable MCP server fields.
#[derive(Args, Debug, Default)]
pub struct McpFields {
    /// What the server does
    #[arg(long, short)]
    description: Option<String>,

    /// Launcher: npx, bunx, uvx or http
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    command_type: Option<CommandType>,

    /// Package to run (npx, bunx and uvx servers)
    #[arg(long)]
    package: Option<String>,

    /// Server URL (http servers)
    #[arg(long)]
    url: Option<String>,

    /// Argument passed to the server (can be repeated)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    args: Vec<String>,

    /// Environment variable for the server, KEY=VALUE (can be repeated)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,
}

impl McpFields {
    /// Writes the given fields into the form's draft.
    fn apply(&self, form: &mut CrudForm<Settings, McpServer>) {
        if let Some(description) = &self.description {
            form.change_field(McpServer::DESCRIPTION, description.clone());
        }
        if let Some(command_type) = self.command_type {
            form.change_field(McpServer::COMMAND_TYPE, command_type);
        }
        if let Some(package) = &self.package {
            form.change_field(McpServer::PACKAGE, Some(package.clone()));
        }
        if let Some(url) = &self.url {
            form.change_field(McpServer::URL, Some(url.clone()));
        }
        if !self.args.is_empty() {
            form.change_field(McpServer::ARGS, Some(self.args.clone()));
        }
        if !self.env.is_empty() {
            let env: BTreeMap<String, String> = self.env.iter().cloned().collect();
            form.change_field(McpServer::ENV_VARS, Some(env));
        }
    }
}

impl McpCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let rt = runtime()?;
        rt.block_on(async {
            let backend = Backend::connect(config).await?;
            self.execute(&backend).await
        })
    }

    async fn execute(&self, backend: &Backend) -> Result<(), Box<dyn std::error::Error>> {
        let mut form = mcp_form(backend);

        match &self.command {
            McpSubcommand::List { format } => {
                print_servers(&form.items(), format)?;
            }
            McpSubcommand::Add {
                name,
                fields,
                disabled,
            } => {
                form.add();
                form.change_field(McpServer::NAME, name.clone());
                fields.apply(&mut form);
                if *disabled {
                    form.change_field(McpServer::ENABLED, false);
                }
                form.save().await?;
            }
            McpSubcommand::Update { name, fields } => {
                let index = find(&form, name)?;
                form.edit(index);
                fields.apply(&mut form);
                form.save().await?;
            }
            McpSubcommand::Delete { name } => {
                let index = find(&form, name)?;
                form.delete(index).await?;
            }
            McpSubcommand::Enable { name } => {
                let index = find(&form, name)?;
                form.toggle_enabled(index, true).await?;
            }
            McpSubcommand::Disable { name } => {
                let index = find(&form, name)?;
                form.toggle_enabled(index, false).await?;
            }
        }

        Ok(())
    }
}

fn mcp_form(backend: &Backend) -> CrudForm<Settings, McpServer> {
    let existing = MCP_SERVERS.items(&backend.store.snapshot()).to_vec();
    let options = CrudOptions::new("MCP server", MCP_SERVERS, McpServer::default)
        .validator(mcp_validator(existing))
        .strategy(backend.mcp_strategy.clone())
        .invalidates(backend.invalidates.clone());
    CrudForm::new(
        options,
        backend.store.clone(),
        backend.notifier.clone(),
        backend.events.clone(),
    )
}

fn find(form: &CrudForm<Settings, McpServer>, name: &str) -> Result<usize, String> {
    form.position_of(name)
        .ok_or_else(|| format!("MCP server not found: {}", name))
}

fn print_servers(
    servers: &[McpServer],
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(servers)?);
        }
        OutputFormat::Text => {
            if servers.is_empty() {
                println!("No custom MCP servers.");
                return Ok(());
            }
            println!("Custom MCP servers ({})", servers.len());
            println!();
            for server in servers {
                print!("{}", server);
            }
        }
    }
    Ok(())
}
