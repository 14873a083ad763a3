//! Marketplace plugin commands.

use clap::{Args, Subcommand};
use crudsync_core::models::{
    ComponentRef, InstallComponentRequest, InstallComponentResult, MarketplacePlugin,
    UninstallComponentRequest,
};
use crudsync_core::MarketplaceService;

use super::{runtime, OutputFormat};
use crate::backend::marketplace;
use crate::config::Config;

#[derive(Args)]
pub struct PluginCommand {
    #[command(subcommand)]
    pub command: PluginSubcommand,
}

#[derive(Subcommand)]
pub enum PluginSubcommand {
    /// Browse the plugin catalog
    Catalog {
        /// Bypass the server's catalog cache
        #[arg(long)]
        refresh: bool,

        /// Only show plugins in this category
        #[arg(long)]
        category: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a plugin's details and components
    Show { name: String },

    /// Install components from a plugin (all of them by default)
    Install {
        name: String,

        /// Component to install, as kind:name (can be repeated)
        #[arg(long = "component", value_name = "KIND:NAME")]
        components: Vec<ComponentRef>,
    },

    /// Uninstall components of a plugin (everything installed by default)
    Uninstall {
        name: String,

        /// Component to uninstall, as kind:name (can be repeated)
        #[arg(long = "component", value_name = "KIND:NAME")]
        components: Vec<ComponentRef>,
    },

    /// List installed plugins
    Installed {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl PluginCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let service = marketplace(config)?;
        let rt = runtime()?;
        rt.block_on(self.execute(&service))
    }

    async fn execute(&self, service: &MarketplaceService) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            PluginSubcommand::Catalog {
                refresh,
                category,
                format,
            } => {
                let plugins = filter_category(service.catalog(*refresh).await?, category.as_deref());
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plugins)?),
                    OutputFormat::Text => print_catalog(&plugins),
                }
            }
            PluginSubcommand::Show { name } => {
                let details = service.plugin_details(name).await?;
                let plugin = &details.plugin;
                println!("{}", plugin.name);
                println!("{}", "=".repeat(plugin.name.len()));
                println!("{}", plugin.description);
                println!();
                println!("Category: {}", plugin.category);
                if let Some(version) = &plugin.version {
                    println!("Version:  {}", version);
                }
                if let Some(author) = &plugin.author {
                    println!("Author:   {}", author.name);
                }
                if let Some(homepage) = &plugin.homepage {
                    println!("Homepage: {}", homepage);
                }
                println!();
                if details.components.is_empty() {
                    println!("No installable components.");
                } else {
                    println!("Components:");
                    for component in details.components.refs() {
                        println!("  - {}", component);
                    }
                }
            }
            PluginSubcommand::Install { name, components } => {
                let components = if components.is_empty() {
                    service.plugin_details(name).await?.components.refs()
                } else {
                    components.clone()
                };
                if components.is_empty() {
                    return Err(format!("Plugin '{}' has no installable components", name).into());
                }

                let response = service
                    .install(&InstallComponentRequest::new(name, &components))
                    .await?;
                for component in &response.installed {
                    println!("✓ Installed {}", component);
                }
                print_failures(&response.failed);
            }
            PluginSubcommand::Uninstall { name, components } => {
                let request = if components.is_empty() {
                    let installed = service
                        .installed()
                        .await?
                        .into_iter()
                        .find(|p| &p.name == name)
                        .ok_or_else(|| format!("Plugin '{}' is not installed", name))?;
                    UninstallComponentRequest {
                        plugin_name: name.clone(),
                        components: installed.components,
                    }
                } else {
                    UninstallComponentRequest::new(name, components)
                };

                let response = service.uninstall(&request).await?;
                for component in &response.uninstalled {
                    println!("✓ Uninstalled {}", component);
                }
                print_failures(&response.failed);
            }
            PluginSubcommand::Installed { format } => {
                let installed = service.installed().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&installed)?),
                    OutputFormat::Text if installed.is_empty() => println!("No plugins installed."),
                    OutputFormat::Text => {
                        for plugin in &installed {
                            let version = plugin.version.as_deref().unwrap_or("-");
                            println!("{} ({}) installed {}", plugin.name, version, plugin.installed_at);
                            for component in &plugin.components {
                                println!("  - {}", component);
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

fn filter_category(plugins: Vec<MarketplacePlugin>, category: Option<&str>) -> Vec<MarketplacePlugin> {
    match category {
        Some(category) => plugins
            .into_iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect(),
        None => plugins,
    }
}

fn print_catalog(plugins: &[MarketplacePlugin]) {
    if plugins.is_empty() {
        println!("No plugins found.");
        return;
    }
    for plugin in plugins {
        let version = plugin
            .version
            .as_deref()
            .map(|v| format!(" v{}", v))
            .unwrap_or_default();
        println!("{}{} [{}]", plugin.name, version, plugin.category);
        println!("  {}", plugin.description);
    }
}

fn print_failures(failed: &[InstallComponentResult]) {
    for failure in failed {
        eprintln!(
            "✗ {}: {}",
            failure.component,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
}
