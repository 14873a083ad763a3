use clap::{Args, Subcommand};
use crudsync_core::models::{env_var_validator, ENV_VARS};
use crudsync_core::{CrudForm, CrudOptions, CustomEnvVar, PersistenceStrategy, Settings};

use super::{runtime, OutputFormat};
use crate::backend::Backend;
use crate::config::Config;

#[derive(Args)]
pub struct EnvCommand {
    #[command(subcommand)]
    pub command: EnvSubcommand,
}

#[derive(Subcommand)]
pub enum EnvSubcommand {
    /// List custom environment variables
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Set a variable, adding it if it does not exist
    Set { key: String, value: String },

    /// Remove a variable
    Unset { key: String },
}

impl EnvCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let rt = runtime()?;
        rt.block_on(async {
            let backend = Backend::connect(config).await?;
            self.execute(&backend).await
        })
    }

    async fn execute(&self, backend: &Backend) -> Result<(), Box<dyn std::error::Error>> {
        let mut form = env_form(backend);

        match &self.command {
            EnvSubcommand::List { format } => {
                let vars = form.items();
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&vars)?),
                    OutputFormat::Text if vars.is_empty() => println!("No custom environment variables."),
                    OutputFormat::Text => {
                        for var in &vars {
                            println!("{}", var);
                        }
                    }
                }
            }
            EnvSubcommand::Set { key, value } => {
                match position(&form, key) {
                    Some(index) => {
                        form.edit(index);
                    }
                    None => {
                        form.add();
                        form.change_field(CustomEnvVar::KEY, key.clone());
                    }
                }
                form.change_field(CustomEnvVar::VALUE, value.clone());
                form.save().await?;
            }
            EnvSubcommand::Unset { key } => {
                let index = position(&form, key)
                    .ok_or_else(|| format!("Environment variable not set: {}", key))?;
                form.delete(index).await?;
            }
        }

        Ok(())
    }
}

/// Environment variables carry no identity, so they always go through a
/// whole-settings persist.
fn env_form(backend: &Backend) -> CrudForm<Settings, CustomEnvVar> {
    let options = CrudOptions::new("environment variable", ENV_VARS, CustomEnvVar::default)
        .validator(env_var_validator)
        .strategy(PersistenceStrategy::AggregateFallback)
        .invalidates(backend.invalidates.clone());
    CrudForm::new(
        options,
        backend.store.clone(),
        backend.notifier.clone(),
        backend.events.clone(),
    )
}

fn position(form: &CrudForm<Settings, CustomEnvVar>, key: &str) -> Option<usize> {
    form.items().iter().position(|v| v.key == key)
}
