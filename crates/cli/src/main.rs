//! Right-sizing CLI
//!
//! Renders and validates configuration records offline, and reports the
//! state of right-sizing resources on a hub cluster.

mod commands;
mod config;
mod output;
mod record;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{render, status};
use rightsizing_lib::{ComponentIdentity, KubeStore, DEFAULT_CONFIG_NAMESPACE};
use std::path::PathBuf;

/// Right-sizing CLI
#[derive(Parser)]
#[command(name = "rsctl")]
#[command(author, version, about = "CLI for the observability right-sizing controller", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (inferred from the environment if not specified)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the PrometheusRule generated from a configuration record file
    Render {
        /// Component whose rules to generate (namespace or virtualization)
        #[arg(long, short)]
        component: ComponentIdentity,

        /// ConfigMap manifest or bare data map
        #[arg(long, short = 'f')]
        config: PathBuf,

        #[arg(long, value_enum, default_value = "yaml")]
        format: output::DocumentFormat,
    },

    /// Check that a configuration record file decodes and generates rules
    Validate {
        /// Component to validate against (namespace or virtualization)
        #[arg(long, short)]
        component: ComponentIdentity,

        /// ConfigMap manifest or bare data map
        #[arg(long, short = 'f')]
        config: PathBuf,
    },

    /// Print the configuration record seeded for a component
    Defaults {
        /// Component (namespace or virtualization)
        #[arg(long, short)]
        component: ComponentIdentity,

        /// Namespace the record is created in
        #[arg(long, env = "RIGHTSIZING_CONFIG_NAMESPACE", default_value = DEFAULT_CONFIG_NAMESPACE)]
        config_namespace: String,

        #[arg(long, value_enum, default_value = "yaml")]
        format: output::DocumentFormat,
    },

    /// Show which right-sizing resources exist on the cluster
    Status {
        /// Namespace holding the configuration records
        #[arg(long, env = "RIGHTSIZING_CONFIG_NAMESPACE", default_value = DEFAULT_CONFIG_NAMESPACE)]
        config_namespace: String,

        #[arg(long, value_enum, default_value = "table")]
        format: output::OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            component,
            config,
            format,
        } => {
            render::render(component, &config, format)?;
        }
        Commands::Validate { component, config } => {
            if !render::validate(component, &config) {
                std::process::exit(1);
            }
        }
        Commands::Defaults {
            component,
            config_namespace,
            format,
        } => {
            render::defaults(component, &config_namespace, format)?;
        }
        Commands::Status {
            config_namespace,
            format,
        } => {
            let client = config::kube_client(cli.kubeconfig.as_deref()).await?;
            let store = KubeStore::new(client);
            status::show_status(&store, &config_namespace, format).await?;
        }
    }

    Ok(())
}
