use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wpfleet::telemetry::{LogFormat, init_tracing};

mod cmd;

#[derive(Parser)]
#[command(name = "wpfleet")]
#[command(version, about = "Provision and manage WordPress sites on a single host")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to wpfleet.toml. Defaults to ./wpfleet.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the provisioning API on the host that serves the sites
    Provisioner {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        bind: Option<String>,
    },
    /// Run the dashboard gateway
    Gateway {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        bind: Option<String>,

        /// Allow cross-origin requests (for a UI dev server)
        #[arg(long)]
        dev: bool,
    },
    /// View or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration with secrets masked
    Show,
    /// Write a commented wpfleet.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match &cli.command {
        Commands::Provisioner { port, bind } => {
            cmd::cmd_provisioner(cli.config.as_deref(), *port, bind.clone()).await?
        }
        Commands::Gateway { port, bind, dev } => {
            cmd::cmd_gateway(cli.config.as_deref(), *port, bind.clone(), *dev).await?
        }
        Commands::Config { command } => cmd::cmd_config(cli.config.as_deref(), command.clone())?,
    }

    Ok(())
}
