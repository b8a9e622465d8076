use clap::{Parser, Subcommand};

pub mod init_config;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(name = "replica-ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Super-peer replica ledger service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the ledger service
    Run {
        /// Path to config file (default: ~/.local/share/replica-ledger/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Where to write the file (default: ~/.local/share/replica-ledger/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config } => run::execute(config).await,
        Commands::InitConfig { config, force } => init_config::execute(config, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
