use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::Commands;
use config::{AppConfig, CliFlags};

#[derive(Parser, PartialEq, Debug)]
#[command(name = "cmdwire")]
#[command(about = "Declare Discord application commands, sync them and dispatch interactions", long_about = None)]
struct Cli {
    /// Path to the config file (defaults to ~/.cmdwire/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bot token, overriding the config file and CMDWIRE_TOKEN
    #[arg(long, global = true)]
    token: Option<String>,

    /// Discord API base URL
    #[arg(long = "api-base", global = true)]
    api_base: Option<String>,

    /// Application id, skips the application info lookup
    #[arg(long = "application-id", global = true)]
    application_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let flags = CliFlags {
        token: cli.token.clone(),
        api_base: cli.api_base.clone(),
        application_id: cli.application_id.clone(),
    };

    let config = match AppConfig::load(cli.config.as_deref(), &flags) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = cli.command.run(config).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
