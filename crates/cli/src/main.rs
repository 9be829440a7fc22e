mod cli;
mod commands;

use std::sync::Arc;

use clap::Parser;

use cli::{Cli, Commands};
use ssi_common::config::Settings;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)))
        .init();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Investigate { cmd } => {
            let settings = Arc::new(Settings::from_env());
            commands::investigate::run(cmd, settings).await
        }
        Commands::Wallet { cmd } => commands::wallet::run(cmd),
    }
}
