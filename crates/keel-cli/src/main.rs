//! Keel CLI - apply, inspect and verify SQLite schema migrations

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod error;
mod source;

use cli::Cli;
use commands::common::ExitCode;
use commands::{check, erase, migrate, status};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match &cli.command {
        cli::Commands::Migrate(args) => migrate::execute(args, &cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
        cli::Commands::Check(args) => check::execute(args, &cli.global).await,
        cli::Commands::Erase(args) => erase::execute(args, &cli.global).await,
    };

    if let Some(ExitCode(code)) = result.as_ref().err().and_then(|e| e.downcast_ref::<ExitCode>()) {
        std::process::exit(*code);
    }
    result
}
