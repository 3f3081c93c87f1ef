//! Nudge CLI - offline-first reminders from the terminal
//!
//! Reads from the local cache and keeps it in sync with the server.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::load_config;
use crate::commands::completions::run_completions;
use crate::commands::due::run_due;
use crate::commands::lists::run_lists;
use crate::commands::reminders::{run_reminders, ReminderQuery};
use crate::commands::status::run_status;
use crate::commands::sync::{run_sync, run_watch};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Due {
            input,
            timezone,
            floating,
            date_only,
        } => run_due(&input, &timezone, floating, date_only)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        command => {
            let config = load_config(cli.config.as_deref(), cli.db_path)?;
            match command {
                Commands::Sync => run_sync(&config).await?,
                Commands::Watch => run_watch(&config).await?,
                Commands::Lists { json } => run_lists(&config, json).await?,
                Commands::Reminders {
                    list,
                    smart,
                    timezone,
                    all,
                    json,
                } => {
                    let query = ReminderQuery {
                        list: list.as_deref(),
                        smart: smart.as_deref(),
                        timezone: &timezone,
                        show_all_completed: all,
                        as_json: json,
                    };
                    run_reminders(&config, &query).await?;
                }
                Commands::Status { json } => run_status(&config, json).await?,
                Commands::Due { .. } | Commands::Completions { .. } => {}
            }
        }
    }

    Ok(())
}
