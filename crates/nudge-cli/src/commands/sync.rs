use nudge_core::config::ClientConfig;
use nudge_core::sync::{SkipReason, SyncOutcome, SyncReport};
use tokio::sync::mpsc;

use crate::commands::common::{build_engine, format_status};
use crate::error::CliError;

pub async fn run_sync(config: &ClientConfig) -> Result<(), CliError> {
    let engine = build_engine(config)?;
    let report = outcome_to_result(engine.perform_sync().await)?;
    match report {
        Some(report) => println!("{}", format_report(&report)),
        None => println!("A sync is already running"),
    }
    Ok(())
}

pub async fn run_watch(config: &ClientConfig) -> Result<(), CliError> {
    if !config.sync_enabled {
        return Err(CliError::SyncDisabled);
    }

    let engine = build_engine(config)?;
    let mut status = engine.subscribe_status();
    // No host lifecycle in a terminal; the channel only keeps the engine's
    // event branch alive
    let (_events_tx, events) = mpsc::channel(1);

    println!(
        "Syncing every {}s. Press Ctrl-C to stop.",
        config.sync_interval_secs
    );

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {error}");
            std::future::pending::<()>().await;
        }
    };
    let reporter = async {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            println!("{}", format_status(&current));
        }
    };

    tokio::select! {
        () = engine.run(events, shutdown) => {}
        () = reporter => {}
    }
    println!("Stopped");
    Ok(())
}

/// `None` means the pull was folded into one already running.
pub fn outcome_to_result(outcome: SyncOutcome) -> Result<Option<SyncReport>, CliError> {
    match outcome {
        SyncOutcome::Applied(report) => Ok(Some(report)),
        SyncOutcome::Coalesced => Ok(None),
        SyncOutcome::Unauthorized => Err(CliError::Unauthorized),
        SyncOutcome::Failed(error) => Err(CliError::SyncFailed(error)),
        SyncOutcome::Skipped(SkipReason::Disabled) => Err(CliError::SyncDisabled),
        SyncOutcome::Skipped(SkipReason::Offline) => {
            Err(CliError::SyncSkipped("offline".to_string()))
        }
        SyncOutcome::Skipped(SkipReason::Hidden) => {
            Err(CliError::SyncSkipped("not visible".to_string()))
        }
    }
}

pub fn format_report(report: &SyncReport) -> String {
    format!(
        "Sync completed: {} lists, {} reminders applied, {} stale reminders skipped",
        report.lists_written, report.reminders_applied, report.reminders_discarded
    )
}
