use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] nudge_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Could not resolve a data directory; pass --db-path")]
    NoDataDir,
    #[error("Session expired. Set NUDGE_SESSION_TOKEN to a fresh session token.")]
    Unauthorized,
    #[error("Sync is disabled. Set NUDGE_SYNC_ENABLED=true or sync_enabled in the config file.")]
    SyncDisabled,
    #[error("Sync skipped: {0}")]
    SyncSkipped(String),
    #[error("Sync failed: {0}")]
    SyncFailed(nudge_core::Error),
}
