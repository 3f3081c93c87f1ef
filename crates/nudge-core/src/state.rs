//! Shared cross-platform state types.

use chrono::{DateTime, Utc};

/// Coarse sync state shown by every client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    Offline,
    Syncing,
    /// Also the state before the first pull: nothing is known to be pending
    #[default]
    Synced,
    Error,
}

impl SyncState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

/// Snapshot published on the engine's status channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Server timestamp of the last successful pull
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl SyncStatus {
    pub(crate) fn syncing(&self) -> Self {
        Self {
            state: SyncState::Syncing,
            ..self.clone()
        }
    }

    pub(crate) fn synced(at: DateTime<Utc>) -> Self {
        Self {
            state: SyncState::Synced,
            last_synced_at: Some(at),
            last_error: None,
            consecutive_failures: 0,
        }
    }

    pub(crate) fn failed(&self, error: &crate::Error) -> Self {
        Self {
            state: SyncState::Error,
            last_synced_at: self.last_synced_at,
            last_error: Some(error.to_string()),
            consecutive_failures: self.consecutive_failures.saturating_add(1),
        }
    }

    pub(crate) fn with_state(&self, state: SyncState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}
