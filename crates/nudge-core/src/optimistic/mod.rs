//! Optimistic mutation layer
//!
//! Every mutation follows the same contract: snapshot the in-memory view,
//! apply the change locally, send the request, then either replace the
//! optimistic record with the server's or restore the snapshot exactly.

mod lists;
mod reminders;
mod undo;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use uuid::Uuid;

use crate::error::Error;
use crate::models::PLACEHOLDER_PREFIX;

pub use lists::OptimisticLists;
pub use reminders::{EditingState, OptimisticReminders};
pub use undo::{UndoKind, UndoSlot, UndoState, UndoToken};

/// The action a [`MutationError`] rolled back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ToggleComplete,
    EditTitle,
    CreateReminder,
    SaveReminder,
    DeleteReminder,
    RestoreReminder,
    CreateList,
    EditList,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ToggleComplete => "update reminder",
            Self::EditTitle => "rename reminder",
            Self::CreateReminder => "create reminder",
            Self::SaveReminder => "save reminder",
            Self::DeleteReminder => "delete reminder",
            Self::RestoreReminder => "restore reminder",
            Self::CreateList => "create list",
            Self::EditList => "update list",
        };
        f.write_str(label)
    }
}

/// A mutation failed and its optimistic change was rolled back
#[derive(Debug, Error)]
#[error("Failed to {action}: {source}")]
pub struct MutationError {
    pub action: MutationKind,
    #[source]
    pub source: Error,
}

impl MutationError {
    pub const fn new(action: MutationKind, source: Error) -> Self {
        Self { action, source }
    }
}

/// Generator of `temp-<session>-<n>` ids for optimistic creates.
///
/// Server ids never carry the `temp-` prefix, so a placeholder can't
/// collide with a real record.
#[derive(Debug)]
pub struct PlaceholderIds {
    session: String,
    counter: AtomicU64,
}

impl PlaceholderIds {
    pub fn new() -> Self {
        let raw = Uuid::now_v7().simple().to_string();
        // The leading hex digits are a timestamp; the tail is random
        Self::with_session(&raw[raw.len() - 12..])
    }

    pub fn with_session(session: &str) -> Self {
        Self {
            session: session.to_string(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn next_raw(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{PLACEHOLDER_PREFIX}{}-{n}", self.session)
    }
}

impl Default for PlaceholderIds {
    fn default() -> Self {
        Self::new()
    }
}
