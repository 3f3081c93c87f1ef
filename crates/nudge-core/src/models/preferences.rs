//! Per-user display preferences

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MIN_UNDO_TIMEOUT_SECONDS: u8 = 3;
pub const MAX_UNDO_TIMEOUT_SECONDS: u8 = 10;

/// Where completed reminders go in a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletedPosition {
    #[default]
    MoveToBottom,
    KeepInPlace,
}

/// Which completed reminders stay visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletedVisibility {
    ShowAll,
    /// Only those completed on the viewer's current day
    #[default]
    ShowTodayOnly,
    Hide,
}

/// User preferences as stored by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub completed_position: CompletedPosition,
    pub completed_visibility: CompletedVisibility,
    pub undo_timeout_seconds: u8,
    pub confirm_before_delete: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            completed_position: CompletedPosition::default(),
            completed_visibility: CompletedVisibility::default(),
            undo_timeout_seconds: 5,
            confirm_before_delete: true,
        }
    }
}

impl UserPreferences {
    /// Length of the undo window.
    pub fn undo_timeout(&self) -> Duration {
        let seconds = self
            .undo_timeout_seconds
            .clamp(MIN_UNDO_TIMEOUT_SECONDS, MAX_UNDO_TIMEOUT_SECONDS);
        Duration::from_secs(u64::from(seconds))
    }

    /// Create-or-update: missing preferences start from the defaults.
    pub fn upsert(existing: Option<Self>, patch: &PreferencesPatch) -> Result<Self> {
        patch.validate()?;
        let mut prefs = existing.unwrap_or_default();
        if let Some(position) = patch.completed_position {
            prefs.completed_position = position;
        }
        if let Some(visibility) = patch.completed_visibility {
            prefs.completed_visibility = visibility;
        }
        if let Some(seconds) = patch.undo_timeout_seconds {
            prefs.undo_timeout_seconds = seconds;
        }
        if let Some(confirm) = patch.confirm_before_delete {
            prefs.confirm_before_delete = confirm;
        }
        Ok(prefs)
    }
}

/// Partial preferences edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_position: Option<CompletedPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_visibility: Option<CompletedVisibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_timeout_seconds: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_before_delete: Option<bool>,
}

impl PreferencesPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(seconds) = self.undo_timeout_seconds {
            if !(MIN_UNDO_TIMEOUT_SECONDS..=MAX_UNDO_TIMEOUT_SECONDS).contains(&seconds) {
                return Err(Error::InvalidInput(format!(
                    "undo timeout must be between {MIN_UNDO_TIMEOUT_SECONDS} and {MAX_UNDO_TIMEOUT_SECONDS} seconds"
                )));
            }
        }
        Ok(())
    }
}
