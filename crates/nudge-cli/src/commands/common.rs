use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use nudge_core::api::ApiClient;
use nudge_core::config::ClientConfig;
use nudge_core::due::{display_clock, parse_zone};
use nudge_core::models::{CachedReminder, Priority};
use nudge_core::services::LocalStore;
use nudge_core::state::{SyncState, SyncStatus};
use nudge_core::sync::SyncEngine;
use nudge_core::util::format_timestamp;

use crate::error::CliError;

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nudge").join("config.json"))
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("nudge").join("nudge.db"))
        .ok_or(CliError::NoDataDir)
}

/// Config file (explicit or default location) plus `NUDGE_*` overrides,
/// with `--db-path` taking precedence over both.
pub fn load_config(
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<ClientConfig, CliError> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .or_else(default_config_path);
    let mut config = ClientConfig::load(config_path.as_deref())?;
    if db_path.is_some() {
        config.db_path = db_path;
    }
    Ok(config)
}

pub fn resolve_db_path(config: &ClientConfig) -> Result<PathBuf, CliError> {
    match &config.db_path {
        Some(path) => Ok(path.clone()),
        None => default_db_path(),
    }
}

pub fn open_store(config: &ClientConfig) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(resolve_db_path(config)?)?)
}

pub fn build_engine(config: &ClientConfig) -> Result<SyncEngine<ApiClient>, CliError> {
    let store = open_store(config)?;
    let client = config.api_client()?;
    tracing::debug!("Syncing against {}", client.base_url());
    Ok(SyncEngine::new(client, store, config.sync_settings()))
}

pub fn parse_viewer_zone(name: &str) -> Result<Tz, CliError> {
    Ok(parse_zone(name)?)
}

pub fn format_optional_timestamp(value: Option<&DateTime<Utc>>) -> String {
    value.map_or_else(|| "never".to_string(), format_timestamp)
}

pub const fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::None => "",
        Priority::Low => "!",
        Priority::Medium => "!!",
        Priority::High => "!!!",
    }
}

/// Due date as the viewer reads it.
pub fn format_due(reminder: &CachedReminder, viewer: Tz) -> Option<String> {
    let stored = reminder.utc_datetime?;
    let fields = reminder.due_fields();
    let clock = display_clock(stored, &fields, viewer);
    let mut text = if fields.is_date_only {
        clock.format("%Y-%m-%d").to_string()
    } else {
        clock.format("%Y-%m-%d %H:%M").to_string()
    };
    if fields.is_floating {
        text.push_str(" (floating)");
    }
    Some(text)
}

pub fn format_reminder_lines(reminders: &[CachedReminder], viewer: Tz) -> Vec<String> {
    reminders
        .iter()
        .map(|reminder| {
            let check = if reminder.completed { "[x]" } else { "[ ]" };
            let mut line = format!("{check} {}", reminder.title);
            let marker = priority_marker(reminder.priority);
            if !marker.is_empty() {
                line.push(' ');
                line.push_str(marker);
            }
            if let Some(due) = format_due(reminder, viewer) {
                line.push_str(&format!("  due {due}"));
            }
            line.push_str(&format!("  ({})", reminder.id));
            line
        })
        .collect()
}

pub fn format_status(status: &SyncStatus) -> String {
    let last = format_optional_timestamp(status.last_synced_at.as_ref());
    match status.state {
        SyncState::Error => format!(
            "{}: {} ({} consecutive failures, last synced {last})",
            status.state.label(),
            status.last_error.as_deref().unwrap_or("unknown error"),
            status.consecutive_failures
        ),
        state => format!("{} (last synced {last})", state.label()),
    }
}
