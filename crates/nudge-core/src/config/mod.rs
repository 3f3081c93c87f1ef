//! Client configuration.
//!
//! A `ClientConfig` is read from an optional JSON file and then overridden
//! field by field from `NUDGE_*` environment variables. Frontends decide
//! where the file lives and what the default database path is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::sync::engine::{SyncSettings, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SYNC_INTERVAL};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

const ENV_API_BASE_URL: &str = "NUDGE_API_BASE_URL";
const ENV_SESSION_TOKEN: &str = "NUDGE_SESSION_TOKEN";
const ENV_SYNC_INTERVAL: &str = "NUDGE_SYNC_INTERVAL_SECS";
const ENV_REQUEST_TIMEOUT: &str = "NUDGE_REQUEST_TIMEOUT_SECS";
const ENV_SYNC_ENABLED: &str = "NUDGE_SYNC_ENABLED";
const ENV_DB_PATH: &str = "NUDGE_DB_PATH";
const ENV_PUSH_PLAYER_ID: &str = "NUDGE_PUSH_PLAYER_ID";

/// Settings shared by every frontend.
///
/// The session token is a credential; it is never printed by `Debug`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub session_token: Option<String>,
    pub sync_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub sync_enabled: bool,
    pub db_path: Option<PathBuf>,
    pub push_player_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_token: None,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            sync_enabled: true,
            db_path: None,
            push_player_id: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("sync_enabled", &self.sync_enabled)
            .field("db_path", &self.db_path)
            .field("push_player_id", &self.push_player_id)
            .finish()
    }
}

impl ClientConfig {
    /// Load from `path` (when it exists) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Override fields from `NUDGE_*` variables provided by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| normalize_text_option(lookup(key));

        if let Some(url) = var(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(token) = var(ENV_SESSION_TOKEN) {
            self.session_token = Some(token);
        }
        if let Some(raw) = var(ENV_SYNC_INTERVAL) {
            self.sync_interval_secs = parse_seconds(ENV_SYNC_INTERVAL, &raw)?;
        }
        if let Some(raw) = var(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = parse_seconds(ENV_REQUEST_TIMEOUT, &raw)?;
        }
        if let Some(raw) = var(ENV_SYNC_ENABLED) {
            self.sync_enabled = parse_flag(ENV_SYNC_ENABLED, &raw)?;
        }
        if let Some(path) = var(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(player_id) = var(ENV_PUSH_PLAYER_ID) {
            self.push_player_id = Some(player_id);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !is_http_url(self.api_base_url.trim()) {
            return Err(Error::InvalidInput(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
        if self.sync_interval_secs == 0 {
            return Err(Error::InvalidInput(
                "sync_interval_secs must be positive".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            enabled: self.sync_enabled,
            interval: Duration::from_secs(self.sync_interval_secs),
            request_timeout: self.request_timeout(),
        }
    }

    /// HTTP client for the configured server.
    pub fn api_client(&self) -> Result<ApiClient> {
        ApiClient::new(
            self.api_base_url.clone(),
            self.session_token.clone(),
            self.request_timeout(),
        )
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("{key} must be a whole number of seconds")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!("{key} must be true or false"))),
    }
}
