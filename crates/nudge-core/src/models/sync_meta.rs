//! Sync checkpoint bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Entity families tracked by independent checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Lists,
    Reminders,
}

impl EntityType {
    pub const ALL: [Self; 2] = [Self::Lists, Self::Reminders];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lists => "lists",
            Self::Reminders => "reminders",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lists" => Ok(Self::Lists),
            "reminders" => Ok(Self::Reminders),
            other => Err(Error::InvalidInput(format!("unknown entity type '{other}'"))),
        }
    }
}

/// Server timestamp of the last successful pull for an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCheckpoint {
    pub entity_type: EntityType,
    pub last_sync_at: DateTime<Utc>,
}
