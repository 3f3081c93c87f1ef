//! Recurrence rules and completion history

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReminderId;
use crate::error::{Error, Result};

static RRULE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:RRULE:)?FREQ=(?:SECONDLY|MINUTELY|HOURLY|DAILY|WEEKLY|MONTHLY|YEARLY)(?:;[A-Z]+=[A-Za-z0-9,+:\-]+)*$",
    )
    .expect("Invalid regex")
});

/// RRULE-style recurrence attached to a reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub rrule_string: String,
}

impl RecurrenceRule {
    /// Validate and wrap a rule string.
    pub fn parse(rule: &str) -> Result<Self> {
        let rule = rule.trim();
        if !RRULE_PATTERN.is_match(rule) {
            return Err(Error::InvalidInput(format!("invalid recurrence rule '{rule}'")));
        }
        Ok(Self {
            rrule_string: rule.to_string(),
        })
    }
}

/// What an edit does to a reminder's recurrence rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecurrenceChange {
    #[default]
    Unchanged,
    Set(RecurrenceRule),
    Remove,
}

impl RecurrenceChange {
    /// Decide from the `isRecurring` flag and rule string of an edit.
    ///
    /// A rule is only stored when the flag is explicitly set; clearing the
    /// flag removes any rule, and omitting it leaves the rule alone.
    pub fn from_flags(is_recurring: Option<bool>, rrule_string: Option<&str>) -> Result<Self> {
        match (is_recurring, rrule_string) {
            (Some(false), _) => Ok(Self::Remove),
            (Some(true), Some(rule)) if !rule.trim().is_empty() => {
                RecurrenceRule::parse(rule).map(Self::Set)
            }
            _ => Ok(Self::Unchanged),
        }
    }

    /// Apply the change to a reminder's rule slot.
    pub fn apply(&self, slot: &mut Option<RecurrenceRule>) {
        match self {
            Self::Unchanged => {}
            Self::Set(rule) => *slot = Some(rule.clone()),
            Self::Remove => *slot = None,
        }
    }
}

/// Completion of one occurrence of a recurring reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionHistory {
    pub id: String,
    pub reminder_id: ReminderId,
    pub completed_at: DateTime<Utc>,
    pub occurrence_date: DateTime<Utc>,
}

impl CompletionHistory {
    pub fn record(reminder_id: ReminderId, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            reminder_id,
            completed_at,
            occurrence_date: completed_at,
        }
    }
}
