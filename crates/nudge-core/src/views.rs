//! Display ordering and smart lists
//!
//! These work over both full reminders and their cached projections. The
//! cache carries no `completedAt` or `flagged`, so for cached reminders the
//! last update stands in for the completion time and nothing is flagged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::due::{is_due_on_day, DueDateFields};
use crate::error::{Error, Result};
use crate::models::{
    CachedReminder, CompletedPosition, CompletedVisibility, ListId, Reminder, UserPreferences,
};

/// Fields the views need from a reminder
pub trait ReminderFields {
    fn list_id(&self) -> &ListId;
    fn is_completed(&self) -> bool;
    fn completion_time(&self) -> Option<DateTime<Utc>>;
    fn is_flagged(&self) -> bool;
    fn due(&self) -> Option<(DateTime<Utc>, DueDateFields)>;
    fn has_recurrence(&self) -> bool;
}

impl ReminderFields for Reminder {
    fn list_id(&self) -> &ListId {
        &self.list_id
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn completion_time(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    fn is_flagged(&self) -> bool {
        self.flagged
    }

    fn due(&self) -> Option<(DateTime<Utc>, DueDateFields)> {
        self.utc_datetime.map(|at| (at, self.due_fields()))
    }

    fn has_recurrence(&self) -> bool {
        self.is_recurring()
    }
}

impl ReminderFields for CachedReminder {
    fn list_id(&self) -> &ListId {
        &self.list_id
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn completion_time(&self) -> Option<DateTime<Utc>> {
        self.completed.then_some(self.updated_at)
    }

    fn is_flagged(&self) -> bool {
        false
    }

    fn due(&self) -> Option<(DateTime<Utc>, DueDateFields)> {
        self.utc_datetime.map(|at| (at, self.due_fields()))
    }

    fn has_recurrence(&self) -> bool {
        false
    }
}

fn completed_today<R: ReminderFields>(reminder: &R, viewer: Tz, now: DateTime<Utc>) -> bool {
    let today = now.with_timezone(&viewer).date_naive();
    reminder
        .completion_time()
        .is_some_and(|at| at.with_timezone(&viewer).date_naive() == today)
}

fn due_today<R: ReminderFields>(reminder: &R, viewer: Tz, now: DateTime<Utc>) -> bool {
    reminder
        .due()
        .is_some_and(|(at, fields)| is_due_on_day(at, &fields, viewer, now))
}

/// Apply the user's completed-reminder preferences to a list's reminders.
///
/// Incomplete reminders keep their relative order.
pub fn arrange_for_display<R: ReminderFields + Clone>(
    reminders: &[R],
    prefs: &UserPreferences,
    viewer: Tz,
    now: DateTime<Utc>,
) -> Vec<R> {
    let visible = reminders.iter().filter(|reminder| {
        !reminder.is_completed()
            || match prefs.completed_visibility {
                CompletedVisibility::ShowAll => true,
                CompletedVisibility::ShowTodayOnly => completed_today(*reminder, viewer, now),
                CompletedVisibility::Hide => false,
            }
    });

    match prefs.completed_position {
        CompletedPosition::KeepInPlace => visible.cloned().collect(),
        CompletedPosition::MoveToBottom => {
            let (completed, mut open): (Vec<R>, Vec<R>) =
                visible.cloned().partition(|reminder| reminder.is_completed());
            open.extend(completed);
            open
        }
    }
}

/// Number of incomplete reminders in `list_id`.
pub fn incomplete_count<R: ReminderFields>(list_id: &ListId, reminders: &[R]) -> u32 {
    let count = reminders
        .iter()
        .filter(|reminder| reminder.list_id() == list_id && !reminder.is_completed())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Built-in cross-list views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmartList {
    Today,
    Scheduled,
    All,
    Flagged,
    Completed,
}

impl SmartList {
    pub const ALL: [Self; 5] = [
        Self::Today,
        Self::Scheduled,
        Self::All,
        Self::Flagged,
        Self::Completed,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Scheduled => "scheduled",
            Self::All => "all",
            Self::Flagged => "flagged",
            Self::Completed => "completed",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Scheduled => "Scheduled",
            Self::All => "All",
            Self::Flagged => "Flagged",
            Self::Completed => "Completed",
        }
    }

    /// Whether `reminder` belongs in this view for a viewer in `viewer` at `now`.
    pub fn matches<R: ReminderFields>(self, reminder: &R, viewer: Tz, now: DateTime<Utc>) -> bool {
        match self {
            Self::Completed => reminder.is_completed(),
            _ if reminder.is_completed() => false,
            Self::Today => due_today(reminder, viewer, now),
            Self::Scheduled => reminder.due().is_some() || reminder.has_recurrence(),
            Self::All => true,
            Self::Flagged => reminder.is_flagged(),
        }
    }

    pub fn filter<R: ReminderFields + Clone>(
        self,
        reminders: &[R],
        viewer: Tz,
        now: DateTime<Utc>,
    ) -> Vec<R> {
        reminders
            .iter()
            .filter(|reminder| self.matches(*reminder, viewer, now))
            .cloned()
            .collect()
    }

    pub fn count<R: ReminderFields>(self, reminders: &[R], viewer: Tz, now: DateTime<Utc>) -> usize {
        reminders
            .iter()
            .filter(|reminder| self.matches(*reminder, viewer, now))
            .count()
    }
}

impl fmt::Display for SmartList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SmartList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|list| list.id() == id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown smart list '{s}'")))
    }
}
