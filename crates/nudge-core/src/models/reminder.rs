//! Reminder model

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{CompletionHistory, ListId, RecurrenceChange, RecurrenceRule, ReminderId, TagId};
use crate::due::DueDateFields;
use crate::error::{Error, Result};

const MAX_TITLE_LEN: usize = 500;

/// Reminder priority, ordered from none to high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    pub const fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

/// The sync endpoint sends the ordinal while edit responses send the
/// enum name; both decode to the same value.
#[derive(Deserialize)]
#[serde(untagged)]
enum PriorityRepr {
    Ordinal(u8),
    Name(String),
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match PriorityRepr::deserialize(deserializer)? {
            PriorityRepr::Ordinal(value) => Self::from_ordinal(value).ok_or_else(|| {
                serde::de::Error::custom(format!("priority out of range: {value}"))
            }),
            PriorityRepr::Name(name) => Self::from_name(&name)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown priority '{name}'"))),
        }
    }
}

/// A reminder as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Unique identifier
    pub id: ReminderId,
    /// Owning list
    pub list_id: ListId,
    /// Parent reminder for sub-tasks
    #[serde(default)]
    pub parent_id: Option<ReminderId>,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    /// Set when `completed` flips from false to true
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub flagged: bool,
    /// Stored due instant; `None` when no due date is set
    #[serde(default)]
    pub utc_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_floating: bool,
    #[serde(default)]
    pub is_date_only: bool,
    #[serde(default)]
    pub url: Option<String>,
    /// Position among siblings with the same list and parent
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default, alias = "recurrence")]
    pub recurrence_rule: Option<RecurrenceRule>,
    pub updated_at: DateTime<Utc>,
}

/// Side effects of applying a [`ReminderPatch`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    /// History row for a recurring reminder that was just completed
    pub history: Option<CompletionHistory>,
    /// What happened to the recurrence rule
    pub recurrence: RecurrenceChange,
    /// Whether a due date went from unset to set
    pub due_date_newly_set: bool,
}

impl Reminder {
    /// Interpretation flags currently stored on the reminder.
    pub fn due_fields(&self) -> DueDateFields {
        DueDateFields::resolve(
            self.timezone.as_deref(),
            Some(self.is_floating),
            Some(self.is_date_only),
            None,
        )
    }

    pub const fn is_recurring(&self) -> bool {
        self.recurrence_rule.is_some()
    }

    /// Apply a partial update.
    ///
    /// Omitted fields are untouched. Timezone and floating/date-only flags
    /// omitted from the patch keep their stored values when the due date is
    /// recomputed. A rejected patch leaves the reminder untouched.
    pub fn apply_patch(&mut self, patch: &ReminderPatch, now: DateTime<Utc>) -> Result<PatchOutcome> {
        let mut next = self.clone();
        let outcome = next.apply_patch_in_place(patch, now)?;
        *self = next;
        Ok(outcome)
    }

    fn apply_patch_in_place(
        &mut self,
        patch: &ReminderPatch,
        now: DateTime<Utc>,
    ) -> Result<PatchOutcome> {
        let recurrence =
            RecurrenceChange::from_flags(patch.is_recurring, patch.rrule_string.as_deref())?;

        let mut outcome = PatchOutcome::default();

        if let Some(title) = &patch.title {
            self.title = validate_title(title)?;
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(parent_id) = &patch.parent_id {
            if parent_id.as_ref() == Some(&self.id) {
                return Err(Error::InvalidInput(
                    "a reminder cannot be its own parent".to_string(),
                ));
            }
            self.parent_id.clone_from(parent_id);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(flagged) = patch.flagged {
            self.flagged = flagged;
        }
        if let Some(url) = &patch.url {
            self.url = crate::util::normalize_text_option(Some(url.clone()));
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(tag_ids) = &patch.tag_ids {
            self.tag_ids.clone_from(tag_ids);
        }

        let had_due_date = self.utc_datetime.is_some();
        let fields = DueDateFields::resolve(
            patch.timezone.as_deref(),
            patch.is_floating,
            patch.is_date_only,
            Some(&self.due_fields()),
        );
        match &patch.due_date {
            Some(Some(input)) => {
                self.utc_datetime = Some(fields.normalize(input)?);
            }
            Some(None) => self.utc_datetime = None,
            None => {}
        }
        if patch.timezone.is_some() || patch.due_date.is_some() {
            self.timezone = Some(fields.timezone);
        }
        self.is_floating = fields.is_floating;
        self.is_date_only = fields.is_date_only;
        outcome.due_date_newly_set = !had_due_date && self.utc_datetime.is_some();

        if let Some(completed) = patch.completed {
            if completed && !self.completed {
                self.completed_at = Some(now);
                if self.is_recurring() {
                    outcome.history = Some(CompletionHistory::record(self.id.clone(), now));
                }
            } else if !completed {
                self.completed_at = None;
            }
            self.completed = completed;
        }

        recurrence.apply(&mut self.recurrence_rule);
        outcome.recurrence = recurrence;
        self.updated_at = now;
        Ok(outcome)
    }
}

/// Offline projection of a reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedReminder {
    pub id: ReminderId,
    pub list_id: ListId,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub utc_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_floating: bool,
    #[serde(default)]
    pub is_date_only: bool,
    pub updated_at: DateTime<Utc>,
}

impl CachedReminder {
    pub fn due_fields(&self) -> DueDateFields {
        DueDateFields::resolve(
            self.timezone.as_deref(),
            Some(self.is_floating),
            Some(self.is_date_only),
            None,
        )
    }
}

impl From<&Reminder> for CachedReminder {
    fn from(reminder: &Reminder) -> Self {
        Self {
            id: reminder.id.clone(),
            list_id: reminder.list_id.clone(),
            title: reminder.title.clone(),
            notes: reminder.notes.clone(),
            completed: reminder.completed,
            priority: reminder.priority,
            utc_datetime: reminder.utc_datetime,
            timezone: reminder.timezone.clone(),
            is_floating: reminder.is_floating,
            is_date_only: reminder.is_date_only,
            updated_at: reminder.updated_at,
        }
    }
}

/// Payload for creating a reminder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    pub title: String,
    pub list_id: ListId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ReminderId>,
    pub priority: Priority,
    pub flagged: bool,
    /// Wall-clock input, normalized by the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub is_floating: bool,
    pub is_date_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrule_string: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<TagId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl NewReminder {
    pub fn new(list_id: ListId, title: impl Into<String>) -> Self {
        Self {
            list_id,
            title: title.into(),
            ..Self::default()
        }
    }

    /// Validate and trim the payload.
    pub fn validated(mut self) -> Result<Self> {
        self.title = validate_title(&self.title)?;
        if self.is_recurring {
            if let Some(rule) = &self.rrule_string {
                RecurrenceRule::parse(rule)?;
            }
        }
        Ok(self)
    }

    /// Due-date flags this payload carries.
    pub fn due_fields(&self) -> DueDateFields {
        DueDateFields::resolve(
            self.timezone.as_deref(),
            Some(self.is_floating),
            Some(self.is_date_only),
            None,
        )
    }

    /// Local stand-in shown until the server confirms the create.
    pub fn to_placeholder(&self, id: ReminderId, now: DateTime<Utc>) -> Reminder {
        let fields = self.due_fields();
        let utc_datetime = self
            .due_date
            .as_deref()
            .and_then(|input| fields.normalize(input).ok());
        let recurrence_rule = if self.is_recurring {
            self.rrule_string
                .as_deref()
                .and_then(|rule| RecurrenceRule::parse(rule).ok())
        } else {
            None
        };

        Reminder {
            id,
            list_id: self.list_id.clone(),
            parent_id: self.parent_id.clone(),
            title: self.title.clone(),
            notes: self.notes.clone(),
            completed: false,
            completed_at: None,
            priority: self.priority,
            flagged: self.flagged,
            utc_datetime,
            timezone: self.due_date.as_ref().map(|_| fields.timezone.clone()),
            is_floating: self.is_floating,
            is_date_only: self.is_date_only,
            url: self.url.clone(),
            sort_order: self.sort_order.unwrap_or_default(),
            tag_ids: self.tag_ids.clone(),
            recurrence_rule,
            updated_at: now,
        }
    }
}

/// Partial reminder edit.
///
/// Fields with a nested `Option` distinguish "leave alone" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub parent_id: Option<Option<ReminderId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub due_date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_floating: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_date_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrule_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<TagId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl ReminderPatch {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Check that re-parenting `child` under `parent` keeps the sub-task tree
/// acyclic and within one list.
pub fn validate_parent(
    reminders: &[Reminder],
    child: &ReminderId,
    child_list: &ListId,
    parent: &ReminderId,
) -> Result<()> {
    if child == parent {
        return Err(Error::InvalidInput(
            "a reminder cannot be its own parent".to_string(),
        ));
    }

    let by_id: HashMap<&ReminderId, &Reminder> =
        reminders.iter().map(|reminder| (&reminder.id, reminder)).collect();

    let parent_reminder = by_id
        .get(parent)
        .ok_or_else(|| Error::NotFound(format!("parent reminder {parent}")))?;
    if &parent_reminder.list_id != child_list {
        return Err(Error::InvalidInput(
            "parent reminder belongs to a different list".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut cursor = Some(parent);
    while let Some(current) = cursor {
        if current == child {
            return Err(Error::InvalidInput(format!(
                "moving {child} under {parent} would create a cycle"
            )));
        }
        if !seen.insert(current) {
            break;
        }
        cursor = by_id
            .get(current)
            .and_then(|reminder| reminder.parent_id.as_ref());
    }
    Ok(())
}

/// Next `sortOrder` for a new reminder among its siblings.
pub fn next_sort_order(
    reminders: &[Reminder],
    list_id: &ListId,
    parent_id: Option<&ReminderId>,
) -> i64 {
    super::next_position(
        reminders
            .iter()
            .filter(|r| &r.list_id == list_id && r.parent_id.as_ref() == parent_id)
            .map(|r| r.sort_order),
    )
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("reminder title is required".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(Error::InvalidInput(format!(
            "reminder title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
