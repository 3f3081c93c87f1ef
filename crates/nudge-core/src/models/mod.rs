//! Data models for Nudge

mod ids;
mod list;
mod preferences;
mod recurrence;
mod reminder;
mod share;
mod sync_meta;
mod tag;

pub use ids::{ListId, ReminderId, TagId, UserId, PLACEHOLDER_PREFIX};
pub use list::{next_position, CachedList, List, ListPatch, NewList};
pub use preferences::{
    CompletedPosition, CompletedVisibility, PreferencesPatch, UserPreferences,
    MAX_UNDO_TIMEOUT_SECONDS, MIN_UNDO_TIMEOUT_SECONDS,
};
pub use recurrence::{CompletionHistory, RecurrenceChange, RecurrenceRule};
pub use reminder::{
    next_sort_order, validate_parent, CachedReminder, NewReminder, PatchOutcome, Priority,
    Reminder, ReminderPatch,
};
pub use share::{resolve_access, ListShare, ShareRole, ShareSet};
pub use sync_meta::{EntityType, SyncCheckpoint};
pub use tag::{get_or_create, NewTag, Tag, DEFAULT_TAG_COLOR};
