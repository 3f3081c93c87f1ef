//! Server API: the mutation seams used by the optimistic layer and the
//! reqwest-backed client that implements them.

mod client;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{List, ListId, ListPatch, NewList, NewReminder, Reminder, ReminderId, ReminderPatch};

pub use client::{ApiClient, DeviceRegistrar};

/// Reminder mutations
#[async_trait]
pub trait ReminderApi: Send + Sync {
    /// `POST /api/lists/{listId}/reminders`
    async fn create_reminder(&self, input: &NewReminder) -> Result<Reminder>;

    /// `PATCH /api/reminders/{id}`
    async fn update_reminder(&self, id: &ReminderId, patch: &ReminderPatch) -> Result<Reminder>;

    /// `DELETE /api/reminders/{id}` (soft delete)
    async fn delete_reminder(&self, id: &ReminderId) -> Result<()>;

    /// `PATCH /api/reminders/{id}/restore`
    async fn restore_reminder(&self, id: &ReminderId) -> Result<Reminder>;
}

/// List mutations
#[async_trait]
pub trait ListApi: Send + Sync {
    /// `POST /api/lists`
    async fn create_list(&self, input: &NewList) -> Result<List>;

    /// `PATCH /api/lists/{id}`
    async fn update_list(&self, id: &ListId, patch: &ListPatch) -> Result<List>;
}

/// Push-notification device registration
#[async_trait]
pub trait NotificationRegistrar: Send + Sync {
    /// Make sure this device can receive reminder notifications.
    async fn ensure_registered(&self) -> Result<()>;
}
