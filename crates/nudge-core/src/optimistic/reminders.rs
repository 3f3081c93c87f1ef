//! Optimistic reminder view

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;

use super::{MutationError, MutationKind, PlaceholderIds, UndoKind, UndoSlot, UndoToken};
use crate::api::{NotificationRegistrar, ReminderApi};
use crate::error::{Error, Result};
use crate::models::{
    next_sort_order, validate_parent, NewReminder, Reminder, ReminderId, ReminderPatch, ShareRole,
};

/// Inline title edit in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditingState {
    pub reminder_id: ReminderId,
    pub draft: String,
}

#[derive(Debug, Default)]
struct ViewState {
    reminders: Vec<Reminder>,
    editing: Option<EditingState>,
}

impl ViewState {
    fn position(&self, id: &ReminderId) -> Option<usize> {
        self.reminders.iter().position(|reminder| &reminder.id == id)
    }

    fn find(&self, id: &ReminderId) -> Result<&Reminder> {
        self.reminders
            .iter()
            .find(|reminder| &reminder.id == id)
            .ok_or_else(|| Error::NotFound(format!("reminder {id}")))
    }

    fn find_mut(&mut self, id: &ReminderId) -> Result<&mut Reminder> {
        self.reminders
            .iter_mut()
            .find(|reminder| &reminder.id == id)
            .ok_or_else(|| Error::NotFound(format!("reminder {id}")))
    }

    /// Put the server's record where `local_id` sits, or append it.
    fn replace(&mut self, local_id: &ReminderId, server: Reminder) {
        match self.position(local_id) {
            Some(index) => self.reminders[index] = server,
            None => self.reminders.push(server),
        }
    }
}

/// In-memory reminders of one list, mutated optimistically.
///
/// The view lock is a `std::sync::Mutex` and is never held across a
/// request. Overlapping mutations each restore their own snapshot on
/// failure, so a late failure can undo a concurrent success.
pub struct OptimisticReminders<A> {
    api: A,
    view: Mutex<ViewState>,
    ids: PlaceholderIds,
    undo: UndoSlot,
    registrar: Option<Arc<dyn NotificationRegistrar>>,
    role: ShareRole,
}

impl<A: ReminderApi> OptimisticReminders<A> {
    pub fn new(api: A, undo_window: Duration) -> Self {
        Self {
            api,
            view: Mutex::new(ViewState::default()),
            ids: PlaceholderIds::new(),
            undo: UndoSlot::new(undo_window),
            registrar: None,
            role: ShareRole::Admin,
        }
    }

    /// Register this device for notifications before the first due date is set.
    #[must_use]
    pub fn with_registrar(mut self, registrar: Arc<dyn NotificationRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// Role held on the list; viewers may not mutate.
    #[must_use]
    pub fn with_role(mut self, role: ShareRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_placeholder_ids(mut self, ids: PlaceholderIds) -> Self {
        self.ids = ids;
        self
    }

    pub const fn undo_slot(&self) -> &UndoSlot {
        &self.undo
    }

    pub const fn can_edit(&self) -> bool {
        self.role.can_write()
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole view, e.g. after a fresh fetch.
    pub fn replace_all(&self, reminders: Vec<Reminder>) {
        let mut view = self.lock();
        view.reminders = reminders;
        view.editing = None;
    }

    pub fn snapshot(&self) -> Vec<Reminder> {
        self.lock().reminders.clone()
    }

    pub fn get(&self, id: &ReminderId) -> Option<Reminder> {
        self.lock().find(id).ok().cloned()
    }

    pub fn editing(&self) -> Option<EditingState> {
        self.lock().editing.clone()
    }

    /// Snapshot the view and apply `change` to it.
    ///
    /// A failed `change` leaves the view as it was.
    fn stage<T>(
        &self,
        action: MutationKind,
        change: impl FnOnce(&mut ViewState) -> Result<T>,
    ) -> std::result::Result<(Vec<Reminder>, T), MutationError> {
        if !self.can_edit() {
            return Err(MutationError::new(
                action,
                Error::InvalidInput(format!("{} role cannot modify reminders", self.role)),
            ));
        }

        let mut view = self.lock();
        let snapshot = view.reminders.clone();
        match change(&mut view) {
            Ok(value) => Ok((snapshot, value)),
            Err(source) => {
                view.reminders = snapshot;
                Err(MutationError::new(action, source))
            }
        }
    }

    fn rollback(&self, action: MutationKind, snapshot: Vec<Reminder>, source: Error) -> MutationError {
        tracing::warn!("Rolling back {action}: {source}");
        let mut view = self.lock();
        view.reminders = snapshot;
        view.editing = None;
        MutationError::new(action, source)
    }

    fn settle(&self, local_id: &ReminderId, server: &Reminder) {
        self.lock().replace(local_id, server.clone());
    }

    /// Flip a reminder's completion and arm an undo token for it.
    pub async fn toggle_complete(
        &self,
        id: &ReminderId,
    ) -> std::result::Result<(Reminder, UndoToken), MutationError> {
        let previous_completed = self
            .lock()
            .find(id)
            .map(|reminder| reminder.completed)
            .map_err(|source| MutationError::new(MutationKind::ToggleComplete, source))?;

        let reminder = self
            .set_completed(id, !previous_completed, MutationKind::ToggleComplete)
            .await?;
        let token = self
            .undo
            .queue(UndoKind::Complete { previous_completed }, id.clone());
        Ok((reminder, token))
    }

    async fn set_completed(
        &self,
        id: &ReminderId,
        completed: bool,
        action: MutationKind,
    ) -> std::result::Result<Reminder, MutationError> {
        let patch = ReminderPatch::completion(completed);
        let (snapshot, ()) = self.stage(action, |view| {
            view.find_mut(id)?.apply_patch(&patch, Utc::now()).map(|_| ())
        })?;

        match self.api.update_reminder(id, &patch).await {
            Ok(server) => {
                self.settle(id, &server);
                Ok(server)
            }
            Err(source) => Err(self.rollback(action, snapshot, source)),
        }
    }

    /// Start editing a reminder's title inline.
    pub fn begin_edit(&self, id: &ReminderId) -> Result<()> {
        let mut view = self.lock();
        let draft = view.find(id)?.title.clone();
        view.editing = Some(EditingState {
            reminder_id: id.clone(),
            draft,
        });
        Ok(())
    }

    pub fn update_draft(&self, draft: impl Into<String>) {
        if let Some(editing) = self.lock().editing.as_mut() {
            editing.draft = draft.into();
        }
    }

    pub fn cancel_edit(&self) {
        self.lock().editing = None;
    }

    /// Send the drafted title.
    ///
    /// An empty or unchanged draft just ends the edit and returns `None`.
    pub async fn commit_edit(&self) -> std::result::Result<Option<Reminder>, MutationError> {
        let action = MutationKind::EditTitle;
        let Some(editing) = self.editing() else {
            return Ok(None);
        };
        let title = editing.draft.trim().to_string();
        let unchanged = self
            .lock()
            .find(&editing.reminder_id)
            .map_or(true, |reminder| reminder.title == title);
        if title.is_empty() || unchanged {
            self.cancel_edit();
            return Ok(None);
        }

        let id = editing.reminder_id;
        let patch = ReminderPatch::title(title);
        let (snapshot, ()) = self
            .stage(action, |view| {
                view.find_mut(&id)?.apply_patch(&patch, Utc::now()).map(|_| ())
            })
            .inspect_err(|_| self.cancel_edit())?;

        match self.api.update_reminder(&id, &patch).await {
            Ok(server) => {
                let mut view = self.lock();
                view.replace(&id, server.clone());
                view.editing = None;
                Ok(Some(server))
            }
            Err(source) => Err(self.rollback(action, snapshot, source)),
        }
    }

    /// Create a reminder, showing a placeholder until the server answers.
    pub async fn create(&self, input: NewReminder) -> std::result::Result<Reminder, MutationError> {
        let action = MutationKind::CreateReminder;
        let mut input = input
            .validated()
            .map_err(|source| MutationError::new(action, source))?;
        let placeholder_id = ReminderId::from(self.ids.next_raw());

        let (snapshot, ()) = self.stage(action, |view| {
            if let Some(parent) = &input.parent_id {
                validate_parent(&view.reminders, &placeholder_id, &input.list_id, parent)?;
            }
            if input.sort_order.is_none() {
                input.sort_order = Some(next_sort_order(
                    &view.reminders,
                    &input.list_id,
                    input.parent_id.as_ref(),
                ));
            }
            let placeholder = input.to_placeholder(placeholder_id.clone(), Utc::now());
            view.reminders.push(placeholder);
            Ok(())
        })?;

        if input.due_date.is_some() {
            self.ensure_notifications().await;
        }

        match self.api.create_reminder(&input).await {
            Ok(server) => {
                self.settle(&placeholder_id, &server);
                tracing::debug!("Replaced placeholder {placeholder_id} with {}", server.id);
                Ok(server)
            }
            Err(source) => Err(self.rollback(action, snapshot, source)),
        }
    }

    /// Apply a full edit from the reminder editor.
    pub async fn save(
        &self,
        id: &ReminderId,
        patch: &ReminderPatch,
    ) -> std::result::Result<Reminder, MutationError> {
        let action = MutationKind::SaveReminder;
        let (snapshot, outcome) = self.stage(action, |view| {
            if let Some(Some(parent)) = &patch.parent_id {
                let list_id = view.find(id)?.list_id.clone();
                validate_parent(&view.reminders, id, &list_id, parent)?;
            }
            view.find_mut(id)?.apply_patch(patch, Utc::now())
        })?;

        if outcome.due_date_newly_set {
            self.ensure_notifications().await;
        }

        match self.api.update_reminder(id, patch).await {
            Ok(server) => {
                self.settle(id, &server);
                Ok(server)
            }
            Err(source) => Err(self.rollback(action, snapshot, source)),
        }
    }

    /// Soft-delete a reminder and arm an undo token for it.
    pub async fn delete(&self, id: &ReminderId) -> std::result::Result<UndoToken, MutationError> {
        let action = MutationKind::DeleteReminder;
        let (snapshot, _) = self.stage(action, |view| {
            let index = view
                .position(id)
                .ok_or_else(|| Error::NotFound(format!("reminder {id}")))?;
            Ok(view.reminders.remove(index))
        })?;

        match self.api.delete_reminder(id).await {
            Ok(()) => Ok(self.undo.queue(UndoKind::Delete, id.clone())),
            Err(source) => Err(self.rollback(action, snapshot, source)),
        }
    }

    /// Restore a soft-deleted reminder, putting it back at the front of
    /// the view if it's missing.
    pub async fn restore(&self, id: &ReminderId) -> std::result::Result<Reminder, MutationError> {
        let action = MutationKind::RestoreReminder;
        let (snapshot, ()) = self.stage(action, |_| Ok(()))?;

        match self.api.restore_reminder(id).await {
            Ok(server) => {
                let mut view = self.lock();
                match view.position(id) {
                    Some(index) => view.reminders[index] = server.clone(),
                    None => view.reminders.insert(0, server.clone()),
                }
                Ok(server)
            }
            Err(source) => Err(self.rollback(action, snapshot, source)),
        }
    }

    /// Reverse the action behind `token_id` if it is still armed.
    ///
    /// Returns `None` when the token already expired or was superseded.
    pub async fn undo(&self, token_id: &str) -> std::result::Result<Option<Reminder>, MutationError> {
        let Some(token) = self.undo.take(token_id) else {
            tracing::debug!("Undo token {token_id} is no longer armed");
            return Ok(None);
        };

        let reversed = match token.kind {
            UndoKind::Complete { previous_completed } => {
                self.set_completed(&token.reminder_id, previous_completed, MutationKind::ToggleComplete)
                    .await
            }
            UndoKind::Delete => self.restore(&token.reminder_id).await,
        };
        self.undo.finish(&token.id, reversed.is_ok());
        reversed.map(Some)
    }

    async fn ensure_notifications(&self) {
        let Some(registrar) = &self.registrar else {
            return;
        };
        if let Err(e) = registrar.ensure_registered().await {
            tracing::warn!("Notification registration failed: {e}");
        }
    }
}
