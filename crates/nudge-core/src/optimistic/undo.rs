//! Single-slot undo for destructive reminder actions

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::models::ReminderId;

const RESOLVED_HISTORY: usize = 32;

/// What undoing an action must reverse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    Complete { previous_completed: bool },
    Delete,
}

impl UndoKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Complete { .. } => "complete",
            Self::Delete => "delete",
        }
    }
}

/// An undoable action waiting for its window to close
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoToken {
    pub id: String,
    pub kind: UndoKind,
    pub reminder_id: ReminderId,
}

/// Lifecycle of a token; `Armed` is the only non-final state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoState {
    Armed,
    Undone,
    Committed,
}

impl fmt::Display for UndoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Armed => "armed",
            Self::Undone => "undone",
            Self::Committed => "committed",
        };
        f.write_str(label)
    }
}

#[derive(Default)]
struct SlotInner {
    counter: u64,
    pending: Option<UndoToken>,
    timer: Option<JoinHandle<()>>,
    // Claimed for undo; stays armed until the reversal settles
    reversing: Option<UndoToken>,
    resolved: VecDeque<(String, UndoState)>,
}

impl SlotInner {
    fn detach(&mut self) -> Option<UndoToken> {
        let token = self.pending.take()?;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        Some(token)
    }

    fn record(&mut self, token: &UndoToken, state: UndoState) {
        if self.resolved.len() == RESOLVED_HISTORY {
            self.resolved.pop_front();
        }
        self.resolved.push_back((token.id.clone(), state));
        tracing::debug!("Undo token {} {state}", token.id);
    }

    fn resolve(&mut self, state: UndoState) -> Option<UndoToken> {
        let token = self.detach()?;
        self.record(&token, state);
        Some(token)
    }
}

/// Holds at most one armed token.
///
/// Queuing a new token commits the pending one. An armed token commits on
/// its own once the window elapses; the expiry timer only ever commits the
/// token it was started for.
#[derive(Clone)]
pub struct UndoSlot {
    inner: Arc<Mutex<SlotInner>>,
    window: Arc<Mutex<Duration>>,
}

impl UndoSlot {
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotInner::default())),
            window: Arc::new(Mutex::new(window)),
        }
    }

    pub fn window(&self) -> Duration {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the window for tokens queued from now on.
    pub fn set_window(&self, window: Duration) {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner) = window;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm a token for `reminder_id`, committing whatever was pending.
    ///
    /// Must be called from within a tokio runtime.
    pub fn queue(&self, kind: UndoKind, reminder_id: ReminderId) -> UndoToken {
        let window = self.window();
        let mut inner = self.lock();
        inner.resolve(UndoState::Committed);

        inner.counter += 1;
        let token = UndoToken {
            id: format!("{}-{reminder_id}-{}", kind.label(), inner.counter),
            kind,
            reminder_id,
        };
        inner.pending = Some(token.clone());

        let slot = Arc::downgrade(&self.inner);
        let token_id = token.id.clone();
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let Some(slot) = slot.upgrade() else {
                return;
            };
            let mut inner = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.pending.as_ref().is_some_and(|pending| pending.id == token_id) {
                // Keep our own handle alive; aborting it here would be a no-op
                inner.timer = None;
                inner.resolve(UndoState::Committed);
            }
        }));

        tracing::debug!("Undo token {} armed for {:?}", token.id, window);
        token
    }

    /// Claim the pending token for undoing.
    ///
    /// The token stops its expiry timer and leaves the slot but reports
    /// `Armed` until [`UndoSlot::finish`] settles it. Returns `None` when
    /// `token_id` is no longer armed.
    pub fn take(&self, token_id: &str) -> Option<UndoToken> {
        let mut inner = self.lock();
        if inner.pending.as_ref()?.id != token_id {
            return None;
        }
        let token = inner.detach()?;
        inner.reversing = Some(token.clone());
        Some(token)
    }

    /// Settle a claimed token: `Undone` when the reversal went through,
    /// `Committed` when it failed and the action stands.
    pub fn finish(&self, token_id: &str, reversed: bool) -> Option<UndoState> {
        let mut inner = self.lock();
        if inner.reversing.as_ref()?.id != token_id {
            return None;
        }
        let token = inner.reversing.take()?;
        let state = if reversed {
            UndoState::Undone
        } else {
            UndoState::Committed
        };
        inner.record(&token, state);
        Some(state)
    }

    /// Commit the pending token now, e.g. when its toast is dismissed.
    pub fn commit(&self, token_id: &str) -> bool {
        let mut inner = self.lock();
        if inner.pending.as_ref().is_some_and(|pending| pending.id == token_id) {
            inner.resolve(UndoState::Committed).is_some()
        } else {
            false
        }
    }

    /// The armed token, if any.
    pub fn pending(&self) -> Option<UndoToken> {
        self.lock().pending.clone()
    }

    /// State of a recently seen token.
    pub fn state(&self, token_id: &str) -> Option<UndoState> {
        let inner = self.lock();
        let armed = |token: &Option<UndoToken>| token.as_ref().is_some_and(|t| t.id == token_id);
        if armed(&inner.pending) || armed(&inner.reversing) {
            return Some(UndoState::Armed);
        }
        inner
            .resolved
            .iter()
            .rev()
            .find(|(id, _)| id == token_id)
            .map(|(_, state)| *state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn complete(previous_completed: bool) -> UndoKind {
        UndoKind::Complete { previous_completed }
    }

    #[tokio::test(start_paused = true)]
    async fn token_ids_carry_kind_reminder_and_counter() {
        let slot = UndoSlot::new(Duration::from_secs(5));
        let first = slot.queue(complete(false), ReminderId::from("r1"));
        let second = slot.queue(UndoKind::Delete, ReminderId::from("r2"));

        assert_eq!(first.id, "complete-r1-1");
        assert_eq!(second.id, "delete-r2-2");
    }

    #[tokio::test(start_paused = true)]
    async fn undo_within_window() {
        let slot = UndoSlot::new(Duration::from_secs(5));
        let token = slot.queue(complete(false), ReminderId::from("r1"));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(slot.take(&token.id), Some(token.clone()));
        assert_eq!(slot.pending(), None);
        assert_eq!(slot.state(&token.id), Some(UndoState::Armed));

        // A second undo of the same token is a no-op
        assert_eq!(slot.take(&token.id), None);

        assert_eq!(slot.finish(&token.id, true), Some(UndoState::Undone));
        assert_eq!(slot.state(&token.id), Some(UndoState::Undone));
        assert_eq!(slot.finish(&token.id, true), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reversal_commits_and_expiry_stays_quiet() {
        let slot = UndoSlot::new(Duration::from_secs(5));
        let token = slot.queue(UndoKind::Delete, ReminderId::from("r1"));
        assert!(slot.take(&token.id).is_some());

        // The aborted timer must not settle a token that is mid-reversal
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(slot.state(&token.id), Some(UndoState::Armed));

        assert_eq!(slot.finish(&token.id, false), Some(UndoState::Committed));
        assert_eq!(slot.state(&token.id), Some(UndoState::Committed));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_commits() {
        let slot = UndoSlot::new(Duration::from_secs(5));
        let token = slot.queue(UndoKind::Delete, ReminderId::from("r1"));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(slot.state(&token.id), Some(UndoState::Committed));
        assert_eq!(slot.take(&token.id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn queuing_supersedes_pending_token() {
        let slot = UndoSlot::new(Duration::from_secs(5));
        let first = slot.queue(complete(true), ReminderId::from("r1"));
        tokio::time::sleep(Duration::from_secs(3)).await;
        let second = slot.queue(UndoKind::Delete, ReminderId::from("r2"));

        assert_eq!(slot.state(&first.id), Some(UndoState::Committed));
        assert_eq!(slot.take(&first.id), None);

        // The first token's timer would have fired at t=5; the second must
        // stay armed until t=8.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(slot.state(&second.id), Some(UndoState::Armed));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(slot.state(&second.id), Some(UndoState::Committed));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_commit_and_window_changes() {
        let slot = UndoSlot::new(Duration::from_secs(5));
        let token = slot.queue(UndoKind::Delete, ReminderId::from("r1"));
        assert!(slot.commit(&token.id));
        assert!(!slot.commit(&token.id));

        slot.set_window(Duration::from_secs(10));
        let token = slot.queue(UndoKind::Delete, ReminderId::from("r1"));
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(slot.state(&token.id), Some(UndoState::Armed));
    }
}
