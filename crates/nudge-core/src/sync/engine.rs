//! Sync engine: pulls server deltas and folds them into the local cache

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::policy::{advance_checkpoint, plan_merge};
use super::{SyncRequest, SyncTransport};
use crate::db::SyncBatch;
use crate::error::{Error, Result};
use crate::models::{EntityType, ReminderId};
use crate::services::LocalStore;
use crate::state::{SyncState, SyncStatus};

/// Default polling period
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15);
/// Default limit for one pull request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_SYNC_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Why a sync request did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    Offline,
    Hidden,
}

/// What a completed pull changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub lists_written: usize,
    pub reminders_applied: usize,
    pub reminders_discarded: usize,
    /// Server timestamp of the response
    pub server_timestamp: DateTime<Utc>,
}

/// Result of [`SyncEngine::perform_sync`]
#[derive(Debug)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Applied(SyncReport),
    /// The session expired; nothing changed and nothing is reported
    Unauthorized,
    /// Transient failure; the next trigger retries the same window
    Failed(Error),
    /// Another pull was in flight; a follow-up pull has been scheduled
    Coalesced,
}

/// Cache views that must be refreshed after a pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invalidation {
    Lists,
    Reminders,
}

/// Host application transitions that affect syncing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Visibility(bool),
    Connectivity(bool),
}

#[derive(Debug, Default)]
struct Flight {
    running: bool,
    follow_up: bool,
}

/// Clears the in-flight marker even if the sync future is dropped.
struct FlightGuard<'a>(&'a Mutex<Flight>);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut flight = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        flight.running = false;
        flight.follow_up = false;
    }
}

/// Keeps the local cache eventually consistent with the server.
pub struct SyncEngine<T> {
    transport: T,
    store: LocalStore,
    settings: SyncSettings,
    enabled: AtomicBool,
    online: AtomicBool,
    visible: AtomicBool,
    flight: Mutex<Flight>,
    status: watch::Sender<SyncStatus>,
    invalidations: broadcast::Sender<Invalidation>,
}

impl<T: SyncTransport> SyncEngine<T> {
    pub fn new(transport: T, store: LocalStore, settings: SyncSettings) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        let (invalidations, _) = broadcast::channel(16);
        Self {
            transport,
            store,
            settings,
            enabled: AtomicBool::new(settings.enabled),
            online: AtomicBool::new(true),
            visible: AtomicBool::new(true),
            flight: Mutex::new(Flight::default()),
            status,
            invalidations,
        }
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Current status snapshot.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if online {
            if self.status.borrow().state == SyncState::Offline {
                self.status
                    .send_replace(self.status().with_state(SyncState::Synced));
            }
        } else {
            self.status
                .send_replace(self.status().with_state(SyncState::Offline));
        }
    }

    /// Record a lifecycle transition; returns whether it should trigger a sync.
    pub fn handle_event(&self, event: LifecycleEvent) -> bool {
        match event {
            LifecycleEvent::Visibility(visible) => {
                self.set_visible(visible);
                visible
            }
            LifecycleEvent::Connectivity(online) => {
                self.set_online(online);
                online
            }
        }
    }

    fn skip_reason(&self) -> Option<SkipReason> {
        if !self.enabled.load(Ordering::SeqCst) {
            Some(SkipReason::Disabled)
        } else if !self.online.load(Ordering::SeqCst) {
            Some(SkipReason::Offline)
        } else if !self.visible.load(Ordering::SeqCst) {
            Some(SkipReason::Hidden)
        } else {
            None
        }
    }

    /// Pull and merge once, unless preconditions fail or a pull is already
    /// running.
    ///
    /// Callers that arrive during a pull get [`SyncOutcome::Coalesced`] and
    /// cause exactly one follow-up pull, run by the caller that owns the
    /// flight once its own pull completes.
    pub async fn perform_sync(&self) -> SyncOutcome {
        if let Some(reason) = self.skip_reason() {
            tracing::debug!("Skipping sync: {reason:?}");
            return SyncOutcome::Skipped(reason);
        }

        {
            let mut flight = self.flight.lock().unwrap_or_else(PoisonError::into_inner);
            if flight.running {
                flight.follow_up = true;
                tracing::debug!("Sync already in flight; scheduling one follow-up");
                return SyncOutcome::Coalesced;
            }
            flight.running = true;
        }
        let _guard = FlightGuard(&self.flight);

        let mut outcome = self.sync_once().await;
        while self.continue_flight() {
            if let Some(reason) = self.skip_reason() {
                outcome = SyncOutcome::Skipped(reason);
                break;
            }
            outcome = self.sync_once().await;
        }
        outcome
    }

    /// Consume a pending follow-up, or end the flight when there is none.
    fn continue_flight(&self) -> bool {
        let mut flight = self.flight.lock().unwrap_or_else(PoisonError::into_inner);
        if flight.follow_up {
            flight.follow_up = false;
            true
        } else {
            flight.running = false;
            false
        }
    }

    async fn sync_once(&self) -> SyncOutcome {
        let previous = self.status();
        self.status.send_replace(previous.syncing());

        match self.pull_and_apply().await {
            Ok(report) => {
                self.status
                    .send_replace(SyncStatus::synced(report.server_timestamp));
                self.invalidations.send(Invalidation::Lists).ok();
                self.invalidations.send(Invalidation::Reminders).ok();
                tracing::info!(
                    "Synced {} lists and {} reminders ({} stale discarded)",
                    report.lists_written,
                    report.reminders_applied,
                    report.reminders_discarded
                );
                SyncOutcome::Applied(report)
            }
            Err(Error::Unauthorized) => {
                tracing::debug!("Sync rejected with 401; waiting for a new session");
                self.status.send_replace(previous);
                SyncOutcome::Unauthorized
            }
            Err(error) => {
                tracing::warn!("Sync failed, will retry on next trigger: {error}");
                self.status.send_replace(previous.failed(&error));
                SyncOutcome::Failed(error)
            }
        }
    }

    async fn pull_and_apply(&self) -> Result<SyncReport> {
        let since_lists = self.store.checkpoint(EntityType::Lists).await?;
        let since_reminders = self.store.checkpoint(EntityType::Reminders).await?;
        let request = SyncRequest {
            since_lists,
            since_reminders,
        };

        let response =
            tokio::time::timeout(self.settings.request_timeout, self.transport.pull(&request))
                .await
                .map_err(|_| Error::Timeout)??;

        let ids: Vec<ReminderId> = response.reminders.iter().map(|r| r.id.clone()).collect();
        let existing = self.store.get_reminders(&ids).await?;
        let plan = plan_merge(&existing, &response);

        let mut checkpoints = Vec::with_capacity(2);
        for (entity, current) in [
            (EntityType::Lists, since_lists),
            (EntityType::Reminders, since_reminders),
        ] {
            if current.is_some_and(|current| response.timestamp < current) {
                tracing::warn!(
                    "Server timestamp {} is older than the {entity} checkpoint; keeping checkpoint",
                    response.timestamp
                );
            }
            checkpoints.push((entity, advance_checkpoint(current, response.timestamp)));
        }

        let report = SyncReport {
            lists_written: plan.lists.len(),
            reminders_applied: plan.reminders.len(),
            reminders_discarded: plan.discarded,
            server_timestamp: response.timestamp,
        };
        self.store
            .apply_sync_batch(&SyncBatch {
                lists: plan.lists,
                reminders: plan.reminders,
                checkpoints,
            })
            .await?;
        Ok(report)
    }

    /// Drive syncing until `shutdown` resolves.
    ///
    /// Syncs immediately, then every interval, and whenever the host becomes
    /// visible or regains connectivity. Events keep being received while a
    /// pull is in flight; triggers during a flight fold into its single
    /// follow-up.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<LifecycleEvent>,
        shutdown: impl Future<Output = ()>,
    ) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;
        let mut in_flight: Option<PendingSync<'_>> = None;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::debug!("Sync scheduler stopping");
                    break;
                }
                outcome = finish_pull(&mut in_flight) => {
                    in_flight = None;
                    tracing::debug!("Scheduled sync finished: {outcome:?}");
                }
                _ = ticker.tick() => {
                    tracing::debug!(
                        "Sync scheduler tick: interval={}s",
                        self.settings.interval.as_secs()
                    );
                    self.trigger(&mut in_flight).await;
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        if self.handle_event(event) {
                            tracing::debug!("Sync triggered by {event:?}");
                            self.trigger(&mut in_flight).await;
                        }
                    }
                    None => events_open = false,
                },
            }
        }
    }

    /// Start a pull, or fold the trigger into the one already running.
    async fn trigger<'a>(&'a self, in_flight: &mut Option<PendingSync<'a>>) {
        if in_flight.is_some() {
            // Returns at once: either skipped or marked as the follow-up
            let outcome = self.perform_sync().await;
            tracing::debug!("Trigger during pull: {outcome:?}");
        } else {
            *in_flight = Some(Box::pin(self.perform_sync()));
        }
    }
}

type PendingSync<'a> = Pin<Box<dyn Future<Output = SyncOutcome> + Send + 'a>>;

async fn finish_pull(in_flight: &mut Option<PendingSync<'_>>) -> SyncOutcome {
    match in_flight {
        Some(pull) => pull.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CachedList, CachedReminder, ListId, Priority};
    use crate::sync::SyncResponse;
    use crate::util::parse_timestamp;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn ts(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    fn reminder(id: &str, title: &str, updated_at: &str) -> CachedReminder {
        CachedReminder {
            id: ReminderId::from(id),
            list_id: ListId::from("l1"),
            title: title.to_string(),
            notes: None,
            completed: false,
            priority: Priority::None,
            utc_datetime: None,
            timezone: None,
            is_floating: false,
            is_date_only: false,
            updated_at: ts(updated_at),
        }
    }

    fn list(id: &str) -> CachedList {
        CachedList {
            id: ListId::from(id),
            name: "Inbox".to_string(),
            color: None,
            icon: None,
            incomplete_count: 1,
            updated_at: ts("2024-01-01T00:00:00Z"),
        }
    }

    fn response(reminders: Vec<CachedReminder>, timestamp: &str) -> SyncResponse {
        SyncResponse {
            lists: vec![list("l1")],
            reminders,
            timestamp: ts(timestamp),
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        responses: Mutex<VecDeque<Result<SyncResponse>>>,
        requests: Mutex<Vec<SyncRequest>>,
        calls: AtomicUsize,
        entered: Notify,
        gate: Option<Arc<Notify>>,
        delay: Option<Duration>,
    }

    impl FakeTransport {
        fn with(responses: Vec<Result<SyncResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyncTransport for FakeTransport {
        async fn pull(&self, request: &SyncRequest) -> Result<SyncResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(*request);
            self.entered.notify_one();
            if call == 0 {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(response(Vec::new(), "2024-06-01T00:00:00Z")))
        }
    }

    fn engine(transport: FakeTransport) -> SyncEngine<FakeTransport> {
        SyncEngine::new(
            transport,
            LocalStore::open_in_memory().unwrap(),
            SyncSettings::default(),
        )
    }

    #[tokio::test]
    async fn new_record_is_pulled_and_views_invalidated() {
        let engine = engine(FakeTransport::with(vec![Ok(response(
            vec![reminder("r1", "Buy milk", "2024-05-01T00:00:00Z")],
            "2024-05-02T00:00:00Z",
        ))]));
        let mut invalidations = engine.subscribe_invalidations();

        let outcome = engine.perform_sync().await;
        let SyncOutcome::Applied(report) = outcome else {
            panic!("expected applied, got {outcome:?}");
        };
        assert_eq!(report.reminders_applied, 1);
        assert_eq!(report.lists_written, 1);

        let stored = engine.store().get_reminder(&ReminderId::from("r1")).await.unwrap();
        assert_eq!(stored.unwrap().title, "Buy milk");
        for entity in EntityType::ALL {
            assert_eq!(
                engine.store().checkpoint(entity).await.unwrap(),
                Some(ts("2024-05-02T00:00:00Z"))
            );
        }
        assert_eq!(invalidations.recv().await.unwrap(), Invalidation::Lists);
        assert_eq!(invalidations.recv().await.unwrap(), Invalidation::Reminders);

        let status = engine.status();
        assert_eq!(status.state, SyncState::Synced);
        assert_eq!(status.last_synced_at, Some(ts("2024-05-02T00:00:00Z")));
    }

    #[tokio::test]
    async fn second_pull_sends_checkpoints() {
        let engine = engine(FakeTransport::with(vec![
            Ok(response(Vec::new(), "2024-05-02T00:00:00Z")),
            Ok(response(Vec::new(), "2024-05-03T00:00:00Z")),
        ]));

        engine.perform_sync().await;
        engine.perform_sync().await;

        let requests = engine.transport.requests.lock().unwrap().clone();
        assert!(requests[0].is_full());
        assert_eq!(requests[1].since_lists, Some(ts("2024-05-02T00:00:00Z")));
        assert_eq!(requests[1].since_reminders, Some(ts("2024-05-02T00:00:00Z")));
    }

    #[tokio::test]
    async fn stale_pull_keeps_newer_local_copy() {
        let engine = engine(FakeTransport::with(vec![Ok(response(
            vec![reminder("r1", "server copy", "2024-01-01T00:00:00Z")],
            "2024-05-02T00:00:00Z",
        ))]));
        engine
            .store()
            .put_reminders(&[reminder("r1", "local edit", "2024-02-01T00:00:00Z")])
            .await
            .unwrap();

        let SyncOutcome::Applied(report) = engine.perform_sync().await else {
            panic!("expected applied");
        };
        assert_eq!(report.reminders_discarded, 1);

        let stored = engine.store().get_reminder(&ReminderId::from("r1")).await.unwrap();
        assert_eq!(stored.unwrap().title, "local edit");
    }

    #[tokio::test]
    async fn offline_sync_is_suppressed() {
        let engine = engine(FakeTransport::default());
        engine.set_online(false);

        let outcome = engine.perform_sync().await;
        assert!(matches!(outcome, SyncOutcome::Skipped(SkipReason::Offline)));
        assert_eq!(engine.transport.calls(), 0);
        assert_eq!(engine.store().checkpoint(EntityType::Lists).await.unwrap(), None);
        assert_eq!(engine.status().state, SyncState::Offline);
    }

    #[tokio::test]
    async fn hidden_and_disabled_sync_is_suppressed() {
        let engine = engine(FakeTransport::default());
        engine.set_visible(false);
        assert!(matches!(
            engine.perform_sync().await,
            SyncOutcome::Skipped(SkipReason::Hidden)
        ));

        engine.set_visible(true);
        engine.set_enabled(false);
        assert!(matches!(
            engine.perform_sync().await,
            SyncOutcome::Skipped(SkipReason::Disabled)
        ));
        assert_eq!(engine.transport.calls(), 0);
    }

    #[tokio::test]
    async fn unauthorized_changes_nothing() {
        let engine = engine(FakeTransport::with(vec![Err(Error::Unauthorized)]));
        let before = engine.status();

        assert!(matches!(engine.perform_sync().await, SyncOutcome::Unauthorized));
        assert_eq!(engine.store().checkpoint(EntityType::Reminders).await.unwrap(), None);
        assert_eq!(engine.status(), before);
    }

    #[tokio::test]
    async fn transient_failure_keeps_checkpoints_and_retries() {
        let engine = engine(FakeTransport::with(vec![
            Ok(response(Vec::new(), "2024-05-01T00:00:00Z")),
            Err(Error::Api {
                status: 500,
                message: "boom".to_string(),
            }),
            Ok(response(Vec::new(), "2024-05-03T00:00:00Z")),
        ]));

        engine.perform_sync().await;
        assert!(matches!(engine.perform_sync().await, SyncOutcome::Failed(_)));

        let status = engine.status();
        assert_eq!(status.state, SyncState::Error);
        assert_eq!(status.consecutive_failures, 1);
        assert_eq!(
            engine.store().checkpoint(EntityType::Lists).await.unwrap(),
            Some(ts("2024-05-01T00:00:00Z"))
        );

        assert!(matches!(engine.perform_sync().await, SyncOutcome::Applied(_)));
        let requests = engine.transport.requests.lock().unwrap().clone();
        assert_eq!(requests[2].since_lists, Some(ts("2024-05-01T00:00:00Z")));
        assert_eq!(engine.status().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_pull_times_out() {
        let transport = FakeTransport {
            delay: Some(Duration::from_secs(60)),
            ..FakeTransport::default()
        };
        let engine = engine(transport);

        let outcome = engine.perform_sync().await;
        assert!(matches!(outcome, SyncOutcome::Failed(Error::Timeout)));
        assert_eq!(engine.store().checkpoint(EntityType::Lists).await.unwrap(), None);
    }

    #[tokio::test]
    async fn older_server_timestamp_never_rewinds_checkpoint() {
        let engine = engine(FakeTransport::with(vec![
            Ok(response(Vec::new(), "2024-05-10T00:00:00Z")),
            Ok(response(Vec::new(), "2024-05-01T00:00:00Z")),
        ]));

        engine.perform_sync().await;
        engine.perform_sync().await;

        assert_eq!(
            engine.store().checkpoint(EntityType::Reminders).await.unwrap(),
            Some(ts("2024-05-10T00:00:00Z"))
        );
    }

    #[tokio::test]
    async fn overlapping_triggers_coalesce_into_one_follow_up() {
        let gate = Arc::new(Notify::new());
        let engine = Arc::new(engine(FakeTransport {
            gate: Some(gate.clone()),
            ..FakeTransport::default()
        }));

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.perform_sync().await }
        });
        engine.transport.entered.notified().await;

        assert!(matches!(engine.perform_sync().await, SyncOutcome::Coalesced));
        assert!(matches!(engine.perform_sync().await, SyncOutcome::Coalesced));

        gate.notify_one();
        assert!(matches!(first.await.unwrap(), SyncOutcome::Applied(_)));
        assert_eq!(engine.transport.calls(), 2);

        // The flight is over; a new trigger runs normally
        assert!(matches!(engine.perform_sync().await, SyncOutcome::Applied(_)));
        assert_eq!(engine.transport.calls(), 3);
    }

    #[tokio::test]
    async fn merging_the_same_response_twice_changes_nothing() {
        let pulled = response(
            vec![
                reminder("r1", "Buy milk", "2024-05-01T00:00:00Z"),
                reminder("r2", "Call mum", "2024-05-01T12:00:00Z"),
            ],
            "2024-05-02T00:00:00Z",
        );
        let engine = engine(FakeTransport::with(vec![Ok(pulled.clone()), Ok(pulled)]));

        assert!(matches!(engine.perform_sync().await, SyncOutcome::Applied(_)));
        let lists = engine.store().list_lists().await.unwrap();
        let reminders = engine.store().list_reminders(None).await.unwrap();

        let SyncOutcome::Applied(report) = engine.perform_sync().await else {
            panic!("expected applied");
        };
        assert_eq!(report.reminders_applied, 0);
        assert_eq!(report.reminders_discarded, 2);
        assert_eq!(engine.store().list_lists().await.unwrap(), lists);
        assert_eq!(engine.store().list_reminders(None).await.unwrap(), reminders);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_local_copy() {
        let engine = engine(FakeTransport::with(vec![Ok(response(
            vec![reminder("r1", "server copy", "2024-03-01T00:00:00Z")],
            "2024-05-02T00:00:00Z",
        ))]));
        let mut local = reminder("r1", "local copy", "2024-03-01T00:00:00Z");
        local.completed = true;
        engine.store().put_reminders(&[local.clone()]).await.unwrap();

        let SyncOutcome::Applied(report) = engine.perform_sync().await else {
            panic!("expected applied");
        };
        assert_eq!(report.reminders_discarded, 1);
        let stored = engine.store().get_reminder(&ReminderId::from("r1")).await.unwrap();
        assert_eq!(stored, Some(local));
    }

    #[tokio::test]
    async fn scheduler_folds_events_during_a_pull_into_one_follow_up() {
        let gate = Arc::new(Notify::new());
        let engine = Arc::new(engine(FakeTransport {
            gate: Some(gate.clone()),
            ..FakeTransport::default()
        }));
        let (events, events_rx) = mpsc::channel(4);
        let stop = Arc::new(Notify::new());

        let runner = tokio::spawn({
            let engine = engine.clone();
            let stop = stop.clone();
            async move { engine.run(events_rx, async move { stop.notified().await }).await }
        });

        // The first tick's pull is now parked on the gate
        engine.transport.entered.notified().await;
        for event in [
            LifecycleEvent::Visibility(true),
            LifecycleEvent::Connectivity(true),
            LifecycleEvent::Visibility(true),
        ] {
            events.send(event).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.transport.calls(), 1);

        gate.notify_one();
        for _ in 0..50 {
            if engine.transport.calls() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.transport.calls(), 2);

        stop.notify_one();
        runner.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_syncs_on_start_interval_and_events() {
        let engine = Arc::new(engine(FakeTransport::default()));
        let (events, events_rx) = mpsc::channel(4);
        let stop = Arc::new(Notify::new());

        let runner = tokio::spawn({
            let engine = engine.clone();
            let stop = stop.clone();
            async move { engine.run(events_rx, async move { stop.notified().await }).await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.transport.calls(), 1);

        tokio::time::sleep(DEFAULT_SYNC_INTERVAL).await;
        assert_eq!(engine.transport.calls(), 2);

        events.send(LifecycleEvent::Connectivity(false)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.status().state, SyncState::Offline);

        events.send(LifecycleEvent::Connectivity(true)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.transport.calls(), 3);

        events.send(LifecycleEvent::Visibility(false)).await.unwrap();
        tokio::time::sleep(DEFAULT_SYNC_INTERVAL).await;
        assert_eq!(engine.transport.calls(), 3);

        stop.notify_one();
        runner.await.unwrap();
    }
}
