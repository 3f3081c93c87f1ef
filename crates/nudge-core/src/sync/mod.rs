//! Offline sync: pull protocol, reconciliation policy, and the engine that
//! drives them.

pub mod engine;
pub mod policy;
mod protocol;

pub use engine::{
    Invalidation, LifecycleEvent, SkipReason, SyncEngine, SyncOutcome, SyncReport, SyncSettings,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SYNC_INTERVAL,
};
pub use policy::{advance_checkpoint, decide, plan_merge, MergeDecision, MergePlan};
pub use protocol::{SyncRequest, SyncResponse, SyncTransport};
