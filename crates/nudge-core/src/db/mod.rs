//! Local cache storage for Nudge

mod cache_repository;
mod connection;
mod migrations;

pub use cache_repository::{CacheRepository, SqliteCacheRepository, SyncBatch};
pub use connection::Database;
