//! Shared local cache handle used by the sync engine and clients.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::{CacheRepository, Database, SqliteCacheRepository, SyncBatch};
use crate::models::{CachedList, CachedReminder, EntityType, ListId, ReminderId};
use crate::Result;

/// Thread-safe handle to the offline cache.
///
/// Cloning is cheap; all clones share one connection.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open the cache at the given filesystem path.
    ///
    /// A file that `SQLite` does not recognise is moved aside and a fresh
    /// cache is created; the next sync repopulates it.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let db = match Database::open(&db_path) {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Local cache at {} is unreadable: {}. Starting from an empty cache.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path)?
            }
            Err(error) => return Err(error),
        };

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory cache (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location, if the cache is on disk.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn is_corrupted_db_error(error: &crate::Error) -> bool {
        let message = error.to_string().to_ascii_lowercase();
        message.contains("file is not a database")
            || message.contains("database disk image is malformed")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = Utc::now().timestamp_millis();
            let backup_path = db_path.with_file_name(format!("nudge.db.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted local cache from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };
        let sidecar_prefix = format!("{base_name}-");

        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            // WAL and shared-memory sidecars of the old file
            if file_name.starts_with(&sidecar_prefix) && !file_name.contains(".corrupt-") {
                let path = entry.path();
                std::fs::remove_file(&path)?;
                tracing::warn!("Removed stale cache file {}", path.display());
            }
        }

        Ok(())
    }

    /// All cached lists.
    pub async fn list_lists(&self) -> Result<Vec<CachedList>> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).list_lists()
    }

    /// Fetch a cached list by id.
    pub async fn get_list(&self, id: &ListId) -> Result<Option<CachedList>> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).get_list(id)
    }

    /// Cached reminders, optionally for one list.
    pub async fn list_reminders(&self, list_id: Option<&ListId>) -> Result<Vec<CachedReminder>> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).list_reminders(list_id)
    }

    /// Fetch a cached reminder by id.
    pub async fn get_reminder(&self, id: &ReminderId) -> Result<Option<CachedReminder>> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).get_reminder(id)
    }

    /// Look up the local copies of many reminders.
    pub async fn get_reminders(
        &self,
        ids: &[ReminderId],
    ) -> Result<HashMap<ReminderId, CachedReminder>> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).get_reminders(ids)
    }

    /// Write reminders confirmed by the server outside of a sync pull.
    pub async fn put_reminders(&self, reminders: &[CachedReminder]) -> Result<()> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).put_reminders(reminders)
    }

    /// Drop a reminder from the cache.
    pub async fn delete_reminder(&self, id: &ReminderId) -> Result<bool> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).delete_reminder(id)
    }

    /// Last successful pull for an entity type.
    pub async fn checkpoint(&self, entity: EntityType) -> Result<Option<DateTime<Utc>>> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).checkpoint(entity)
    }

    /// Commit a pull's records and checkpoints atomically.
    pub async fn apply_sync_batch(&self, batch: &SyncBatch) -> Result<()> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).apply_sync_batch(batch)
    }

    /// Forget everything, forcing the next sync to be a full pull.
    pub async fn clear(&self) -> Result<()> {
        let db = self.db.lock().await;
        SqliteCacheRepository::new(db.connection()).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::parse_timestamp;

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = LocalStore::open_in_memory().unwrap();
        let at = parse_timestamp("2024-01-01T00:00:00Z").unwrap();

        store
            .apply_sync_batch(&SyncBatch {
                checkpoints: vec![(EntityType::Lists, at)],
                ..SyncBatch::default()
            })
            .await
            .unwrap();

        assert_eq!(store.checkpoint(EntityType::Lists).await.unwrap(), Some(at));
        assert!(store.list_lists().await.unwrap().is_empty());
        assert!(store.path().is_none());
    }

    #[test]
    fn detects_corrupted_cache_errors() {
        assert!(LocalStore::is_corrupted_db_error(&crate::Error::Database(
            "SQLite failure: file is not a database".to_string()
        )));
        assert!(!LocalStore::is_corrupted_db_error(&crate::Error::InvalidInput(
            "list name is required".to_string()
        )));
    }

    #[test]
    fn corrupted_cache_file_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nudge.db");
        std::fs::write(&db_path, vec![b'x'; 8192]).unwrap();
        std::fs::write(tmp.path().join("nudge.db-wal"), b"stale").unwrap();

        let store = LocalStore::open_path(&db_path).unwrap();
        assert_eq!(store.path(), Some(db_path.as_path()));
        let wal = tmp.path().join("nudge.db-wal");
        assert!(!wal.exists() || std::fs::read(&wal).unwrap() != b"stale");

        let backups = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(backups, 1);
    }
}
