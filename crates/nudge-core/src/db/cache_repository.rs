//! Offline cache repository

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{CachedList, CachedReminder, EntityType, ListId, Priority, ReminderId};
use crate::util::{format_timestamp, parse_timestamp};

const LIST_COLUMNS: &str = "id, name, color, icon, incomplete_count, updated_at";
const REMINDER_COLUMNS: &str = "id, list_id, title, notes, completed, priority, utc_datetime, \
                                timezone, is_floating, is_date_only, updated_at";

/// One pull's worth of changes, committed atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncBatch {
    pub lists: Vec<CachedList>,
    pub reminders: Vec<CachedReminder>,
    pub checkpoints: Vec<(EntityType, DateTime<Utc>)>,
}

/// Trait for cache storage operations
pub trait CacheRepository {
    /// Insert or overwrite lists
    fn put_lists(&self, lists: &[CachedList]) -> Result<()>;

    /// Insert or overwrite reminders
    fn put_reminders(&self, reminders: &[CachedReminder]) -> Result<()>;

    /// Get a list by ID
    fn get_list(&self, id: &ListId) -> Result<Option<CachedList>>;

    /// All cached lists ordered by name
    fn list_lists(&self) -> Result<Vec<CachedList>>;

    /// Get a reminder by ID
    fn get_reminder(&self, id: &ReminderId) -> Result<Option<CachedReminder>>;

    /// Look up many reminders at once; missing ids are absent from the map
    fn get_reminders(&self, ids: &[ReminderId]) -> Result<HashMap<ReminderId, CachedReminder>>;

    /// Cached reminders, optionally restricted to one list
    fn list_reminders(&self, list_id: Option<&ListId>) -> Result<Vec<CachedReminder>>;

    /// Remove a reminder from the cache
    fn delete_reminder(&self, id: &ReminderId) -> Result<bool>;

    /// Last successful pull for an entity type
    fn checkpoint(&self, entity: EntityType) -> Result<Option<DateTime<Utc>>>;

    /// Record a checkpoint, replacing any previous value
    fn set_checkpoint(&self, entity: EntityType, at: DateTime<Utc>) -> Result<()>;

    /// Write records and checkpoints in one transaction
    fn apply_sync_batch(&self, batch: &SyncBatch) -> Result<()>;

    /// Drop all cached records and checkpoints
    fn clear(&self) -> Result<()>;
}

/// `SQLite` implementation of `CacheRepository`
pub struct SqliteCacheRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCacheRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn write_lists(conn: &Connection, lists: &[CachedList]) -> Result<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT OR REPLACE INTO lists (id, name, color, icon, incomplete_count, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        for list in lists {
            stmt.execute(params![
                list.id.as_str(),
                list.name,
                list.color,
                list.icon,
                list.incomplete_count,
                format_timestamp(&list.updated_at),
            ])?;
        }
        Ok(())
    }

    fn write_reminders(conn: &Connection, reminders: &[CachedReminder]) -> Result<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT OR REPLACE INTO reminders (id, list_id, title, notes, completed, priority,
                utc_datetime, timezone, is_floating, is_date_only, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for reminder in reminders {
            stmt.execute(params![
                reminder.id.as_str(),
                reminder.list_id.as_str(),
                reminder.title,
                reminder.notes,
                reminder.completed,
                reminder.priority.ordinal(),
                reminder.utc_datetime.as_ref().map(format_timestamp),
                reminder.timezone,
                reminder.is_floating,
                reminder.is_date_only,
                format_timestamp(&reminder.updated_at),
            ])?;
        }
        Ok(())
    }

    fn write_checkpoint(conn: &Connection, entity: EntityType, at: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "INSERT INTO sync_metadata (entity_type, last_sync_at) VALUES (?, ?)
             ON CONFLICT(entity_type) DO UPDATE SET last_sync_at = excluded.last_sync_at",
            params![entity.as_str(), format_timestamp(&at)],
        )?;
        Ok(())
    }

    /// Parse a list from a database row
    fn parse_list(row: &Row<'_>) -> rusqlite::Result<CachedList> {
        let id: String = row.get(0)?;
        Ok(CachedList {
            id: ListId::from(id),
            name: row.get(1)?,
            color: row.get(2)?,
            icon: row.get(3)?,
            incomplete_count: row.get(4)?,
            updated_at: timestamp_column(row, 5)?,
        })
    }

    /// Parse a reminder from a database row
    fn parse_reminder(row: &Row<'_>) -> rusqlite::Result<CachedReminder> {
        let id: String = row.get(0)?;
        let list_id: String = row.get(1)?;
        let priority: u8 = row.get(5)?;
        let utc_datetime: Option<String> = row.get(6)?;
        Ok(CachedReminder {
            id: ReminderId::from(id),
            list_id: ListId::from(list_id),
            title: row.get(2)?,
            notes: row.get(3)?,
            completed: row.get(4)?,
            priority: Priority::from_ordinal(priority).unwrap_or_default(),
            utc_datetime: utc_datetime
                .map(|raw| parse_column(&raw, 6))
                .transpose()?,
            timezone: row.get(7)?,
            is_floating: row.get(8)?,
            is_date_only: row.get(9)?,
            updated_at: timestamp_column(row, 10)?,
        })
    }
}

fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    parse_column(&raw, index)
}

fn parse_column(raw: &str, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_timestamp(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("invalid timestamp '{raw}'").into(),
        )
    })
}

impl CacheRepository for SqliteCacheRepository<'_> {
    fn put_lists(&self, lists: &[CachedList]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::write_lists(&tx, lists)?;
        tx.commit()?;
        Ok(())
    }

    fn put_reminders(&self, reminders: &[CachedReminder]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::write_reminders(&tx, reminders)?;
        tx.commit()?;
        Ok(())
    }

    fn get_list(&self, id: &ListId) -> Result<Option<CachedList>> {
        let list = self
            .conn
            .query_row(
                &format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = ?"),
                params![id.as_str()],
                Self::parse_list,
            )
            .optional()?;
        Ok(list)
    }

    fn list_lists(&self) -> Result<Vec<CachedList>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {LIST_COLUMNS} FROM lists ORDER BY name COLLATE NOCASE, id"))?;
        let lists = stmt
            .query_map([], Self::parse_list)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lists)
    }

    fn get_reminder(&self, id: &ReminderId) -> Result<Option<CachedReminder>> {
        let reminder = self
            .conn
            .query_row(
                &format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?"),
                params![id.as_str()],
                Self::parse_reminder,
            )
            .optional()?;
        Ok(reminder)
    }

    fn get_reminders(&self, ids: &[ReminderId]) -> Result<HashMap<ReminderId, CachedReminder>> {
        let mut found = HashMap::with_capacity(ids.len());
        // Stay well under SQLITE_MAX_VARIABLE_NUMBER
        for chunk in ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id IN ({placeholders})"
            ))?;
            let rows = stmt.query_map(
                params_from_iter(chunk.iter().map(ReminderId::as_str)),
                Self::parse_reminder,
            )?;
            for row in rows {
                let reminder = row?;
                found.insert(reminder.id.clone(), reminder);
            }
        }
        Ok(found)
    }

    fn list_reminders(&self, list_id: Option<&ListId>) -> Result<Vec<CachedReminder>> {
        let reminders = if let Some(list_id) = list_id {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders WHERE list_id = ? ORDER BY rowid"
            ))?;
            let rows = stmt.query_map(params![list_id.as_str()], Self::parse_reminder)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT {REMINDER_COLUMNS} FROM reminders ORDER BY rowid"))?;
            let rows = stmt.query_map([], Self::parse_reminder)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(reminders)
    }

    fn delete_reminder(&self, id: &ReminderId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?", params![id.as_str()])?;
        Ok(rows > 0)
    }

    fn checkpoint(&self, entity: EntityType) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT last_sync_at FROM sync_metadata WHERE entity_type = ?",
                params![entity.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|raw| parse_column(&raw, 0)).transpose()?)
    }

    fn set_checkpoint(&self, entity: EntityType, at: DateTime<Utc>) -> Result<()> {
        Self::write_checkpoint(self.conn, entity, at)
    }

    fn apply_sync_batch(&self, batch: &SyncBatch) -> Result<()> {
        // Dropping the transaction without commit rolls everything back
        let tx = self.conn.unchecked_transaction()?;
        Self::write_lists(&tx, &batch.lists)?;
        Self::write_reminders(&tx, &batch.reminders)?;
        for (entity, at) in &batch.checkpoints {
            Self::write_checkpoint(&tx, *entity, *at)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
             DELETE FROM lists;
             DELETE FROM reminders;
             DELETE FROM sync_metadata;
             COMMIT;",
        )?;
        Ok(())
    }
}
