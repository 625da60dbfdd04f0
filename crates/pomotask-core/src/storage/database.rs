//! SQLite-backed persistence for the CLI host.
//!
//! Provides:
//! - The key-value table behind [`KvStore`]
//! - A reminder outbox behind [`ReminderScheduler`]: every scheduled reminder
//!   is a row until it is cancelled or acknowledged by whoever delivers it

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::{data_dir, KvStore};
use crate::error::{SchedulingError, StorageError};
use crate::ids::new_id;
use crate::reminder::{ReminderHandle, ReminderRequest, ReminderScheduler};

/// A reminder waiting in the outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReminder {
    pub handle: ReminderHandle,
    pub title: String,
    pub body: String,
    pub fires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// SQLite database holding the key-value records and the reminder outbox.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pomotask/pomotask.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()?.join("pomotask.db");
        Self::open_at(path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reminders (
                id         TEXT PRIMARY KEY,
                title      TEXT NOT NULL,
                body       TEXT NOT NULL DEFAULT '',
                fires_at   TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reminders_fires_at ON reminders(fires_at);",
        )?;
        Ok(())
    }

    /// Every reminder still in the outbox, soonest first.
    pub fn pending_reminders(&self) -> Result<Vec<PendingReminder>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, body, fires_at, created_at FROM reminders")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut reminders = Vec::new();
        for row in rows {
            let (id, title, body, fires_at, created_at) = row?;
            let (Some(fires_at), Some(created_at)) = (parse_ts(&fires_at), parse_ts(&created_at))
            else {
                tracing::debug!(id, "skipping reminder row with unreadable timestamps");
                continue;
            };
            reminders.push(PendingReminder {
                handle: ReminderHandle::new(id),
                title,
                body,
                fires_at,
                created_at,
            });
        }
        reminders.sort_by_key(|r| r.fires_at);
        Ok(reminders)
    }

    /// Reminders whose firing time is at or before `now`.
    pub fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<PendingReminder>, StorageError> {
        Ok(self
            .pending_reminders()?
            .into_iter()
            .filter(|r| r.fires_at <= now)
            .collect())
    }

    /// Drop a delivered reminder from the outbox. Returns whether it existed.
    pub fn acknowledge(&self, handle: &ReminderHandle) -> Result<bool, StorageError> {
        let n = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?1", params![handle.as_str()])?;
        Ok(n > 0)
    }
}

impl KvStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv WHERE key = ?1")
            .map_err(|e| StorageError::unavailable(key, e))?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::unavailable(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| StorageError::unavailable(key, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| StorageError::unavailable(key, e))?;
        Ok(())
    }
}

impl ReminderScheduler for Database {
    fn schedule(&self, request: &ReminderRequest) -> Result<ReminderHandle, SchedulingError> {
        let handle = ReminderHandle::new(new_id("reminder"));
        self.conn
            .execute(
                "INSERT INTO reminders (id, title, body, fires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    handle.as_str(),
                    request.title,
                    request.body,
                    request.fires_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| SchedulingError::ScheduleFailed {
                title: request.title.clone(),
                message: e.to_string(),
            })?;
        Ok(handle)
    }

    fn cancel(&self, handle: &ReminderHandle) -> Result<(), SchedulingError> {
        self.conn
            .execute("DELETE FROM reminders WHERE id = ?1", params![handle.as_str()])
            .map_err(|e| SchedulingError::CancelFailed {
                handle: handle.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.get("test").unwrap().is_none());
        db.set("test", "hello").unwrap();
        assert_eq!(db.get("test").unwrap().unwrap(), "hello");
        db.remove("test").unwrap();
        assert!(db.get("test").unwrap().is_none());
    }

    #[test]
    fn outbox_schedule_and_cancel() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let soon = db
            .schedule(&ReminderRequest::new("Pomodoro Work", "Focus finished", now))
            .unwrap();
        let later = db
            .schedule(&ReminderRequest::new(
                "Buy milk",
                "",
                now + Duration::minutes(10),
            ))
            .unwrap();

        let pending = db.pending_reminders().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].handle, soon);

        let due = db.due_reminders(now).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "Pomodoro Work");

        db.cancel(&later).unwrap();
        assert_eq!(db.pending_reminders().unwrap().len(), 1);
        assert!(db.acknowledge(&soon).unwrap());
        assert!(!db.acknowledge(&soon).unwrap());
    }

    #[test]
    fn reopen_keeps_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pomotask.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.set("session", "{}").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get("session").unwrap().as_deref(), Some("{}"));
    }
}
