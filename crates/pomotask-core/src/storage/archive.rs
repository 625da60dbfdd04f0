//! Trash collections for removed tasks and profiles.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{read_record, write_record, KvStore};
use crate::error::StorageError;

/// An archived item together with the moment it was removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archived<T> {
    pub removed_at: DateTime<Utc>,
    pub item: T,
}

/// Append-mostly archive stored as a JSON array under one key.
pub struct Archive<'a> {
    kv: &'a dyn KvStore,
    key: &'static str,
}

impl<'a> Archive<'a> {
    pub fn new(kv: &'a dyn KvStore, key: &'static str) -> Self {
        Self { kv, key }
    }

    /// Append an item to the archive.
    pub fn push<T>(&self, item: T, removed_at: DateTime<Utc>) -> Result<(), StorageError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut items: Vec<Archived<T>> = self.list();
        items.push(Archived { removed_at, item });
        write_record(self.kv, self.key, &items)
    }

    /// All archived items, oldest first.
    pub fn list<T: DeserializeOwned>(&self) -> Vec<Archived<T>> {
        read_record(self.kv, self.key).unwrap_or_default()
    }

    /// Permanently drop archived items matching `pred`. Returns how many went.
    pub fn purge<T, F>(&self, pred: F) -> Result<usize, StorageError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let items: Vec<Archived<T>> = self.list();
        let before = items.len();
        let kept: Vec<Archived<T>> = items.into_iter().filter(|a| !pred(&a.item)).collect();
        let purged = before - kept.len();
        if purged > 0 {
            write_record(self.kv, self.key, &kept)?;
        }
        Ok(purged)
    }
}
