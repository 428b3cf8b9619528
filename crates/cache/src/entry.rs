use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::CacheKey;

/// Where an entry is in its fill cycle.
///
/// The fill time only exists once an entry is filled, so there is no status
/// without a meaning.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Nothing usable on disk; the next caller with no other users present claims it.
    Invalid,
    /// A single resolver is filling the entry.
    InProgress,
    /// The backing file holds a complete response written at `filled_at`.
    Ok { filled_at: Instant },
}

/// A slot in the cache table. Only touched under the table lock.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) key: CacheKey,
    pub(crate) path: PathBuf,
    pub(crate) status: EntryStatus,
    /// Readers and the resolver currently relying on the backing file
    pub(crate) users: usize,
    /// Woken whenever `status` changes or `users` drops to zero
    pub(crate) notify: Arc<Notify>,
}

impl Entry {
    pub(crate) fn new(key: CacheKey, dir: &Path) -> Self {
        let path = dir.join(key.file_name());
        Self { key, path, status: EntryStatus::Invalid, users: 0, notify: Arc::new(Notify::new()) }
    }

    pub(crate) fn handle(&self) -> EntryRef {
        EntryRef { key: self.key.clone(), path: self.path.clone() }
    }
}

/// The handle a [`Resolver`](crate::Resolver) gets for the entry it fills.
///
/// Pass it back to [`Cache::set`](crate::Cache::set) to store the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRef {
    key: CacheKey,
    path: PathBuf,
}

impl EntryRef {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
