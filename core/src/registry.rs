//! Registry of active watches.
//!
//! The `WatchRegistry` owns one [`WatchRecord`] per watched directory and
//! indexes them by watch token and by path.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use tracing::{Level, debug};

use crate::error::{Result, WatcherError};

/// An active watch on one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRecord<T> {
    /// Token handed out by the notification source.
    pub token: T,

    /// Distance from the root watch.
    pub depth: usize,

    /// Path of the watched directory.
    pub path: PathBuf,
}

impl<T> WatchRecord<T> {
    pub fn new(token: T, depth: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            token,
            depth,
            path: path.into(),
        }
    }
}

/// In-memory index of all currently active watches.
///
/// Iteration order is unspecified.
#[derive(Debug)]
pub struct WatchRegistry<T> {
    /// Records keyed by token.
    records: HashMap<T, WatchRecord<T>>,

    /// Index of tokens by path for fast lookup.
    path_index: HashMap<PathBuf, T>,
}

impl<T> WatchRegistry<T>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            path_index: HashMap::new(),
        }
    }

    /// Add a record. Fails if its token is already registered.
    pub fn insert(&mut self, record: WatchRecord<T>) -> Result<()> {
        if let Some(existing) = self.records.get(&record.token) {
            return Err(WatcherError::DuplicateToken {
                token: format!("{:?}", record.token),
                existing: existing.path.clone(),
            });
        }

        debug!(
            "Registered watch {:?} at depth {} on {}",
            record.token,
            record.depth,
            record.path.display()
        );
        self.path_index
            .insert(record.path.clone(), record.token.clone());
        self.records.insert(record.token.clone(), record);
        Ok(())
    }

    /// Remove and return the record for `token`, if any.
    pub fn remove_by_token(&mut self, token: &T) -> Option<WatchRecord<T>> {
        let record = self.records.remove(token)?;

        // A later record may have claimed the same path; only drop our entry.
        if self.path_index.get(&record.path) == Some(token) {
            self.path_index.remove(&record.path);
        }

        Some(record)
    }

    /// Look up a record by token.
    pub fn find_by_token(&self, token: &T) -> Option<&WatchRecord<T>> {
        self.records.get(token)
    }

    /// Look up a record by watched path.
    pub fn find_by_path(&self, path: &Path) -> Option<&WatchRecord<T>> {
        self.path_index
            .get(path)
            .and_then(|token| self.records.get(token))
    }

    /// Whether no watches remain.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of active watches.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Iterate over all records.
    pub fn iter(&self) -> impl Iterator<Item = &WatchRecord<T>> {
        self.records.values()
    }

    /// Remove every record, returning them.
    pub fn drain(&mut self) -> Vec<WatchRecord<T>> {
        self.path_index.clear();
        self.records.drain().map(|(_, record)| record).collect()
    }

    /// Log every active watch at debug level.
    pub fn dump(&self) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }

        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));

        debug!("Watch list ({} entries):", records.len());
        for record in records {
            debug!(
                "  {:?} depth={} {}",
                record.token,
                record.depth,
                record.path.display()
            );
        }
    }
}

impl<T> Default for WatchRegistry<T>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
