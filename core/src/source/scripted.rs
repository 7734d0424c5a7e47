//! In-memory source that replays queued batches.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::NotificationSource;
use crate::event::{ChangeClass, RawChange};

/// A notification source driven by the caller.
///
/// Watches are validated against the real filesystem (following symlinks)
/// and deduplicated by canonical path, so two paths reaching the same
/// directory share a token. Batches are replayed in the order they were
/// queued; once the script runs out `read_batch` fails with
/// [`io::ErrorKind::UnexpectedEof`].
#[derive(Debug, Default)]
pub struct ScriptedSource {
    next_token: u32,
    watches: HashMap<u32, PathBuf>,
    by_canonical: HashMap<PathBuf, u32>,
    denied: HashSet<PathBuf>,
    batches: VecDeque<Vec<RawChange<u32>>>,
    retired: Vec<RawChange<u32>>,
    reads: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `add_watch` fail with permission denied for `path`.
    pub fn deny(&mut self, path: impl Into<PathBuf>) {
        self.denied.insert(path.into());
    }

    /// Queue a batch for a later read.
    pub fn push_batch(&mut self, batch: Vec<RawChange<u32>>) {
        self.batches.push_back(batch);
    }

    /// Number of queued batches not yet read.
    pub fn remaining_batches(&self) -> usize {
        self.batches.len()
    }

    /// Number of successful reads so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of watches the source still holds.
    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }

    /// Token currently watching `path`, if any.
    pub fn token_for(&self, path: &Path) -> Option<u32> {
        let canonical = fs::canonicalize(path).ok()?;
        self.by_canonical.get(&canonical).copied()
    }
}

impl NotificationSource for ScriptedSource {
    type Token = u32;

    fn add_watch(&mut self, path: &Path) -> io::Result<u32> {
        if self.denied.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }

        if !fs::metadata(path)?.is_dir() {
            return Err(io::Error::from(io::ErrorKind::NotADirectory));
        }

        let canonical = fs::canonicalize(path)?;
        if let Some(token) = self.by_canonical.get(&canonical) {
            return Ok(*token);
        }

        self.next_token += 1;
        let token = self.next_token;
        self.watches.insert(token, canonical.clone());
        self.by_canonical.insert(canonical, token);
        Ok(token)
    }

    fn remove_watch(&mut self, token: &u32) -> io::Result<()> {
        let canonical = self
            .watches
            .remove(token)
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
        self.by_canonical.remove(&canonical);
        self.retired
            .push(RawChange::on_self(*token, ChangeClass::Retired));
        Ok(())
    }

    fn read_batch(&mut self) -> io::Result<Vec<RawChange<u32>>> {
        let mut batch = std::mem::take(&mut self.retired);
        match self.batches.pop_front() {
            Some(queued) => batch.extend(queued),
            None if batch.is_empty() => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "scripted source exhausted",
                ));
            }
            None => {}
        }

        self.reads += 1;
        Ok(batch)
    }
}
