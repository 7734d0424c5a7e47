//! Notification sources.
//!
//! A source hands out one token per watched directory and delivers batches
//! of [`RawChange`] records tagged with those tokens. Opening a source is its
//! constructor; dropping it closes it.

use std::fmt;
use std::hash::Hash;
use std::io;
use std::path::Path;

use crate::event::RawChange;

#[cfg(target_os = "linux")]
mod linux;
mod scripted;

#[cfg(target_os = "linux")]
pub use linux::InotifySource;
pub use scripted::ScriptedSource;

/// A per-directory change notification facility.
///
/// Watches cover entry creation, entry deletion and deletion of the watched
/// directory itself.
pub trait NotificationSource {
    /// Opaque identifier of one watch.
    type Token: Clone + Eq + Hash + fmt::Debug;

    /// Start watching the directory at `path`.
    fn add_watch(&mut self, path: &Path) -> io::Result<Self::Token>;

    /// Stop watching. The source may still deliver a retirement record.
    fn remove_watch(&mut self, token: &Self::Token) -> io::Result<()>;

    /// Block until at least one record is available and return the batch.
    fn read_batch(&mut self) -> io::Result<Vec<RawChange<Self::Token>>>;
}
