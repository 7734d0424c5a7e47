//! Change records read from a notification source, and the reports the
//! dispatcher produces from them.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Classification of a raw change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeClass {
    /// An entry was created inside the watched directory.
    Created,

    /// An entry was deleted from the watched directory.
    Deleted,

    /// The watched directory itself was removed.
    SelfDeleted,

    /// The watch was retired by the source; carries no new information.
    Retired,

    /// The source dropped records because its queue overflowed.
    Overflow,

    /// Anything the dispatcher does not act on.
    Other,
}

/// One change record as delivered by a [`NotificationSource`](crate::NotificationSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange<T> {
    /// Token of the watch the record was delivered on.
    pub token: T,

    /// What happened.
    pub class: ChangeClass,

    /// Whether the subject is a directory.
    pub is_dir: bool,

    /// Entry name inside the watched directory, absent when the record
    /// describes the watched directory itself.
    pub name: Option<OsString>,
}

impl<T> RawChange<T> {
    /// A record about an entry inside the watched directory.
    pub fn child(token: T, class: ChangeClass, name: impl Into<OsString>, is_dir: bool) -> Self {
        Self {
            token,
            class,
            is_dir,
            name: Some(name.into()),
        }
    }

    /// A record about the watched directory itself.
    pub fn on_self(token: T, class: ChangeClass) -> Self {
        Self {
            token,
            class,
            is_dir: true,
            name: None,
        }
    }

    /// The child name, treating an empty name as absent.
    pub fn child_name(&self) -> Option<&OsString> {
        self.name.as_ref().filter(|name| !name.is_empty())
    }
}

/// A report produced by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    /// The kind of event.
    pub kind: WatchEventKind,

    /// Path to the affected file or directory.
    pub path: PathBuf,

    /// When the event was dispatched.
    pub timestamp: DateTime<Utc>,
}

impl WatchEvent {
    /// Create a new event stamped with the current time.
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    /// Serialize as a single JSON line.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.path.display())
    }
}

/// Kind of reported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventKind {
    /// A directory was created.
    DirectoryCreated,

    /// A file was created.
    FileCreated,

    /// A directory was deleted.
    DirectoryDeleted,

    /// A file was deleted.
    FileDeleted,

    /// A watched directory was removed and its watch dropped.
    WatchRemoved,
}

impl WatchEventKind {
    /// Human-readable prefix used in text output.
    pub fn label(self) -> &'static str {
        match self {
            Self::DirectoryCreated => "Directory created",
            Self::FileCreated => "File created",
            Self::DirectoryDeleted => "Directory deleted",
            Self::FileDeleted => "File deleted",
            Self::WatchRemoved => "Remove watch on directory",
        }
    }
}

/// Receives the reports produced while dispatching.
pub trait EventSink {
    fn report(&mut self, event: WatchEvent);
}

impl EventSink for Vec<WatchEvent> {
    fn report(&mut self, event: WatchEvent) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_rendering() {
        let event = WatchEvent::new(WatchEventKind::DirectoryCreated, "/tmp/root/a");
        assert_eq!(event.to_string(), "Directory created: /tmp/root/a");

        let event = WatchEvent::new(WatchEventKind::WatchRemoved, "/tmp/root/a");
        assert_eq!(event.to_string(), "Remove watch on directory: /tmp/root/a");
    }

    #[test]
    fn test_json_rendering() {
        let event = WatchEvent::new(WatchEventKind::FileDeleted, "/tmp/root/notes.txt");
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(value["kind"], "file_deleted");
        assert_eq!(value["path"], "/tmp/root/notes.txt");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_empty_name_is_self() {
        let change = RawChange::child(1u32, ChangeClass::Created, "", false);
        assert!(change.child_name().is_none());

        let change = RawChange::child(1u32, ChangeClass::Created, "a", true);
        assert_eq!(change.child_name(), Some(&OsString::from("a")));
    }
}
