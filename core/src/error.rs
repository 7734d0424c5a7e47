//! Error types for the tree watcher.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur while installing watches or dispatching events.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A watch token is already present in the registry.
    #[error("watch token {token} is already registered for {existing}")]
    DuplicateToken { token: String, existing: PathBuf },

    /// Path exceeds the configured maximum length.
    #[error("path too long ({len} > {max} bytes): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// Watch limit exceeded.
    #[error("watch limit exceeded: too many directories")]
    WatchLimitExceeded,

    /// Registering a watch failed for another reason.
    #[error("failed to add watch on {path}: {source}")]
    AddWatch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The notification source could not be opened.
    #[error("failed to open notification source: {0}")]
    SourceInit(#[source] io::Error),

    /// Reading from the notification source failed.
    #[error("failed to read notification events: {0}")]
    Read(#[source] io::Error),

    /// The root directory itself could not be watched.
    #[error("could not watch root directory: {0}")]
    RootNotWatched(PathBuf),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl WatcherError {
    /// Classify an `add_watch` failure for `path`.
    pub fn from_add_watch(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::DirectoryNotFound(path.to_path_buf()),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::StorageFull => Self::WatchLimitExceeded,
            _ => Self::AddWatch {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Whether the error means the directory vanished (or was replaced by a
    /// non-directory) before the watch could be placed.
    pub fn is_vanished(&self) -> bool {
        matches!(self, Self::DirectoryNotFound(_) | Self::NotADirectory(_))
    }
}
