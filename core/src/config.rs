//! Configuration for a depth-bounded tree watch.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// Default upper bound on a watched path, in bytes (Linux `PATH_MAX`).
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// One inotify record carrying a maximal file name. A smaller read buffer
/// can fail on a single long name.
pub const MIN_READ_BUFFER_SIZE: usize = 16 + 255 + 1;

/// Room for 1024 inotify records carrying a maximal file name.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024 * MIN_READ_BUFFER_SIZE;

/// Configuration for a watched tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Root directory of the tree.
    pub root: PathBuf,

    /// Maximum depth below the root that receives a watch.
    pub max_depth: usize,

    /// Whether symlinked directories are descended into.
    pub follow_symlinks: bool,

    /// Longest path that will be watched.
    pub max_path_len: usize,

    /// Size of the buffer handed to each blocking read.
    pub read_buffer_size: usize,

    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl WatchConfig {
    /// Create a new config for `root`, watching only the root itself.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: WatchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Set the root directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the maximum depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set whether symbolic links to directories are followed.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the maximum watched path length.
    pub fn with_max_path_len(mut self, len: usize) -> Self {
        self.max_path_len = len;
        self
    }

    /// Set the read buffer size.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Check that the root is an existing directory and the limits are usable.
    pub fn validate(&self) -> Result<()> {
        let metadata = match fs::metadata(&self.root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WatcherError::DirectoryNotFound(self.root.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_dir() {
            return Err(WatcherError::NotADirectory(self.root.clone()));
        }

        if self.max_path_len == 0 {
            return Err(WatcherError::Config(
                "max_path_len must be greater than zero".to_string(),
            ));
        }

        if self.read_buffer_size < MIN_READ_BUFFER_SIZE {
            return Err(WatcherError::Config(format!(
                "read_buffer_size must be at least {MIN_READ_BUFFER_SIZE}, got {}",
                self.read_buffer_size
            )));
        }

        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_depth: 0,
            follow_symlinks: true,
            max_path_len: DEFAULT_MAX_PATH_LEN,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            log_filter: "info".to_string(),
        }
    }
}
