//! # Tree Watcher
//!
//! This crate watches a directory tree for entries being created or deleted,
//! down to a bounded depth, and extends its coverage as new subdirectories
//! appear.
//!
//! ## Features
//!
//! - **Depth-bounded watching**: one watch per directory, never deeper than
//!   the configured limit
//! - **Reactive installation**: new subdirectories get watches as soon as
//!   their creation is reported
//! - **Self-cleaning**: removed directories retire their watch; the loop ends
//!   when nothing is left to watch
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Tree Watcher                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  NotificationSource ──► Dispatcher ──► EventSink                │
//! │          ▲                 │    │                               │
//! │          │                 ▼    ▼                               │
//! │          └──────── TreeInstaller ──► WatchRegistry              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod installer;
pub mod registry;
pub mod source;

pub use config::WatchConfig;
pub use dispatcher::{DispatchStats, Dispatcher, DispatcherState};
pub use error::{Result, WatcherError};
pub use event::{ChangeClass, EventSink, RawChange, WatchEvent, WatchEventKind};
pub use installer::{InstallStats, TreeInstaller};
pub use registry::{WatchRecord, WatchRegistry};
#[cfg(target_os = "linux")]
pub use source::InotifySource;
pub use source::{NotificationSource, ScriptedSource};
