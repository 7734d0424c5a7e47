//! Event dispatch loop.
//!
//! The dispatcher owns the notification source and the watch registry. It
//! reads one batch at a time, reconciles every record with the registry and
//! stops once no watches remain.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::error::{Result, WatcherError};
use crate::event::{ChangeClass, EventSink, RawChange, WatchEvent, WatchEventKind};
use crate::installer::{InstallStats, TreeInstaller};
use crate::registry::WatchRegistry;
use crate::source::NotificationSource;

/// Lifecycle state of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// At least one watch is active.
    Running,

    /// No watches remain; the loop has exited.
    Terminated,
}

/// Counters describing what the dispatcher has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Batches read from the source.
    pub batches: usize,

    /// Records processed.
    pub records: usize,

    /// Records that referenced an unknown token or reported an overflow.
    pub anomalies: usize,

    /// Watches installed, including the initial tree.
    pub installed: usize,

    /// Directories that could not be watched.
    pub failed: usize,

    /// Watches retired after their directory was removed.
    pub removed: usize,
}

/// Reconciles a stream of change records with the set of active watches.
pub struct Dispatcher<S: NotificationSource> {
    /// Notification source.
    source: S,

    /// Active watches.
    registry: WatchRegistry<S::Token>,

    /// Installer shared by startup and directory creation.
    installer: TreeInstaller,

    /// Current state.
    state: DispatcherState,

    /// Running counters.
    stats: DispatchStats,
}

impl<S: NotificationSource> Dispatcher<S> {
    /// Create a dispatcher over an opened source. No watches are installed
    /// until [`start`](Self::start) is called.
    pub fn new(source: S, config: &WatchConfig) -> Self {
        Self {
            source,
            registry: WatchRegistry::new(),
            installer: TreeInstaller::from_config(config),
            state: DispatcherState::Terminated,
            stats: DispatchStats::default(),
        }
    }

    /// Install watches on `root` and everything below it within the depth
    /// limit.
    pub fn start(&mut self, root: &Path) -> Result<InstallStats> {
        let stats = self
            .installer
            .install(&mut self.source, &mut self.registry, root, 0);
        self.stats.installed += stats.installed;
        self.stats.failed += stats.failed;

        if self.registry.find_by_path(root).is_none() {
            return Err(WatcherError::RootNotWatched(root.to_path_buf()));
        }

        self.state = DispatcherState::Running;
        info!(
            "Watching {} directories under {} (depth limit {})",
            self.registry.len(),
            root.display(),
            self.installer.depth_limit()
        );
        Ok(stats)
    }

    /// Read and dispatch batches until no watches remain.
    ///
    /// Read errors are fatal and returned immediately.
    pub fn run(&mut self, sink: &mut impl EventSink) -> Result<DispatchStats> {
        while self.state == DispatcherState::Running {
            self.step(sink)?;
        }

        info!("No directories left to watch, stopping");
        Ok(self.stats)
    }

    /// Read one batch, dispatch every record in it and re-evaluate the
    /// termination condition.
    pub fn step(&mut self, sink: &mut impl EventSink) -> Result<DispatcherState> {
        if self.state == DispatcherState::Terminated {
            return Ok(self.state);
        }

        let batch = self.source.read_batch().map_err(WatcherError::Read)?;
        self.stats.batches += 1;
        self.process_batch(batch, sink);
        Ok(self.state)
    }

    /// Dispatch an already-read batch.
    pub fn process_batch(
        &mut self,
        batch: Vec<RawChange<S::Token>>,
        sink: &mut impl EventSink,
    ) {
        for change in batch {
            self.stats.records += 1;
            self.dispatch(change, sink);
        }

        if self.registry.is_empty() {
            self.state = DispatcherState::Terminated;
        }
    }

    fn dispatch(&mut self, change: RawChange<S::Token>, sink: &mut impl EventSink) {
        match change.class {
            ChangeClass::Retired => return,
            ChangeClass::Overflow => {
                warn!("Notification queue overflowed, events were lost");
                self.stats.anomalies += 1;
                return;
            }
            _ => {}
        }

        let Some(record) = self.registry.find_by_token(&change.token) else {
            warn!("Unknown watch token {:?}", change.token);
            self.stats.anomalies += 1;
            return;
        };

        if let Some(name) = change.child_name() {
            let child_path = record.path.join(name);
            let child_depth = record.depth + 1;

            match (change.class, change.is_dir) {
                (ChangeClass::Created, true) => {
                    let stats = self.installer.install(
                        &mut self.source,
                        &mut self.registry,
                        &child_path,
                        child_depth,
                    );
                    self.stats.installed += stats.installed;
                    self.stats.failed += stats.failed;
                    sink.report(WatchEvent::new(WatchEventKind::DirectoryCreated, child_path));
                    self.registry.dump();
                }
                (ChangeClass::Created, false) => {
                    sink.report(WatchEvent::new(WatchEventKind::FileCreated, child_path));
                }
                (ChangeClass::Deleted, true) => {
                    sink.report(WatchEvent::new(WatchEventKind::DirectoryDeleted, child_path));
                }
                (ChangeClass::Deleted, false) => {
                    sink.report(WatchEvent::new(WatchEventKind::FileDeleted, child_path));
                }
                _ => debug!("Ignoring {:?} on {}", change.class, child_path.display()),
            }
        } else if change.class == ChangeClass::SelfDeleted {
            self.retire(&change.token, sink);
        }
    }

    fn retire(&mut self, token: &S::Token, sink: &mut impl EventSink) {
        let Some(record) = self.registry.remove_by_token(token) else {
            warn!("Self-deletion for unknown watch token {token:?}");
            self.stats.anomalies += 1;
            return;
        };

        // The kernel has usually retired the watch already.
        if let Err(e) = self.source.remove_watch(token) {
            debug!("Removing watch on {}: {e}", record.path.display());
        }

        self.stats.removed += 1;
        sink.report(WatchEvent::new(WatchEventKind::WatchRemoved, record.path));
    }

    /// Remove every remaining watch and hand back the source.
    pub fn shutdown(mut self) -> S {
        for record in self.registry.drain() {
            if let Err(e) = self.source.remove_watch(&record.token) {
                debug!("Removing watch on {}: {e}", record.path.display());
            }
        }
        self.state = DispatcherState::Terminated;
        self.source
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn registry(&self) -> &WatchRegistry<S::Token> {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
