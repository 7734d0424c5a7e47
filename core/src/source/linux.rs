//! Linux inotify backend.

use std::io;
use std::path::Path;

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use tracing::debug;

use super::NotificationSource;
use crate::error::{Result, WatcherError};
use crate::event::{ChangeClass, RawChange};

/// Notification source backed by an inotify instance.
pub struct InotifySource {
    inotify: Inotify,
    buffer: Vec<u8>,
}

impl InotifySource {
    /// Open a new inotify instance reading with a buffer of `buffer_size` bytes.
    pub fn open(buffer_size: usize) -> Result<Self> {
        let inotify = Inotify::init().map_err(WatcherError::SourceInit)?;
        debug!("Opened inotify instance (buffer {buffer_size} bytes)");

        Ok(Self {
            inotify,
            buffer: vec![0; buffer_size],
        })
    }

    /// Close the inotify instance, dropping every remaining watch.
    pub fn close(self) -> Result<()> {
        self.inotify.close()?;
        Ok(())
    }

    fn watch_mask() -> WatchMask {
        WatchMask::CREATE | WatchMask::DELETE | WatchMask::DELETE_SELF | WatchMask::ONLYDIR
    }
}

fn classify(mask: EventMask) -> ChangeClass {
    if mask.contains(EventMask::Q_OVERFLOW) {
        ChangeClass::Overflow
    } else if mask.contains(EventMask::IGNORED) {
        ChangeClass::Retired
    } else if mask.contains(EventMask::CREATE) {
        ChangeClass::Created
    } else if mask.contains(EventMask::DELETE) {
        ChangeClass::Deleted
    } else if mask.contains(EventMask::DELETE_SELF) {
        ChangeClass::SelfDeleted
    } else {
        ChangeClass::Other
    }
}

impl NotificationSource for InotifySource {
    type Token = WatchDescriptor;

    fn add_watch(&mut self, path: &Path) -> io::Result<WatchDescriptor> {
        self.inotify.watches().add(path, Self::watch_mask())
    }

    fn remove_watch(&mut self, token: &WatchDescriptor) -> io::Result<()> {
        self.inotify.watches().remove(token.clone())
    }

    fn read_batch(&mut self) -> io::Result<Vec<RawChange<WatchDescriptor>>> {
        let events = self.inotify.read_events_blocking(&mut self.buffer)?;

        Ok(events
            .map(|event| RawChange {
                token: event.wd,
                class: classify(event.mask),
                is_dir: event.mask.contains(EventMask::ISDIR),
                name: event.name.map(ToOwned::to_owned),
            })
            .collect())
    }
}
