//! Recursive watch installation.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::WatchConfig;
use crate::error::{Result, WatcherError};
use crate::registry::{WatchRecord, WatchRegistry};
use crate::source::NotificationSource;

/// Installs watches on a directory and its subdirectories, down to a depth
/// limit, registering each one.
#[derive(Debug, Clone)]
pub struct TreeInstaller {
    depth_limit: usize,
    follow_symlinks: bool,
    max_path_len: usize,
}

impl TreeInstaller {
    /// Create an installer with default options.
    pub fn new(depth_limit: usize) -> Self {
        Self::from_config(&WatchConfig::default().with_max_depth(depth_limit))
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            depth_limit: config.max_depth,
            follow_symlinks: config.follow_symlinks,
            max_path_len: config.max_path_len,
        }
    }

    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    /// Watch `base_path` at `current_depth` and every subdirectory within the
    /// depth limit.
    ///
    /// Failures are contained to the subtree that caused them: they are
    /// logged, counted in the returned stats, and the rest of the tree is
    /// still installed.
    pub fn install<S: NotificationSource>(
        &self,
        source: &mut S,
        registry: &mut WatchRegistry<S::Token>,
        base_path: &Path,
        current_depth: usize,
    ) -> InstallStats {
        let mut stats = InstallStats::default();
        self.install_into(source, registry, base_path, current_depth, &mut stats);
        stats
    }

    fn install_into<S: NotificationSource>(
        &self,
        source: &mut S,
        registry: &mut WatchRegistry<S::Token>,
        base_path: &Path,
        current_depth: usize,
        stats: &mut InstallStats,
    ) {
        if current_depth > self.depth_limit {
            return;
        }

        match self.watch_one(source, registry, base_path, current_depth) {
            Ok(true) => stats.installed += 1,
            Ok(false) => {
                debug!("Already watching {}", base_path.display());
                return;
            }
            Err(e) if e.is_vanished() => {
                debug!("Skipping {}: {e}", base_path.display());
                stats.skipped += 1;
                return;
            }
            Err(e) => {
                warn!("Not watching {}: {e}", base_path.display());
                stats.failed += 1;
                return;
            }
        }

        // Children would be past the limit; don't bother listing them.
        if current_depth == self.depth_limit {
            return;
        }

        let children = WalkDir::new(base_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.follow_symlinks);

        for entry in children {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Entries racing with removal, or dangling symlinks.
                    debug!("Skipping entry under {}: {e}", base_path.display());
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                self.install_into(source, registry, entry.path(), current_depth + 1, stats);
            }
        }
    }

    fn watch_one<S: NotificationSource>(
        &self,
        source: &mut S,
        registry: &mut WatchRegistry<S::Token>,
        path: &Path,
        depth: usize,
    ) -> Result<bool> {
        let len = path.as_os_str().len();
        if len > self.max_path_len {
            return Err(WatcherError::PathTooLong {
                path: path.to_path_buf(),
                len,
                max: self.max_path_len,
            });
        }

        let token = source
            .add_watch(path)
            .map_err(|e| WatcherError::from_add_watch(path, e))?;

        // A scan and a creation record can both reach a new directory.
        if registry
            .find_by_token(&token)
            .is_some_and(|existing| existing.path == path)
        {
            return Ok(false);
        }

        // The source hands back an existing token when the same directory is
        // reached through another path (e.g. a symlink); the existing record
        // keeps it.
        registry.insert(WatchRecord::new(token, depth, path))?;
        Ok(true)
    }
}

/// What a single [`TreeInstaller::install`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallStats {
    /// Watches installed and registered.
    pub installed: usize,

    /// Directories that could not be watched.
    pub failed: usize,

    /// Directories that disappeared before they could be watched.
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScriptedSource;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Build a tree where every directory has `fanout` subdirectories, `levels`
    /// levels deep, plus one plain file per directory.
    fn uniform_tree(root: &Path, levels: usize, fanout: usize) {
        fs::write(root.join("file.txt"), "x").unwrap();
        if levels == 0 {
            return;
        }
        for i in 0..fanout {
            let child = root.join(format!("d{i}"));
            fs::create_dir(&child).unwrap();
            uniform_tree(&child, levels - 1, fanout);
        }
    }

    fn depths(registry: &WatchRegistry<u32>) -> Vec<usize> {
        let mut depths: Vec<usize> = registry.iter().map(|r| r.depth).collect();
        depths.sort_unstable();
        depths
    }

    #[test]
    fn test_depth_bounds_installation() {
        let temp_dir = TempDir::new().unwrap();
        uniform_tree(temp_dir.path(), 3, 2);

        // 1 + 2 + 4 + 8 directories at depths 0..=3.
        for (limit, expected) in [(0, 1), (1, 3), (2, 7), (3, 15), (5, 15)] {
            let mut source = ScriptedSource::new();
            let mut registry = WatchRegistry::new();
            let stats =
                TreeInstaller::new(limit).install(&mut source, &mut registry, temp_dir.path(), 0);

            assert_eq!(stats.installed, expected, "limit {limit}");
            assert_eq!(registry.len(), expected, "limit {limit}");
            assert!(registry.iter().all(|r| r.depth <= limit));
        }
    }

    #[test]
    fn test_depth_matches_parent_plus_one() {
        let temp_dir = TempDir::new().unwrap();
        uniform_tree(temp_dir.path(), 2, 1);

        let mut source = ScriptedSource::new();
        let mut registry = WatchRegistry::new();
        TreeInstaller::new(2).install(&mut source, &mut registry, temp_dir.path(), 0);

        assert_eq!(depths(&registry), vec![0, 1, 2]);
        let leaf = temp_dir.path().join("d0/d0");
        assert_eq!(registry.find_by_path(&leaf).map(|r| r.depth), Some(2));
    }

    #[test]
    fn test_past_limit_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = ScriptedSource::new();
        let mut registry = WatchRegistry::new();

        let stats = TreeInstaller::new(1).install(&mut source, &mut registry, temp_dir.path(), 2);
        assert_eq!(stats, InstallStats::default());
        assert!(registry.is_empty());
        assert_eq!(source.active_watches(), 0);
    }

    #[test]
    fn test_denied_subtree_is_abandoned() {
        let temp_dir = TempDir::new().unwrap();
        uniform_tree(temp_dir.path(), 2, 2);

        let mut source = ScriptedSource::new();
        source.deny(temp_dir.path().join("d0"));
        let mut registry = WatchRegistry::new();
        let stats = TreeInstaller::new(2).install(&mut source, &mut registry, temp_dir.path(), 0);

        assert_eq!(stats.failed, 1);
        // Root, d1, d1/d0, d1/d1.
        assert_eq!(stats.installed, 4);
        assert!(registry.find_by_path(&temp_dir.path().join("d0")).is_none());
        assert!(registry.find_by_path(&temp_dir.path().join("d0/d0")).is_none());
        assert!(registry.find_by_path(&temp_dir.path().join("d1/d1")).is_some());
    }

    #[test]
    fn test_reinstall_same_path_is_quiet() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();

        let mut source = ScriptedSource::new();
        let mut registry = WatchRegistry::new();
        let installer = TreeInstaller::new(2);
        installer.install(&mut source, &mut registry, temp_dir.path(), 0);
        assert_eq!(registry.len(), 3);

        let stats = installer.install(&mut source, &mut registry, &temp_dir.path().join("a/b"), 2);
        assert_eq!(stats, InstallStats::default());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_vanished_directory_is_silent_skip() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = ScriptedSource::new();
        let mut registry = WatchRegistry::new();

        let gone = temp_dir.path().join("gone");
        let stats = TreeInstaller::new(3).install(&mut source, &mut registry, &gone, 1);

        assert_eq!(
            stats,
            InstallStats {
                installed: 0,
                failed: 0,
                skipped: 1,
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_path_too_long_is_contained() {
        let temp_dir = TempDir::new().unwrap();
        let long_name = "n".repeat(64);
        fs::create_dir(temp_dir.path().join(&long_name)).unwrap();
        fs::create_dir(temp_dir.path().join("short")).unwrap();

        let root_len = temp_dir.path().as_os_str().len();
        let config = WatchConfig::new(temp_dir.path())
            .with_max_depth(1)
            .with_max_path_len(root_len + 10);

        let mut source = ScriptedSource::new();
        let mut registry = WatchRegistry::new();
        let stats = TreeInstaller::from_config(&config).install(
            &mut source,
            &mut registry,
            temp_dir.path(),
            0,
        );

        assert_eq!(stats.installed, 2);
        assert_eq!(stats.failed, 1);
        assert!(registry.find_by_path(&temp_dir.path().join(&long_name)).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        fs::create_dir(&a).unwrap();
        std::os::unix::fs::symlink(temp_dir.path(), a.join("loop")).unwrap();

        let mut source = ScriptedSource::new();
        let mut registry = WatchRegistry::new();
        let stats = TreeInstaller::new(10).install(&mut source, &mut registry, temp_dir.path(), 0);

        // a/loop resolves to the root, which already owns that token.
        assert_eq!(stats.installed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(registry.len(), 2);
        let paths: Vec<PathBuf> = {
            let mut paths: Vec<PathBuf> = registry.iter().map(|r| r.path.clone()).collect();
            paths.sort();
            paths
        };
        assert_eq!(paths, vec![temp_dir.path().to_path_buf(), a]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed_when_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::os::unix::fs::symlink(target.path(), temp_dir.path().join("link")).unwrap();

        let config = WatchConfig::new(temp_dir.path())
            .with_max_depth(1)
            .follow_symlinks(false);

        let mut source = ScriptedSource::new();
        let mut registry = WatchRegistry::new();
        TreeInstaller::from_config(&config).install(
            &mut source,
            &mut registry,
            temp_dir.path(),
            0,
        );
        assert_eq!(registry.len(), 1);

        let mut source = ScriptedSource::new();
        let mut registry = WatchRegistry::new();
        TreeInstaller::new(1).install(&mut source, &mut registry, temp_dir.path(), 0);
        assert_eq!(registry.len(), 2);
    }
}
