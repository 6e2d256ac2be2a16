//! File-system host adapter
//!
//! Uses `notify` to watch directories and turns its events into raw host
//! notifications: creates, modifications and removals become
//! fsCreate/fsChange/fsDelete, and a rename with both paths known becomes
//! a single-item rename batch.

use eyre::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use url::Url;

use crate::host::{RawNotification, RenamedFile};

/// Keeps the underlying watcher alive; dropping it stops watching
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    paths: Vec<PathBuf>,
}

impl FsWatcher {
    /// Watch `paths` recursively, calling `on_event` from the watcher thread
    pub fn new<F>(paths: &[PathBuf], on_event: F) -> Result<Self>
    where
        F: Fn(notify::Result<Event>) + Send + 'static,
    {
        let mut watcher = notify::recommended_watcher(on_event).context("Failed to create file watcher")?;

        let mut watched = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path
                .canonicalize()
                .context(format!("Cannot watch {}", path.display()))?;
            watcher
                .watch(&path, RecursiveMode::Recursive)
                .context(format!("Cannot watch {}", path.display()))?;
            log::info!("Watching: {}", path.display());
            watched.push(path);
        }

        Ok(Self {
            _watcher: watcher,
            paths: watched,
        })
    }

    /// Watch a single file (non-recursively, through its parent directory)
    pub fn file<F>(file: &Path, on_event: F) -> Result<Self>
    where
        F: Fn(notify::Result<Event>) + Send + 'static,
    {
        let file = file.canonicalize().context(format!("Cannot watch {}", file.display()))?;
        let parent = file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| eyre::eyre!("{} has no parent directory", file.display()))?;

        let mut watcher = notify::recommended_watcher(on_event).context("Failed to create file watcher")?;
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .context(format!("Cannot watch {}", parent.display()))?;

        Ok(Self {
            _watcher: watcher,
            paths: vec![file],
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Whether a watcher event touches `path`
pub fn touches(event: &Event, path: &Path) -> bool {
    !matches!(event.kind, EventKind::Access(_)) && event.paths.iter().any(|p| p == path)
}

/// Translate one watcher event into raw notifications
pub fn translate(event: &Event) -> Vec<RawNotification> {
    match event.kind {
        EventKind::Create(_) => uris(&event.paths)
            .into_iter()
            .map(|uri| RawNotification::FsCreated { uri })
            .collect(),
        EventKind::Remove(_) => uris(&event.paths)
            .into_iter()
            .map(|uri| RawNotification::FsDeleted { uri })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match uris(&event.paths).as_slice() {
            [old_uri, new_uri] => vec![RawNotification::FilesRenamed {
                files: vec![RenamedFile {
                    old_uri: old_uri.clone(),
                    new_uri: new_uri.clone(),
                }],
            }],
            _ => Vec::new(),
        },
        // One half of a rename: the source side is gone, the target side appeared
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => uris(&event.paths)
            .into_iter()
            .map(|uri| RawNotification::FsDeleted { uri })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => uris(&event.paths)
            .into_iter()
            .map(|uri| RawNotification::FsCreated { uri })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => uris(&event.paths)
            .into_iter()
            .map(|uri| RawNotification::FsChanged { uri })
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn uris(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| Url::from_file_path(p).ok())
        .map(|u| u.to_string())
        .collect()
}
