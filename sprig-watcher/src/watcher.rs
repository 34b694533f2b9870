//! File watcher for tracked source files.
//!
//! Each tracked file is watched on its own. A file whose `auto` setting
//! is `false` stays watched but its changes are not reported.

use notify::{Event, RecursiveMode, Watcher};
use sprig_core::{FileRecord, FileWatch};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Setting key that switches automatic compilation on change.
const AUTO_SETTING: &str = "auto";

/// Type of file change detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            Self::Modified(path) | Self::Deleted(path) => path,
        }
    }
}

/// Watches tracked files for changes.
pub struct FileWatcher {
    watcher: notify::RecommendedWatcher,
    receiver: Receiver<FileChange>,
    /// Watched paths and whether their changes are reported.
    tracked: HashMap<PathBuf, bool>,
}

impl FileWatcher {
    /// Creates a watcher with nothing tracked yet.
    pub fn new() -> Result<Self, notify::Error> {
        let (tx, rx) = channel();

        let watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    for path in event.paths {
                        let change = match event.kind {
                            notify::EventKind::Create(_) | notify::EventKind::Modify(_) => {
                                debug!("File modified: {}", path.display());
                                Some(FileChange::Modified(path))
                            }
                            notify::EventKind::Remove(_) => {
                                debug!("File deleted: {}", path.display());
                                Some(FileChange::Deleted(path))
                            }
                            _ => None,
                        };

                        if let Some(change) = change {
                            if tx.send(change).is_err() {
                                warn!("Failed to send file change event");
                            }
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })?;

        Ok(Self {
            watcher,
            receiver: rx,
            tracked: HashMap::new(),
        })
    }

    /// Number of files currently watched.
    pub fn watched(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.tracked.contains_key(path)
    }

    /// Polls for file changes.
    ///
    /// Returns immediately with any pending changes to files that have
    /// automatic compilation enabled.
    pub fn poll(&self) -> Vec<FileChange> {
        self.receiver
            .try_iter()
            .filter(|change| self.reports(change))
            .collect()
    }

    /// Waits for the next reported change with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FileChange> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let change = self.receiver.recv_timeout(remaining).ok()?;
            if self.reports(&change) {
                return Some(change);
            }
        }
    }

    fn reports(&self, change: &FileChange) -> bool {
        self.tracked.get(change.path()).copied().unwrap_or(false)
    }
}

fn auto_compile(file: &FileRecord) -> bool {
    file.settings
        .get(AUTO_SETTING)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true)
}

impl FileWatch for FileWatcher {
    fn update(&mut self, file: &FileRecord) {
        let auto = auto_compile(file);
        if let Some(flag) = self.tracked.get_mut(Path::new(&file.src)) {
            debug!("Auto compile for {}: {}", file.src, auto);
            *flag = auto;
            return;
        }
        self.add(std::slice::from_ref(file));
    }

    fn remove(&mut self, paths: &[String]) {
        for src in paths {
            let path = PathBuf::from(src);
            if self.tracked.remove(&path).is_none() {
                continue;
            }
            // The watch is already gone if the file was deleted.
            if let Err(e) = self.watcher.unwatch(&path) {
                debug!("Unwatch {}: {}", path.display(), e);
            }
        }
    }

    fn add(&mut self, files: &[FileRecord]) {
        let mut added = 0;
        for file in files {
            let path = PathBuf::from(&file.src);
            if self.tracked.contains_key(&path) {
                continue;
            }
            if let Err(e) = self.watcher.watch(&path, RecursiveMode::NonRecursive) {
                warn!("Failed to watch {}: {}", path.display(), e);
                continue;
            }
            self.tracked.insert(path, auto_compile(file));
            added += 1;
        }
        info!("Watching {} new files ({} total)", added, self.tracked.len());
    }
}
