//! Directory walking.
//!
//! Collects every file below a project root. Directories are descended
//! into but never returned. Nothing is filtered here.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Options for walking a project directory.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Follow symbolic links when walking directories. Link cycles
    /// fail the walk.
    pub follow_symlinks: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
        }
    }
}

/// Returns every file under `root`, at any depth.
///
/// Any directory that can't be listed, including `root` itself, fails
/// the whole walk.
pub fn walk_directory(root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(options.follow_symlinks);

    for entry in walker {
        let entry = entry.map_err(|e| Error::walk(root, e))?;
        if entry.file_type().is_dir() {
            continue;
        }
        // Unfollowed links to directories are still directories.
        if entry.path_is_symlink() && entry.path().is_dir() {
            continue;
        }
        files.push(entry.into_path());
    }

    debug!("Walked {}: {} files", root.display(), files.len());

    Ok(files)
}
