//! Sprig Watcher - live monitoring of tracked files
//!
//! Implements [`sprig_core::FileWatch`] with the notify crate. The
//! manager tells it which files to watch; callers poll for changes and
//! decide what to compile.

mod watcher;

pub use watcher::{FileChange, FileWatcher};
