//! Collaborators consulted by the project manager.
//!
//! Persistence, file watching and user notification live outside this
//! crate. The manager only needs the contracts below.

use crate::error::StoreError;
use crate::model::{FileRecord, Project, ProjectId, ProjectSet};

/// Persists project records.
pub trait ProjectStore {
    /// Loads every stored project. Called once at startup.
    fn load(&mut self) -> Result<ProjectSet, StoreError>;

    /// Stores a newly created project.
    fn save_project(&mut self, project: &Project) -> Result<(), StoreError>;

    /// Removes a project. Unknown ids are a no-op.
    fn delete_project(&mut self, id: &ProjectId) -> Result<(), StoreError>;

    /// Persists the full in-memory state. Must be idempotent.
    fn flush(&mut self, projects: &ProjectSet) -> Result<(), StoreError>;
}

/// Live monitoring of tracked files. Failures are the watcher's concern.
pub trait FileWatch {
    /// A file's settings changed and its watch/compile mode may differ.
    fn update(&mut self, file: &FileRecord);

    /// Stop watching these source paths.
    fn remove(&mut self, paths: &[String]);

    /// Start watching these files.
    fn add(&mut self, files: &[FileRecord]);
}

/// User-facing, fire-and-forget messages.
pub trait Notifier {
    fn alert(&self, message: &str);
}
