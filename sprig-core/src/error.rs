//! Error types for project tracking.
//!
//! Duplicate projects are not an error here: `add_project` reports them
//! through the notifier and returns `Ok(None)`.

use crate::model::ProjectId;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for project manager operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Things that can go wrong while tracking projects.
#[derive(Error, Debug)]
pub enum Error {
    /// A directory under a project root couldn't be listed.
    #[error("failed to walk '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// No project with this id is tracked.
    #[error("project '{0}' not found")]
    ProjectNotFound(ProjectId),

    /// The persistence layer failed. Not retried.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration file exists but couldn't be used.
    #[error("invalid config '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a walk error with the root path for context.
    pub fn walk(path: impl Into<PathBuf>, source: walkdir::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by a [`ProjectStore`](crate::ProjectStore) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("project store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid project store payload: {0}")]
    Invalid(String),
}
