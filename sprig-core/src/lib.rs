//! Sprig Core - project tracking and directory reconciliation
//!
//! Sprig keeps a set of source directories ("projects") and the
//! compilable files inside them. This crate holds the data model and the
//! logic that keeps that state in line with the filesystem:
//! - Walking project directories
//! - Filtering by extension and ignore rules
//! - Deriving default output paths
//! - Reconciling tracked files against fresh walks
//!
//! Persistence, watching and user notification are collaborators
//! described by the traits in [`collab`].
//!
//! # Example
//!
//! ```no_run
//! use sprig_core::default_output;
//! use std::path::Path;
//!
//! let css = default_output(Path::new("/site/style.less"));
//! assert_eq!(css.as_deref(), Some("/site/style.css"));
//! ```

pub mod collab;
pub mod config;
pub mod error;
pub mod filter;
pub mod manager;
pub mod model;
pub mod walker;

pub use collab::{FileWatch, Notifier, ProjectStore};
pub use config::AppConfig;
pub use error::{Error, Result, StoreError};
pub use filter::PathFilter;
pub use manager::{ProjectManager, Refresh, StatusReport};
pub use model::{default_output, FileMap, FileRecord, Project, ProjectId, ProjectSet};
pub use walker::{walk_directory, WalkOptions};
