//! Project and file records.
//!
//! A `Project` is a tracked source directory. Each file inside it gets a
//! `FileRecord` keyed by its absolute path, which is also the record id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Maps a source extension to the extension of its compiled output.
const OUTPUT_SUFFIXES: &[(&str, &str)] = &[
    ("less", "css"),
    ("sass", "css"),
    ("scss", "css"),
    ("coffee", "js"),
];

/// Every tracked project, keyed by id.
pub type ProjectSet = BTreeMap<ProjectId, Project>;

/// Files of one project, keyed by absolute source path.
pub type FileMap = BTreeMap<String, FileRecord>;

/// Opaque unique project identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked source directory and the files found in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,

    /// Last path segment of `src`.
    pub name: String,

    /// Absolute directory path. Unique among projects.
    pub src: String,

    #[serde(default)]
    pub files: FileMap,
}

impl Project {
    /// Creates a project with a fresh id, naming it after the directory.
    pub fn new(src: &Path, files: FileMap) -> Self {
        let src_str = path_string(src);
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| src_str.clone());

        Self {
            id: ProjectId::new(),
            name,
            src: src_str,
            files,
        }
    }
}

/// Metadata for one source file inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Same as `src`; used as the key in [`FileMap`].
    pub id: String,

    /// Extension without the leading dot.
    #[serde(rename = "type")]
    pub kind: String,

    /// Base file name.
    pub name: String,

    pub src: String,

    /// Compiled output path. `None` when the extension has no mapping.
    #[serde(default)]
    pub output: Option<String>,

    /// Per-file compile settings, opaque to the manager.
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl FileRecord {
    /// Builds a record for a discovered file.
    pub fn from_path(path: &Path) -> Self {
        let src = path_string(path);

        Self {
            id: src.clone(),
            kind: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            output: default_output(path),
            src,
            settings: BTreeMap::new(),
        }
    }

    /// Builder pattern: set the output path.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Builder pattern: set one setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

/// Computes the default compiled output for a source path.
///
/// Only the terminal extension is replaced, so directories whose names
/// look like source files are left alone.
pub fn default_output(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    let (_, target) = OUTPUT_SUFFIXES
        .iter()
        .find(|(source, _)| *source == extension)?;

    Some(path_string(&path.with_extension(target)))
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
