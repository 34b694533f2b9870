//! JSON file store.
//!
//! The file is an object keyed by project id. A missing file is an
//! empty store.

use sprig_core::{Project, ProjectId, ProjectSet, ProjectStore, StoreError};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persists projects to a JSON file.
#[derive(Debug)]
pub struct JsonProjectStore {
    path: PathBuf,
}

impl JsonProjectStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<ProjectSet, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(ProjectSet::new()),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| StoreError::Invalid(e.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ProjectSet::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn write(&self, projects: &ProjectSet) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec_pretty(projects).map_err(|e| StoreError::Invalid(e.to_string()))?;
        write_atomic(&self.path, &payload)?;
        debug!("Wrote {} projects to {}", projects.len(), self.path.display());
        Ok(())
    }
}

impl ProjectStore for JsonProjectStore {
    fn load(&mut self) -> Result<ProjectSet, StoreError> {
        self.read()
    }

    fn save_project(&mut self, project: &Project) -> Result<(), StoreError> {
        let mut projects = self.read()?;
        projects.insert(project.id.clone(), project.clone());
        self.write(&projects)
    }

    fn delete_project(&mut self, id: &ProjectId) -> Result<(), StoreError> {
        let mut projects = self.read()?;
        if projects.remove(id).is_none() {
            return Ok(());
        }
        self.write(&projects)
    }

    fn flush(&mut self, projects: &ProjectSet) -> Result<(), StoreError> {
        self.write(projects)
    }
}

/// Writes through a temporary sibling file followed by a rename.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
