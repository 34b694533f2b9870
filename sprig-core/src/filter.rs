//! Source file filtering.
//!
//! Both rules are plain substring checks. An allowed extension of `.js`
//! therefore also accepts `.json` files.

use crate::config::AppConfig;
use std::path::Path;

/// Decides whether a path is a relevant source file.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    extensions: Vec<String>,
    ignore: Vec<String>,
}

impl PathFilter {
    pub fn new(extensions: Vec<String>, ignore: Vec<String>) -> Self {
        Self { extensions, ignore }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.extensions.clone(), config.filter.clone())
    }

    /// Returns true if the path passes the ignore list and the
    /// extension allow-list.
    pub fn is_valid_file(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.ignore.iter().any(|k| name.contains(k.as_str())) {
            return false;
        }

        // Dot included, empty when there is none.
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        self.extensions
            .iter()
            .any(|k| extension.contains(k.as_str()))
    }
}
