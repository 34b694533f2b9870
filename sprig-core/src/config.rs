//! Application configuration.
//!
//! Read once at startup from a JSON file. A missing file means defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Settings that shape discovery and filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Allowed extensions, with the leading dot. Matched as substrings.
    pub extensions: Vec<String>,

    /// File name substrings that exclude a file.
    pub filter: Vec<String>,

    /// Apply the filter when building records during add/refresh.
    /// Off by default: every walked file becomes a record.
    pub filter_on_discovery: bool,

    /// Follow symbolic links when walking project directories.
    pub follow_symlinks: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extensions: vec![
                ".less".into(),
                ".sass".into(),
                ".scss".into(),
                ".coffee".into(),
            ],
            filter: vec!["~".into(), ".DS_Store".into()],
            filter_on_discovery: false,
            follow_symlinks: true,
        }
    }
}

impl AppConfig {
    /// Loads the config, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| Error::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Writes the default config, creating parent directories.
    pub fn write_default(path: &Path) -> Result<Self> {
        let config = Self::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&config).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, json)?;
        Ok(config)
    }
}
