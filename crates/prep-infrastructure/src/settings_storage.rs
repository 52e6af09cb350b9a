//! Default settings file storage.
//!
//! Loads optional default coaching settings from ~/.config/prep/config.toml.
//! The file is entirely optional: a missing file means built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use prep_core::config::CoachSettings;
use prep_core::{PrepError, Result};

/// Read-only storage for the optional config.toml defaults file.
pub struct SettingsStorage {
    path: PathBuf,
}

impl SettingsStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads settings from the config file.
    ///
    /// Returns `None` when the file doesn't exist; a file that exists but
    /// fails to parse is a configuration error, not a silent fallback.
    pub fn load(&self) -> Result<Option<CoachSettings>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let settings = toml::from_str(&content)
            .map_err(|e| PrepError::config(format!("invalid config.toml: {e}")))?;
        Ok(Some(settings))
    }
}
