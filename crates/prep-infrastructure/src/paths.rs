//! Unified path management for prep configuration files.
//!
//! All prep configuration, secrets, and log data live under the platform
//! config directory. Centralizing resolution here keeps every storage
//! component pointed at the same tree.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for prep.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/prep/              # Config directory
/// ├── config.toml              # Default coaching settings (optional)
/// ├── secret.json              # API credential
/// ├── turns.jsonl              # Persisted turn log
/// └── logs/                    # Structured event log
///     └── app_YYYYMMDD.jsonl
/// ```
pub struct PrepPaths;

impl PrepPaths {
    /// Returns the prep configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/prep/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("prep"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }

    /// Returns the path to the persisted turn log.
    pub fn turn_log_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("turns.jsonl"))
    }
}
