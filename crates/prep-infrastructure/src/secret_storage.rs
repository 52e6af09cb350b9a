//! Secret configuration file storage.
//!
//! Provides secure loading of the API credential from
//! ~/.config/prep/secret.json, with environment variables as a fallback.

use std::env;
use std::fs;
use std::path::PathBuf;

use prep_core::PrepError;
use prep_core::config::{DEFAULT_MODEL, OpenAIConfig, SecretConfig};

use crate::paths::PrepPaths;

/// Below this length a credential is almost certainly truncated.
const MIN_PLAUSIBLE_KEY_LEN: usize = 20;

/// Errors that can occur during secret storage operations.
#[derive(Debug)]
pub enum SecretStorageError {
    /// Configuration file not found.
    NotFound(PathBuf),
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON parsing error.
    ParseError(serde_json::Error),
    /// Config directory not found.
    ConfigDirNotFound,
}

impl std::fmt::Display for SecretStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStorageError::NotFound(path) => {
                write!(f, "Configuration file not found at: {}", path.display())
            }
            SecretStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            SecretStorageError::ParseError(e) => write!(f, "JSON parse error: {}", e),
            SecretStorageError::ConfigDirNotFound => {
                write!(f, "Could not determine home directory")
            }
        }
    }
}

impl std::error::Error for SecretStorageError {}

impl From<std::io::Error> for SecretStorageError {
    fn from(e: std::io::Error) -> Self {
        SecretStorageError::IoError(e)
    }
}

impl From<serde_json::Error> for SecretStorageError {
    fn from(e: serde_json::Error) -> Self {
        SecretStorageError::ParseError(e)
    }
}

/// Storage for the secret configuration file (secret.json).
///
/// Responsibilities:
/// - Load secret.json from ~/.config/prep/
/// - Parse JSON into the SecretConfig domain model
/// - Resolve the effective credential (file first, environment second)
///
/// Does NOT:
/// - Write or modify existing secret files (read-only apart from the
///   first-run template)
/// - Verify credentials against the remote
///
/// # Security Note
///
/// This storage reads plaintext JSON files. The secret.json file should
/// have appropriate file permissions (e.g., 600) to prevent unauthorized
/// access. Credential values never appear in error messages.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a new SecretStorage with the default path
    /// (~/.config/prep/secret.json).
    pub fn new() -> Result<Self, SecretStorageError> {
        let path = PrepPaths::secret_file().map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Creates a new SecretStorage with a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the secret configuration from the JSON file.
    ///
    /// # Returns
    ///
    /// - `Ok(SecretConfig)`: Successfully loaded and parsed
    /// - `Err(SecretStorageError::NotFound)`: File doesn't exist
    /// - `Err(SecretStorageError::IoError)`: Failed to read file
    /// - `Err(SecretStorageError::ParseError)`: Invalid JSON format
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Resolves the effective credential for the session.
    ///
    /// Priority:
    /// 1. secret.json
    /// 2. Environment variables (OPENAI_API_KEY, OPENAI_MODEL_NAME)
    ///
    /// A missing credential is a fatal configuration error: no session may
    /// start without one. An implausibly short key only produces a warning.
    pub fn resolve_credentials(&self) -> Result<(OpenAIConfig, Vec<String>), PrepError> {
        let mut warnings = Vec::new();

        let from_file = self.load().ok().and_then(|config| config.openai);
        let credentials = match from_file {
            Some(config) if !config.api_key.is_empty() => config,
            _ => {
                let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
                    PrepError::config(
                        "API key not found in secret.json or OPENAI_API_KEY environment variable",
                    )
                })?;
                let model_name = env::var("OPENAI_MODEL_NAME").ok();
                OpenAIConfig {
                    api_key,
                    model_name,
                }
            }
        };

        if credentials.api_key.len() < MIN_PLAUSIBLE_KEY_LEN {
            warnings.push("API key seems unusually short".to_string());
        }

        Ok((credentials, warnings))
    }

    /// Ensures the secret file exists, creating it with a template if it
    /// doesn't.
    ///
    /// # Security Note
    ///
    /// Sets file permissions to 600 (user read/write only) on Unix.
    pub fn ensure_secret_file(&self) -> Result<&PathBuf, std::io::Error> {
        if self.path.exists() {
            return Ok(&self.path);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let template = SecretConfig {
            openai: Some(OpenAIConfig {
                api_key: String::new(),
                model_name: Some(DEFAULT_MODEL.to_string()),
            }),
        };
        let template_json = serde_json::to_string_pretty(&template)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        fs::write(&self.path, template_json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, permissions)?;
        }

        Ok(&self.path)
    }

    /// Returns the path to the secret file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
