//! Error types for the prep application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire prep application.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. Remote-call failures carry
/// their classification (rate limit, auth, timeout, other) so that callers
/// can decide whether a retry is worthwhile.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum PrepError {
    /// The remote endpoint reported a rate limit.
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Server-suggested wait before retrying, in seconds, when provided.
        retry_after_secs: Option<u64>,
    },

    /// Authentication with the remote endpoint failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The remote call timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other remote failure (malformed request, server error, ...).
    #[error("Remote error: {message}")]
    Remote {
        /// HTTP status code when the failure came from an HTTP response.
        status: Option<u16>,
        message: String,
    },

    /// Structural violation of an expected data shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error (missing/invalid startup settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrepError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a RateLimited error without a server-suggested delay.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_secs: None,
        }
    }

    /// Creates an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a Timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Creates a Remote error without an HTTP status.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Classification
    // ============================================================================

    /// Check if this failure is worth retrying (rate limit or timeout).
    ///
    /// Auth failures and other remote errors are permanent: retrying them
    /// burns attempts without any chance of success.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout(_))
    }

    /// Check if this is a RateLimited error
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if this is a Timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is an Auth error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is a Config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Short, human-readable message suitable for showing to the end user.
    ///
    /// The underlying cause stays in the log; raw error text from the
    /// remote is never surfaced directly.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited { .. } => {
                "Rate limit exceeded. Please try again later.".to_string()
            }
            Self::Auth(_) => "API authentication failed. Please check your API key.".to_string(),
            Self::Timeout(_) => "Request timed out. Please try again.".to_string(),
            Self::Remote { .. } => "An error occurred while contacting the service.".to_string(),
            Self::Validation(_) => "The response could not be fully understood.".to_string(),
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            Self::Io { .. } | Self::Serialization { .. } | Self::Internal(_) => {
                "An internal error occurred.".to_string()
            }
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PrepError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PrepError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, PrepError>`.
pub type Result<T> = std::result::Result<T, PrepError>;
