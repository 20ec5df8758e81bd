//! Error types for ihpp
//!
//! All modules use `IhppResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ihpp operations
pub type IhppResult<T> = Result<T, IhppError>;

/// All errors that can occur in ihpp
#[derive(Error, Debug)]
pub enum IhppError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Durable store errors
    #[error("Response store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Response store error: {0}")]
    Store(#[from] rusqlite::Error),

    // Live transport errors
    #[error("Live transport error: {0}")]
    Transport(String),

    #[error("Live transport closed")]
    TransportClosed,

    // Execute-request errors
    #[error("Request failed: {0}")]
    Execute(String),

    #[error("Request failed with status {status}: {message}")]
    ExecuteStatus { status: u16, message: String },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("No cached response for {0}")]
    ResponseNotFound(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl IhppError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error from anything displayable
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::TransportClosed | Self::StoreUnavailable(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Transport(_) | Self::TransportClosed => {
                Some("Check that the ihpp server is running and server.api_url is correct")
            }
            Self::StoreUnavailable(_) => Some("Check permissions on cache.store_path"),
            Self::ResponseNotFound(_) => Some("Run: ihpp send <METHOD> <URL>"),
            Self::InvalidHeader(_) => Some("Headers use the form 'Key: Value'"),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for IhppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {}", err))
    }
}
