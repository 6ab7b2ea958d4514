//! Error types for the address sync core.
//!
//! This module provides the error hierarchy for the synchronization
//! lifecycle: configuration loading, broker interaction, and the
//! reconciliation cycle itself.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the address sync core.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Broker interaction errors.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
    },
}

/// Broker interaction errors.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker rejected a management request.
    #[error("Broker request failed: {message}")]
    RequestFailed {
        /// Error message reported by the broker.
        message: String,
    },

    /// The broker connection is unavailable.
    #[error("Broker connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// The capacity query returned no usable value.
    #[error("Capacity query failed: {message}")]
    CapacityUnavailable {
        /// Description of the capacity failure.
        message: String,
    },
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Broker(
                BrokerError::ConnectionError { .. } | BrokerError::RequestFailed { .. }
            )
        )
    }
}

impl BrokerError {
    /// Creates a request failure with the given message.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::RequestFailed {
            message: message.into(),
        }
    }

    /// Creates a connection error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }
}
