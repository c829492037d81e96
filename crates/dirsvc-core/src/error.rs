//! Error types for directory-service operations.
//!
//! Every fallible engine operation returns [`Result`]. A clean
//! wrong-credentials outcome is *not* an error: authentication calls report
//! it as boolean `false` and reserve [`Error`] for transport and protocol
//! faults.

use serde::Serialize;
use thiserror::Error;

/// Main error type for directory-service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A native call returned a non-success status
    #[error("Directory error in {location}: native status {code}")]
    Directory {
        /// Native status code returned by the platform
        code: i32,
        /// Originating call site
        location: &'static str,
    },

    /// A native buffer or list allocation failed
    #[error("Resource exhaustion in {location}: native status {code}")]
    ResourceExhausted {
        /// Native status code returned by the platform
        code: i32,
        /// Originating call site
        location: &'static str,
    },

    /// Malformed input rejected before any native call
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A native payload could not be decoded
    #[error("Malformed record data: {0}")]
    MalformedData(String),
}

/// Specialized result type for directory-service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error object handed to the embedding layer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorObject {
    /// Error category for programmatic handling
    pub category: &'static str,
    /// Native status code, or 0 when no native call was involved
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl Error {
    /// Shorthand for a [`Error::Directory`] carrying a native status code.
    #[must_use]
    pub const fn directory(code: i32, location: &'static str) -> Self {
        Self::Directory { code, location }
    }

    /// Returns the error category for this error type.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Directory { .. } | Self::ResourceExhausted { .. } => "directory-error",
            Self::InvalidRequest(_) | Self::ConfigError(_) | Self::MalformedData(_) => {
                "unknown-error"
            }
        }
    }

    /// Returns the native status code, or 0 when no native call was involved.
    #[must_use]
    pub const fn native_code(&self) -> i32 {
        match self {
            Self::Directory { code, .. } | Self::ResourceExhausted { code, .. } => *code,
            _ => 0,
        }
    }

    /// Converts the error into the structured object of the external
    /// interface.
    #[must_use]
    pub fn into_error_object(self) -> ErrorObject {
        ErrorObject {
            category: self.category(),
            code: self.native_code(),
            message: self.to_string(),
        }
    }
}
