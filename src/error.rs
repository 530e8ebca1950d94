//! Scanner Errors
//!
//! Lookups that miss are `NotFound` and drive create-vs-patch branching.
//! Anything an AWS call reports back is `Api` and is fatal to the account
//! being processed, never to the whole run.

use thiserror::Error;

/// Errors raised by readers, actions and tasks
#[derive(Debug, Error)]
pub enum ScannerError {
    /// A role, policy, log group or other resource does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// An AWS API call failed
    #[error("{service} {operation} failed: {message}")]
    Api {
        service: &'static str,
        operation: &'static str,
        message: String,
    },

    /// Policy configuration is missing or malformed
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A result could not be turned into report JSON
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScannerError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn api(service: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScannerError>;
