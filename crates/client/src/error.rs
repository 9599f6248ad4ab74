//! Error taxonomy for the client SDK
//!
//! Three classes, matching how the pipeline reacts to them:
//!
//! - [`Error::Validation`] - field-level misuse. Deterministic, surfaced
//!   synchronously to the caller, never retried and never requeued.
//! - [`Error::Network`] - connect or write failure. Retryable; the
//!   failed batch goes back to the head of its accumulator.
//! - [`Error::Timeout`] - a caller deadline or cancellation fired.
//!   Records already enqueued stay enqueued; an in-flight flush is
//!   abandoned.

use thiserror::Error;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client SDK
#[derive(Debug, Error)]
pub enum Error {
    /// Field-level misuse (invalid credential, invalid record, record
    /// too large, closed client)
    #[error("{field}: {message}")]
    Validation {
        /// Field or subject the validation applies to
        field: String,
        /// What went wrong
        message: String,
    },

    /// Connect failure, write failure, or write timeout
    #[error("{operation} failed: {message}")]
    Network {
        /// Operation that failed (e.g. "connect", "send")
        operation: String,
        /// Underlying failure description
        message: String,
    },

    /// Caller deadline expired or cancellation fired
    #[error("{operation} timed out")]
    Timeout {
        /// Operation that was abandoned
        operation: String,
    },
}

impl Error {
    /// Create a validation error
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub(crate) fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub(crate) fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// True for field-level misuse that will fail identically on retry
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// True for transport failures worth retrying
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// True when a deadline or cancellation cut the operation short
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
