//! Error types for Selkie
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use thiserror::Error;

/// Result type alias for Selkie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Selkie error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Child Spec Errors
    // =========================================================================
    #[error("Empty child spec list: a supervisor needs at least one child")]
    EmptyChildSpecs,

    #[error("Duplicate child ID: {id}")]
    DuplicateChildId { id: String },

    #[error("Invalid child spec: {id}, reason: {reason}")]
    InvalidChildSpec { id: String, reason: String },

    // =========================================================================
    // Supervisor Errors
    // =========================================================================
    #[error("Invalid supervisor options: {field}, reason: {reason}")]
    InvalidSupervisorOptions { field: String, reason: String },

    #[error("Child not found: {id}")]
    ChildNotFound { id: String },

    #[error("Child already running: {id}")]
    ChildAlreadyRunning { id: String },

    #[error("Child not running: {id}")]
    ChildNotRunning { id: String },

    // =========================================================================
    // Call Errors
    // =========================================================================
    #[error("Call timed out after {timeout_ms} ms")]
    CallTimedOut { timeout_ms: u64 },

    #[error("Call target terminated: {reason}")]
    TargetTerminated { reason: String },

    #[error("Invalid call response: {details}")]
    InvalidCallResponse { details: String },

    #[error("Mailbox disposed")]
    MailboxDisposed,

    // =========================================================================
    // Registry Errors
    // =========================================================================
    #[error("Name not registered: {name}")]
    NameNotRegistered { name: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {reason}")]
    Internal { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid child spec error
    pub fn invalid_child_spec(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidChildSpec {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid supervisor options error
    pub fn invalid_supervisor_options(
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSupervisorOptions {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a child not found error
    pub fn child_not_found(id: impl Into<String>) -> Self {
        Self::ChildNotFound { id: id.into() }
    }

    /// Create a target terminated error
    pub fn target_terminated(reason: impl Into<String>) -> Self {
        Self::TargetTerminated {
            reason: reason.into(),
        }
    }

    /// Create an invalid call response error
    pub fn invalid_call_response(details: impl Into<String>) -> Self {
        Self::InvalidCallResponse {
            details: details.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::CallTimedOut { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::child_not_found("worker-1");
        assert!(err.to_string().contains("worker-1"));
    }

    #[test]
    fn test_error_is_retriable() {
        assert!(Error::CallTimedOut { timeout_ms: 100 }.is_retriable());
        assert!(!Error::ChildNotFound { id: "w".into() }.is_retriable());
    }
}
