//! Error types for formainframe core operations

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use formainframe_secrets::SecretError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status line and body of a failed remote call, kept for the user notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSummary {
    /// HTTP status code.
    pub status: u16,
    /// Response body, truncated by the caller if large.
    pub body: String,
}

impl ResponseSummary {
    /// Create a summary from status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Error type for data operations, synchronization and configuration
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// No registered component or resource matches the request
    #[error("Not found: {what}")]
    #[diagnostic(
        code(formainframe::not_found),
        help("The resource is not managed by any registered service")
    )]
    NotFound {
        /// Description of what was looked up
        what: String,
    },

    /// No registered runner accepts the operation
    #[error("Unsupported operation: {what}")]
    #[diagnostic(code(formainframe::unsupported))]
    Unsupported {
        /// Operation description
        what: String,
    },

    /// The remote system answered with a non-2xx status
    #[error("{message}{}", .response.as_ref().map_or(String::new(), |r| format!(" (HTTP {})", r.status)))]
    #[diagnostic(code(formainframe::call_failed))]
    CallFailed {
        /// Action-specific summary
        message: String,
        /// Response, when one was received
        response: Option<ResponseSummary>,
    },

    /// The request never produced a response
    #[error("Transport error: {message}")]
    #[diagnostic(
        code(formainframe::transport),
        help("Check the connection URL and network reachability")
    )]
    Transport {
        /// Error message from the HTTP client
        message: String,
    },

    /// The progress indicator was cancelled
    #[error("Operation cancelled")]
    #[diagnostic(code(formainframe::cancelled))]
    Cancelled,

    /// Attributes of a parent resource could not be resolved
    #[error("{message}")]
    #[diagnostic(code(formainframe::missing_metadata))]
    MissingMetadata {
        /// Description of the missing metadata
        message: String,
    },

    /// No credentials are stored for the connection
    #[error("Credentials for connection '{connection}' not found")]
    #[diagnostic(
        code(formainframe::credentials_not_found),
        help("Set a username and password for the connection")
    )]
    CredentialsNotFound {
        /// Connection name or UUID
        connection: String,
    },

    /// Invalid settings or store state
    #[error("Configuration error: {message}")]
    #[diagnostic(code(formainframe::configuration))]
    Configuration {
        /// Error message
        message: String,
    },

    /// A value failed validation
    #[error("Validation failed: {message}")]
    #[diagnostic(code(formainframe::validation))]
    Validation {
        /// Error message
        message: String,
    },

    /// Secret store failure
    #[error(transparent)]
    #[diagnostic(transparent)]
    Secret(#[from] SecretError),

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(formainframe::serialization))]
    Serialization {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a not-found error
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an unsupported-operation error
    #[must_use]
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported { what: what.into() }
    }

    /// Create a call failure carrying the response
    #[must_use]
    pub fn call_failed(message: impl Into<String>, response: Option<ResponseSummary>) -> Self {
        Self::CallFailed {
            message: message.into(),
            response,
        }
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a missing-metadata error
    #[must_use]
    pub fn missing_metadata(message: impl Into<String>) -> Self {
        Self::MissingMetadata {
            message: message.into(),
        }
    }

    /// Create a credentials-not-found error
    #[must_use]
    pub fn credentials_not_found(connection: impl Into<String>) -> Self {
        Self::CredentialsNotFound {
            connection: connection.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether this error is a cancellation rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Response attached to a call failure, if any.
    #[must_use]
    pub const fn response(&self) -> Option<&ResponseSummary> {
        match self {
            Self::CallFailed { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    /// Message safe to show in a notification, with registered secrets masked.
    #[must_use]
    pub fn user_message(&self) -> String {
        formainframe_events::redact(&self.to_string())
    }
}

/// Result type for formainframe operations
pub type Result<T> = std::result::Result<T, Error>;
