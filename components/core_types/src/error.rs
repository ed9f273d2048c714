//! Error types shared by every layer of the bridge.
//!
//! Asynchronous operations never throw across the native/runtime boundary;
//! they settle their future with an [`Error`] instead.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// The category of a bridge error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A required runtime entry point is missing or has the wrong kind.
    Construction,
    /// The runtime threw or a runtime promise rejected.
    Invocation,
    /// A value did not have the shape the native type required.
    Conversion,
    /// A network filter reported an error.
    Filter,
    /// The main thread stopped before the operation could complete.
    Shutdown,
}

impl ErrorKind {
    /// Short lowercase name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Construction => "construction",
            ErrorKind::Invocation => "invocation",
            ErrorKind::Conversion => "conversion",
            ErrorKind::Filter => "filter",
            ErrorKind::Shutdown => "shutdown",
        }
    }
}

/// Extra numeric fields carried by errors raised by the player script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Broad error category (network, text, media, ...).
    pub category: i32,
    /// Specific error code within the category.
    pub code: i32,
    /// Recoverable (1) or critical (2).
    pub severity: i32,
}

/// A bridge error.
///
/// # Examples
///
/// ```
/// use core_types::{Error, ErrorKind};
///
/// let err = Error::conversion("Invalid type for 'streaming.missing'");
/// assert_eq!(err.kind, ErrorKind::Conversion);
/// assert!(err.message.contains("streaming.missing"));
/// ```
#[derive(Debug, Clone, PartialEq, ThisError, Serialize, Deserialize)]
#[error("{message}")]
pub struct Error {
    /// What went wrong
    pub kind: ErrorKind,
    /// Human-readable message; for runtime errors, the runtime's message
    pub message: String,
    /// Script error fields, when the thrown value carried them
    pub details: Option<ErrorDetails>,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a [`ErrorKind::Construction`] error.
    pub fn construction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Construction, message)
    }

    /// Creates a [`ErrorKind::Invocation`] error.
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invocation, message)
    }

    /// Creates a [`ErrorKind::Conversion`] error.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conversion, message)
    }

    /// Creates a [`ErrorKind::Filter`] error.
    pub fn filter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Filter, message)
    }

    /// Creates a [`ErrorKind::Shutdown`] error.
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shutdown, message)
    }

    /// Attaches script error fields.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// Result alias used throughout the bridge.
pub type Result<T> = std::result::Result<T, Error>;
