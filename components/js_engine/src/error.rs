//! Realm-level failures.

use thiserror::Error;

/// Errors raised by the realm itself, as opposed to values thrown by script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealmError {
    /// `Realm::current` was used on a thread with no installed realm
    #[error("no realm is installed on this thread")]
    NotInstalled,
    /// A dotted path crossed a value that is not an object
    #[error("'{path}' cannot be resolved: '{segment}' is not an object")]
    NotAnObject {
        /// Full dotted path
        path: String,
        /// First segment whose parent was not an object
        segment: String,
    },
    /// A persistent handle was used after release
    #[error("persistent handle {0} is not live")]
    StaleHandle(u64),
    /// Cloning recursed past the configured limit
    #[error("value nesting exceeds {0} levels")]
    DepthExceeded(usize),
    /// Cloning met the same object twice on one path
    #[error("cyclic value cannot be cloned")]
    CircularReference,
}

impl From<RealmError> for core_types::Error {
    fn from(err: RealmError) -> Self {
        match err {
            RealmError::DepthExceeded(_) | RealmError::CircularReference => {
                core_types::Error::conversion(err.to_string())
            }
            _ => core_types::Error::invocation(err.to_string()),
        }
    }
}

/// Result alias for realm operations.
pub type Result<T> = std::result::Result<T, RealmError>;
