//! Setup errors for the player crate

use thiserror::Error;

/// Failures while configuring or starting the runtime.
///
/// Errors from player operations themselves are [`core_types::Error`]s.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Reading a configuration file or spawning the main thread failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The host bootstrap failed on the main thread
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] core_types::Error),

    /// A global tracing subscriber could not be installed
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Result type for setup operations
pub type SetupResult<T> = Result<T, SetupError>;
