//! Log output setup.
//!
//! Library code only emits `tracing` events; hosts that want them printed
//! call [`install`] once at startup.

use crate::error::{SetupError, SetupResult};
use tracing_subscriber::EnvFilter;

/// Directive used when neither the caller nor `RUST_LOG` provides one.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Installs a global `fmt` subscriber.
///
/// `directive` takes precedence over `RUST_LOG`; with neither set,
/// [`DEFAULT_DIRECTIVE`] applies. Fails if a global subscriber is already
/// installed or the directive does not parse.
pub fn install(directive: Option<&str>) -> SetupResult<()> {
    let filter = build_env_filter(directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| SetupError::Logging(err.to_string()))
}

fn build_env_filter(directive: Option<&str>) -> SetupResult<EnvFilter> {
    match directive {
        Some(directive) => {
            EnvFilter::try_new(directive).map_err(|err| SetupError::Logging(err.to_string()))
        }
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))),
    }
}
