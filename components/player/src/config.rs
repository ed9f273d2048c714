//! Runtime configuration.

use crate::error::SetupResult;
use async_runtime::ShutdownMode;
use serde::Deserialize;
use std::path::Path;

/// Settings for a [`JsManager`](crate::JsManager).
///
/// Every field has a default, so an empty document is valid:
///
/// ```
/// use player::JsManagerConfig;
///
/// let config = JsManagerConfig::from_toml_str(r#"
///     thread_name = "player-main"
///     shutdown = "cancel"
/// "#).unwrap();
/// assert_eq!(config.thread_name, "player-main");
/// assert_eq!(config.max_clone_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsManagerConfig {
    /// Name of the main-thread worker.
    pub thread_name: String,
    /// What happens to queued tasks when the manager is dropped.
    pub shutdown: ShutdownMode,
    /// Deepest value nesting accepted when cloning results.
    pub max_clone_depth: usize,
    /// `tracing` filter directive for [`logging::install`](crate::logging::install).
    pub log_filter: Option<String>,
}

impl Default for JsManagerConfig {
    fn default() -> Self {
        Self {
            thread_name: "JS Main Thread".to_string(),
            shutdown: ShutdownMode::Drain,
            max_clone_depth: 64,
            log_filter: None,
        }
    }
}

impl JsManagerConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> SetupResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> SetupResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
