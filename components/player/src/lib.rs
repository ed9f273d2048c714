//! Native API for a media player implemented in script.
//!
//! A [`JsManager`] owns the main thread and the realm. A [`Player`] is a
//! proxy for one `shaka.Player` object on that thread: each method posts a
//! task, converts arguments and results through
//! [`CanonicalValue`](core_types::CanonicalValue), and hands back a
//! [`Future`](async_runtime::Future).
//!
//! # Examples
//!
//! ```no_run
//! use player::{logging, JsManager, JsManagerConfig, Player};
//! use std::sync::Arc;
//!
//! struct Events;
//! impl player::Client for Events {}
//!
//! let config = JsManagerConfig::from_file("player.toml")?;
//! logging::install(config.log_filter.as_deref())?;
//! let manager = JsManager::new(config)?;
//!
//! let player = Player::new(&manager);
//! player.initialize(Arc::new(Events), None).get()?;
//! player.load("https://example.com/dash.mpd", f64::NAN, "").get()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod js_manager;
pub mod logging;
pub mod player;
pub mod proxy;
pub mod types;

pub use config::JsManagerConfig;
pub use error::{SetupError, SetupResult};
pub use js_manager::JsManager;
pub use player::{Client, Player, VideoElement};
pub use proxy::JsObjectWrapper;
pub use types::{BufferedInfo, BufferedRange, ConfigValue, DrmInfo, LanguageRole, LogLevel, Stats, Track};
