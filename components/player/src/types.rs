//! Plain data returned by the player.
//!
//! These mirror the objects the player script returns; field names follow
//! the script's camelCase through serde.

use core_types::{CanonicalValue, Error, FromCanonical, Result, ToCanonical};
use serde::{Deserialize, Deserializer, Serialize};

fn nan() -> f64 {
    f64::NAN
}

// The script reports unknown numbers as NaN, which arrive here as null.
fn number_or_nan<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// A playable track (variant or text).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Track {
    /// Unique id within the current manifest
    pub id: i64,
    /// Currently selected
    pub active: bool,
    /// `variant` or `text`
    #[serde(rename = "type")]
    pub track_type: String,
    /// Bandwidth in bits per second
    pub bandwidth: f64,
    /// Language code
    pub language: String,
    /// Label from the manifest
    pub label: Option<String>,
    /// Text kind (`subtitle`, `caption`)
    pub kind: Option<String>,
    /// Video width
    pub width: Option<f64>,
    /// Video height
    pub height: Option<f64>,
    /// Video frame rate
    pub frame_rate: Option<f64>,
    /// MIME type
    pub mime_type: Option<String>,
    /// Codec string
    pub codecs: Option<String>,
    /// Audio codec
    pub audio_codec: Option<String>,
    /// Video codec
    pub video_codec: Option<String>,
    /// Marked as primary in the manifest
    pub primary: bool,
    /// Roles from the manifest
    pub roles: Vec<String>,
    /// Audio channel count
    pub channels_count: Option<f64>,
}

/// A language/role pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageRole {
    /// Language code
    pub language: String,
    /// Role, empty when none
    pub role: String,
}

/// A buffered time range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BufferedRange {
    /// Range start
    pub start: f64,
    /// Range end
    pub end: f64,
}

/// Buffered ranges per stream type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BufferedInfo {
    /// Ranges buffered for every stream
    pub total: Vec<BufferedRange>,
    /// Audio ranges
    pub audio: Vec<BufferedRange>,
    /// Video ranges
    pub video: Vec<BufferedRange>,
    /// Text ranges
    pub text: Vec<BufferedRange>,
}

/// DRM settings of the loaded content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrmInfo {
    /// Key system, e.g. `com.widevine.alpha`
    pub key_system: String,
    /// License server
    pub license_server_uri: String,
    /// Distinctive identifier required
    pub distinctive_identifier_required: bool,
    /// Persistent state required
    pub persistent_state_required: bool,
    /// Audio robustness level
    pub audio_robustness: String,
    /// Video robustness level
    pub video_robustness: String,
    /// Server certificate bytes
    pub server_certificate: Option<Vec<u8>>,
    /// Key ids, hex encoded
    pub key_ids: Vec<String>,
}

/// Playback statistics. Unknown values are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Current video width
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub width: f64,
    /// Current video height
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub height: f64,
    /// Bandwidth of the current stream
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub stream_bandwidth: f64,
    /// Frames decoded
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub decoded_frames: f64,
    /// Frames dropped
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub dropped_frames: f64,
    /// Bandwidth estimate
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub estimated_bandwidth: f64,
    /// Seconds from `load` to playable
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub load_latency: f64,
    /// Seconds spent playing
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub play_time: f64,
    /// Seconds spent buffering
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub buffering_time: f64,
    /// Seconds spent on license requests
    #[serde(default = "nan", deserialize_with = "number_or_nan")]
    pub license_time: f64,
}

core_types::canonical_via_serde!(Track, LanguageRole, BufferedRange, BufferedInfo, DrmInfo, Stats);

/// Verbosity of the player script's own logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum LogLevel {
    /// Nothing
    None = 0,
    /// Errors
    Error = 1,
    /// Warnings
    Warning = 2,
    /// Informational
    Info = 3,
    /// Debug
    Debug = 4,
    /// Verbose
    V1 = 5,
    /// Very verbose
    V2 = 6,
}

impl LogLevel {
    fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => LogLevel::None,
            1 => LogLevel::Error,
            2 => LogLevel::Warning,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::V1,
            6 => LogLevel::V2,
            _ => return None,
        })
    }
}

impl ToCanonical for LogLevel {
    fn to_canonical(&self) -> CanonicalValue {
        (*self as i32).to_canonical()
    }
}

impl FromCanonical for LogLevel {
    const TYPE_NAME: &'static str = "log level";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        let code = i32::from_canonical(value)?;
        Self::from_code(code).ok_or_else(|| Error::conversion(format!("unknown log level {}", code)))
    }
}

/// A value for `configure`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Restores the default
    Unset,
    /// Boolean setting
    Bool(bool),
    /// Numeric setting
    Number(f64),
    /// String setting
    String(String),
    /// Binary setting (e.g. a server certificate)
    Bytes(Vec<u8>),
}

impl ToCanonical for ConfigValue {
    fn to_canonical(&self) -> CanonicalValue {
        match self {
            ConfigValue::Unset => CanonicalValue::undefined(),
            ConfigValue::Bool(b) => CanonicalValue::boolean(*b),
            ConfigValue::Number(n) => CanonicalValue::number(*n),
            ConfigValue::String(s) => CanonicalValue::string(s.as_str()),
            ConfigValue::Bytes(bytes) => CanonicalValue::buffer(bytes.clone()),
        }
    }
}

impl From<core_types::Unset> for ConfigValue {
    fn from(_: core_types::Unset) -> Self {
        ConfigValue::Unset
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<Vec<u8>> for ConfigValue {
    fn from(value: Vec<u8>) -> Self {
        ConfigValue::Bytes(value)
    }
}
