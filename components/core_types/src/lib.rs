//! Core value and error types for the player bridge.
//!
//! This crate provides the engine-independent pieces every other layer
//! shares:
//!
//! - [`CanonicalValue`] - tagged representation of any runtime value, used to
//!   cross the boundary between native threads and the main thread
//! - [`ToCanonical`] / [`FromCanonical`] - directional converters keyed by
//!   native type
//! - [`Error`] / [`ErrorKind`] - the bridge error taxonomy
//! - [`wire`] - binary encoding of canonical values
//!
//! # Examples
//!
//! ```
//! use core_types::{convert, CanonicalValue, ErrorKind, ToCanonical};
//!
//! let value = 10.0f64.to_canonical();
//! let back: f64 = convert("streaming.bufferingGoal", &value).unwrap();
//! assert_eq!(back, 10.0);
//!
//! let err = convert::<bool>("isLive", &CanonicalValue::string("yes")).unwrap_err();
//! assert_eq!(err.kind, ErrorKind::Conversion);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod convert;
mod error;
pub mod json;
mod value;
pub mod wire;

pub use convert::{convert, object_from_pairs, ByteBuffer, FromCanonical, OptionalNumber, ToCanonical, Unset};
pub use error::{Error, ErrorDetails, ErrorKind, Result};
pub use value::{CanonicalObject, CanonicalValue, ObjectEntry, Payload, PayloadKind, ValueType, MAX_ARRAY_HOLES};
