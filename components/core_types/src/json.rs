//! Bridge between [`CanonicalValue`] and `serde`.
//!
//! Struct-shaped results (tracks, stats, buffered ranges, ...) are converted
//! by going through `serde_json::Value`, so a native struct only needs
//! `#[derive(Serialize, Deserialize)]` plus [`canonical_via_serde!`].

use crate::error::{Error, Result};
use crate::value::{CanonicalObject, CanonicalValue, ObjectEntry, Payload, ValueType};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value as Json};

/// Converts a canonical value to JSON.
///
/// Object entries holding `undefined` are omitted, binary payloads become
/// arrays of byte values, functions and symbols become their names. Arrays
/// too sparse to expand are written as objects keyed by index.
pub fn to_json(value: &CanonicalValue) -> Json {
    match value.payload() {
        None => Json::Null,
        Some(Payload::Bool(b)) => Json::Bool(*b),
        Some(Payload::Number(n)) => number_to_json(*n),
        Some(Payload::String(s)) => Json::String(s.clone()),
        Some(Payload::Bytes(bytes)) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Some(Payload::Object(object)) => match object.elements() {
            Ok(Some(items)) => Json::Array(items.iter().map(to_json).collect()),
            Ok(None) | Err(_) => {
                let mut map = Map::new();
                for entry in object.entries() {
                    if entry.value.kind() != ValueType::Undefined {
                        map.insert(entry.key.clone(), to_json(&entry.value));
                    }
                }
                Json::Object(map)
            }
        },
    }
}

// Integral numbers become JSON integers so they deserialize into integer
// fields; NaN and infinities have no JSON form and become null. -0 stays a
// float so its sign survives.
fn number_to_json(n: f64) -> Json {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    let negative_zero = n == 0.0 && n.is_sign_negative();
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER && !negative_zero {
        Json::from(n as i64)
    } else {
        Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
    }
}

/// Converts JSON to a canonical value.
pub fn from_json(json: &Json) -> CanonicalValue {
    match json {
        Json::Null => CanonicalValue::null(),
        Json::Bool(b) => CanonicalValue::boolean(*b),
        Json::Number(n) => CanonicalValue::number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => CanonicalValue::string(s.as_str()),
        Json::Array(items) => {
            CanonicalValue::object(CanonicalObject::array(items.iter().map(from_json).collect()))
        }
        Json::Object(map) => {
            let entries = map
                .iter()
                .map(|(key, value)| ObjectEntry {
                    key: key.clone(),
                    value: from_json(value),
                })
                .collect();
            CanonicalValue::object(CanonicalObject::new(entries))
        }
    }
}

/// Deserializes `T` from a canonical value.
pub fn from_canonical_serde<T: DeserializeOwned>(value: &CanonicalValue) -> Result<T> {
    serde_json::from_value(to_json(value)).map_err(|err| Error::conversion(err.to_string()))
}

/// Serializes `value` into canonical form.
pub fn to_canonical_serde<T: Serialize>(value: &T) -> CanonicalValue {
    // Only non-string map keys fail here; none of the bridged structs use them.
    serde_json::to_value(value)
        .map(|json| from_json(&json))
        .unwrap_or_default()
}

/// Implements [`FromCanonical`](crate::FromCanonical) and
/// [`ToCanonical`](crate::ToCanonical) for serde types.
#[macro_export]
macro_rules! canonical_via_serde {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::FromCanonical for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_canonical(value: &$crate::CanonicalValue) -> $crate::Result<Self> {
                    $crate::json::from_canonical_serde(value)
                }
            }

            impl $crate::ToCanonical for $ty {
                fn to_canonical(&self) -> $crate::CanonicalValue {
                    $crate::json::to_canonical_serde(self)
                }
            }
        )*
    };
}
