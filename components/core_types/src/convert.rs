//! Directional converters between native types and [`CanonicalValue`].
//!
//! Each native target type has its own converter. A converter never guesses:
//! a value of the wrong shape is a [`ErrorKind::Conversion`](crate::ErrorKind)
//! error.

use crate::error::{Error, Result};
use crate::value::{CanonicalObject, CanonicalValue, ObjectEntry, ValueType};

/// Converts a native value into its canonical form.
pub trait ToCanonical {
    /// Builds the canonical value.
    fn to_canonical(&self) -> CanonicalValue;
}

/// Converts a canonical value into a native type.
pub trait FromCanonical: Sized {
    /// Name used in conversion error messages.
    const TYPE_NAME: &'static str;

    /// Performs the conversion.
    fn from_canonical(value: &CanonicalValue) -> Result<Self>;
}

/// Converts `value` into `T`, naming `context` (a method name or
/// configuration path) in the error.
pub fn convert<T: FromCanonical>(context: &str, value: &CanonicalValue) -> Result<T> {
    T::from_canonical(value).map_err(|err| {
        Error::conversion(format!(
            "Invalid type for '{}': expected {}, got {} ({})",
            context,
            T::TYPE_NAME,
            value.kind(),
            err.message
        ))
    })
}

fn mismatch(expected: &str, value: &CanonicalValue) -> Error {
    Error::conversion(format!("expected {}, found {}", expected, value.kind()))
}

/// A number argument where NaN means "no value".
///
/// Converts to `undefined` instead of a numeric NaN so call sites can omit
/// optional numeric arguments, e.g. the start time of `load`.
///
/// ```
/// use core_types::{OptionalNumber, ToCanonical, ValueType};
///
/// assert_eq!(OptionalNumber(f64::NAN).to_canonical().kind(), ValueType::Undefined);
/// assert_eq!(OptionalNumber(3.0).to_canonical().as_number(), Some(3.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionalNumber(pub f64);

impl ToCanonical for OptionalNumber {
    fn to_canonical(&self) -> CanonicalValue {
        if self.0.is_nan() {
            CanonicalValue::undefined()
        } else {
            CanonicalValue::number(self.0)
        }
    }
}

/// An explicit `undefined` argument (resets a configuration value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unset;

impl ToCanonical for Unset {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::undefined()
    }
}

/// Binary data, converted to and from an `ArrayBuffer`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteBuffer(pub Vec<u8>);

impl ByteBuffer {
    /// Copies `data` into a new buffer.
    pub fn from_slice(data: &[u8]) -> Self {
        Self(data.to_vec())
    }

    /// The raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl ToCanonical for ByteBuffer {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::buffer(self.0.clone())
    }
}

impl FromCanonical for ByteBuffer {
    const TYPE_NAME: &'static str = "binary buffer";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        value
            .as_bytes()
            .map(ByteBuffer::from_slice)
            .ok_or_else(|| mismatch(Self::TYPE_NAME, value))
    }
}

impl ToCanonical for CanonicalValue {
    fn to_canonical(&self) -> CanonicalValue {
        self.clone()
    }
}

impl FromCanonical for CanonicalValue {
    const TYPE_NAME: &'static str = "any value";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromCanonical for () {
    const TYPE_NAME: &'static str = "void";

    fn from_canonical(_value: &CanonicalValue) -> Result<Self> {
        Ok(())
    }
}

impl ToCanonical for bool {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::boolean(*self)
    }
}

impl FromCanonical for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch(Self::TYPE_NAME, value))
    }
}

impl ToCanonical for f64 {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::number(*self)
    }
}

impl FromCanonical for f64 {
    const TYPE_NAME: &'static str = "number";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        value.as_number().ok_or_else(|| mismatch(Self::TYPE_NAME, value))
    }
}

impl ToCanonical for i32 {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::number(f64::from(*self))
    }
}

impl FromCanonical for i32 {
    const TYPE_NAME: &'static str = "integer";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        let n = value.as_number().ok_or_else(|| mismatch(Self::TYPE_NAME, value))?;
        if n.fract() != 0.0 || n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
            return Err(Error::conversion(format!("{} is not a 32-bit integer", n)));
        }
        Ok(n as i32)
    }
}

impl ToCanonical for str {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::string(self)
    }
}

impl ToCanonical for String {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::string(self.as_str())
    }
}

impl FromCanonical for String {
    const TYPE_NAME: &'static str = "string";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        match value.kind() {
            ValueType::String | ValueType::StringObject => {
                Ok(value.as_str().unwrap_or_default().to_string())
            }
            _ => Err(mismatch(Self::TYPE_NAME, value)),
        }
    }
}

impl<T: ToCanonical + ?Sized> ToCanonical for &T {
    fn to_canonical(&self) -> CanonicalValue {
        (**self).to_canonical()
    }
}

impl<T: ToCanonical> ToCanonical for Option<T> {
    fn to_canonical(&self) -> CanonicalValue {
        match self {
            Some(value) => value.to_canonical(),
            None => CanonicalValue::undefined(),
        }
    }
}

impl<T: FromCanonical> FromCanonical for Option<T> {
    const TYPE_NAME: &'static str = "optional value";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        if value.is_nullish() {
            Ok(None)
        } else {
            T::from_canonical(value).map(Some)
        }
    }
}

impl<T: ToCanonical> ToCanonical for Vec<T> {
    fn to_canonical(&self) -> CanonicalValue {
        let items = self.iter().map(ToCanonical::to_canonical).collect();
        CanonicalValue::object(CanonicalObject::array(items))
    }
}

impl<T: FromCanonical> FromCanonical for Vec<T> {
    const TYPE_NAME: &'static str = "array";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        let items = match value.as_object().map(CanonicalObject::elements) {
            Some(Ok(Some(items))) => items,
            Some(Err(err)) => return Err(err),
            _ => return Err(mismatch(Self::TYPE_NAME, value)),
        };
        items.iter().map(T::from_canonical).collect()
    }
}

/// Builds a plain object from `(key, value)` pairs.
pub fn object_from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> CanonicalValue
where
    K: Into<String>,
    V: ToCanonical,
{
    let entries = pairs
        .into_iter()
        .map(|(key, value)| ObjectEntry {
            key: key.into(),
            value: value.to_canonical(),
        })
        .collect();
    CanonicalValue::object(CanonicalObject::new(entries))
}
