//! Canonical, engine-independent representation of runtime values.
//!
//! A [`CanonicalValue`] is what crosses the boundary between native threads
//! and the main thread. It is built once during a conversion, never mutated,
//! and dropped after the crossing.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag describing the runtime type of a value.
///
/// The discriminants are the wire tags and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueType {
    /// `undefined`
    Undefined = 0,
    /// `null`
    Null = 1,
    /// Primitive boolean
    Boolean = 2,
    /// Primitive number
    Number = 3,
    /// Primitive string
    String = 4,
    /// Symbol (carried by description)
    Symbol = 5,
    /// Function (carried by name)
    Function = 6,
    /// Genuine array
    Array = 7,
    /// Promise object
    Promise = 8,
    /// Boxed boolean (`new Boolean(..)`)
    BooleanObject = 9,
    /// Boxed number
    NumberObject = 10,
    /// Boxed string
    StringObject = 11,
    /// `ArrayBuffer`
    ArrayBuffer = 12,
    /// `Int8Array`
    Int8Array = 13,
    /// `Uint8Array`
    Uint8Array = 14,
    /// `Uint8ClampedArray`
    Uint8ClampedArray = 15,
    /// `Int16Array`
    Int16Array = 16,
    /// `Uint16Array`
    Uint16Array = 17,
    /// `Int32Array`
    Int32Array = 18,
    /// `Uint32Array`
    Uint32Array = 19,
    /// `Float32Array`
    Float32Array = 20,
    /// `Float64Array`
    Float64Array = 21,
    /// `DataView`
    DataView = 22,
    /// Any other object
    OtherObject = 23,
}

/// Which payload slot a [`ValueType`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// No payload (undefined, null)
    None,
    /// `bool`
    Bool,
    /// `f64`
    Number,
    /// `String`
    String,
    /// Nested [`CanonicalObject`]
    Object,
    /// Raw bytes
    Bytes,
}

impl ValueType {
    /// Returns the payload slot values of this kind carry.
    pub fn payload_kind(self) -> PayloadKind {
        use ValueType::*;
        match self {
            Undefined | Null => PayloadKind::None,
            Boolean | BooleanObject => PayloadKind::Bool,
            Number | NumberObject => PayloadKind::Number,
            String | StringObject | Symbol | Function => PayloadKind::String,
            Array | Promise | OtherObject => PayloadKind::Object,
            ArrayBuffer | Int8Array | Uint8Array | Uint8ClampedArray | Int16Array
            | Uint16Array | Int32Array | Uint32Array | Float32Array | Float64Array
            | DataView => PayloadKind::Bytes,
        }
    }

    /// Returns true for `ArrayBuffer`, `DataView` and every typed array.
    pub fn is_binary(self) -> bool {
        self.payload_kind() == PayloadKind::Bytes
    }

    /// Returns true for kinds represented as a [`CanonicalObject`].
    pub fn is_object(self) -> bool {
        self.payload_kind() == PayloadKind::Object
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The single populated payload of a [`CanonicalValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Boolean payload
    Bool(bool),
    /// Number payload
    Number(f64),
    /// String payload
    String(String),
    /// Object or array payload
    Object(CanonicalObject),
    /// Binary payload
    Bytes(Vec<u8>),
}

impl Payload {
    fn kind(&self) -> PayloadKind {
        match self {
            Payload::Bool(_) => PayloadKind::Bool,
            Payload::Number(_) => PayloadKind::Number,
            Payload::String(_) => PayloadKind::String,
            Payload::Object(_) => PayloadKind::Object,
            Payload::Bytes(_) => PayloadKind::Bytes,
        }
    }
}

/// One keyed entry of an object or array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Property name; array indices are decimal strings
    pub key: String,
    /// Property value
    pub value: CanonicalValue,
}

/// Most holes [`CanonicalObject::elements`] fills with `undefined`.
pub const MAX_ARRAY_HOLES: usize = 1 << 16;

fn array_length_for(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// An object or array as an ordered list of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalObject {
    kind: ValueType,
    entries: Vec<ObjectEntry>,
    array_length: Option<u32>,
}

impl CanonicalObject {
    /// Creates a plain object from ordered entries.
    pub fn new(entries: Vec<ObjectEntry>) -> Self {
        Self {
            kind: ValueType::OtherObject,
            entries,
            array_length: None,
        }
    }

    /// Creates a genuine array; entries are keyed by index.
    ///
    /// Items past the longest runtime array (`u32::MAX` elements) are dropped.
    pub fn array(items: Vec<CanonicalValue>) -> Self {
        let length = array_length_for(items.len());
        let entries = items
            .into_iter()
            .take(length as usize)
            .enumerate()
            .map(|(i, value)| ObjectEntry {
                key: i.to_string(),
                value,
            })
            .collect();
        Self {
            kind: ValueType::Array,
            entries,
            array_length: Some(length),
        }
    }

    /// Creates an array with explicit length (sparse arrays keep holes).
    pub fn sparse_array(entries: Vec<ObjectEntry>, length: u32) -> Self {
        Self {
            kind: ValueType::Array,
            entries,
            array_length: Some(length),
        }
    }

    /// Creates an object tagged with a non-array object kind (e.g. Promise).
    pub fn with_kind(kind: ValueType, entries: Vec<ObjectEntry>) -> Self {
        debug_assert!(kind.is_object() && kind != ValueType::Array);
        Self {
            kind,
            entries,
            array_length: None,
        }
    }

    /// The object kind tag.
    pub fn kind(&self) -> ValueType {
        self.kind
    }

    /// Ordered entries.
    pub fn entries(&self) -> &[ObjectEntry] {
        &self.entries
    }

    /// Array length for genuine arrays.
    pub fn array_length(&self) -> Option<u32> {
        self.array_length
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Option<&CanonicalValue> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Returns array elements in index order; holes read as undefined.
    ///
    /// `Ok(None)` for anything but a genuine array. An array with more than
    /// [`MAX_ARRAY_HOLES`] holes is a conversion error; read its
    /// [`entries`](Self::entries) instead.
    pub fn elements(&self) -> Result<Option<Vec<CanonicalValue>>> {
        let Some(length) = self.array_length else {
            return Ok(None);
        };
        let length = length as usize;
        if length > self.entries.len().saturating_add(MAX_ARRAY_HOLES) {
            return Err(Error::conversion(format!(
                "array of length {} with {} entries is too sparse to expand",
                length,
                self.entries.len()
            )));
        }
        let mut items = vec![CanonicalValue::undefined(); length];
        for entry in &self.entries {
            if let Ok(index) = entry.key.parse::<usize>() {
                if index < items.len() {
                    items[index] = entry.value.clone();
                }
            }
        }
        Ok(Some(items))
    }

    fn is_well_formed(&self) -> bool {
        let kind_ok = self.kind.is_object();
        let length_ok = (self.kind == ValueType::Array) == self.array_length.is_some();
        kind_ok && length_ok && self.entries.iter().all(|e| e.value.is_well_formed())
    }
}

/// A tagged runtime value.
///
/// The `kind` always determines which payload is present; constructors
/// uphold this, and [`CanonicalValue::is_well_formed`] checks decoded values.
///
/// # Examples
///
/// ```
/// use core_types::{CanonicalValue, ValueType};
///
/// let v = CanonicalValue::number(10.0);
/// assert_eq!(v.kind(), ValueType::Number);
/// assert_eq!(v.as_number(), Some(10.0));
/// assert!(CanonicalValue::undefined().payload().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalValue {
    kind: ValueType,
    payload: Option<Payload>,
}

impl CanonicalValue {
    /// `undefined`
    pub fn undefined() -> Self {
        Self {
            kind: ValueType::Undefined,
            payload: None,
        }
    }

    /// `null`
    pub fn null() -> Self {
        Self {
            kind: ValueType::Null,
            payload: None,
        }
    }

    /// A primitive boolean.
    pub fn boolean(value: bool) -> Self {
        Self {
            kind: ValueType::Boolean,
            payload: Some(Payload::Bool(value)),
        }
    }

    /// A primitive number.
    pub fn number(value: f64) -> Self {
        Self {
            kind: ValueType::Number,
            payload: Some(Payload::Number(value)),
        }
    }

    /// A primitive string.
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            kind: ValueType::String,
            payload: Some(Payload::String(value.into())),
        }
    }

    /// An object or array.
    pub fn object(object: CanonicalObject) -> Self {
        Self {
            kind: object.kind(),
            payload: Some(Payload::Object(object)),
        }
    }

    /// An `ArrayBuffer` holding `bytes`.
    pub fn buffer(bytes: Vec<u8>) -> Self {
        Self::binary(ValueType::ArrayBuffer, bytes)
    }

    /// A binary value of the given binary kind (typed array, DataView, ...).
    pub fn binary(kind: ValueType, bytes: Vec<u8>) -> Self {
        debug_assert!(kind.is_binary());
        Self {
            kind,
            payload: Some(Payload::Bytes(bytes)),
        }
    }

    /// A value whose kind uses the string slot (symbols, functions, boxed strings).
    pub fn tagged_string(kind: ValueType, text: impl Into<String>) -> Self {
        debug_assert_eq!(kind.payload_kind(), PayloadKind::String);
        Self {
            kind,
            payload: Some(Payload::String(text.into())),
        }
    }

    /// A boxed boolean or number.
    pub fn boxed(kind: ValueType, inner: &CanonicalValue) -> Option<Self> {
        let payload = match (kind, inner.payload()?) {
            (ValueType::BooleanObject, Payload::Bool(b)) => Payload::Bool(*b),
            (ValueType::NumberObject, Payload::Number(n)) => Payload::Number(*n),
            (ValueType::StringObject, Payload::String(s)) => Payload::String(s.clone()),
            _ => return None,
        };
        Some(Self {
            kind,
            payload: Some(payload),
        })
    }

    /// The type tag.
    pub fn kind(&self) -> ValueType {
        self.kind
    }

    /// The populated payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// True for undefined and null.
    pub fn is_nullish(&self) -> bool {
        matches!(self.kind, ValueType::Undefined | ValueType::Null)
    }

    /// Boolean payload of a Boolean or BooleanObject.
    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Some(Payload::Bool(b)) => Some(b),
            _ => None,
        }
    }

    /// Number payload of a Number or NumberObject.
    pub fn as_number(&self) -> Option<f64> {
        match self.payload {
            Some(Payload::Number(n)) => Some(n),
            _ => None,
        }
    }

    /// String payload of a string-slot kind.
    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Some(Payload::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Object payload.
    pub fn as_object(&self) -> Option<&CanonicalObject> {
        match &self.payload {
            Some(Payload::Object(o)) => Some(o),
            _ => None,
        }
    }

    /// Binary payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Some(Payload::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    /// Checks the kind/payload invariant recursively.
    pub fn is_well_formed(&self) -> bool {
        let expected = self.kind.payload_kind();
        match &self.payload {
            None => expected == PayloadKind::None,
            Some(Payload::Object(object)) => {
                expected == PayloadKind::Object && object.kind() == self.kind && object.is_well_formed()
            }
            Some(payload) => payload.kind() == expected,
        }
    }
}

impl Default for CanonicalValue {
    fn default() -> Self {
        Self::undefined()
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            None if self.kind == ValueType::Null => write!(f, "null"),
            None => write!(f, "undefined"),
            Some(Payload::Bool(b)) => write!(f, "{}", b),
            Some(Payload::Number(n)) => write!(f, "{}", n),
            Some(Payload::String(s)) => write!(f, "{:?}", s),
            Some(Payload::Object(o)) if o.array_length().is_some() => {
                write!(f, "[array of {}]", o.array_length().unwrap_or(0))
            }
            Some(Payload::Object(o)) => write!(f, "[{} with {} entries]", o.kind(), o.entries().len()),
            Some(Payload::Bytes(b)) => write!(f, "[{} of {} bytes]", self.kind, b.len()),
        }
    }
}
