//! Cloning between runtime values and canonical values.
//!
//! Runtime → canonical is a deep copy bounded by
//! [`RealmOptions::max_clone_depth`](crate::RealmOptions). Functions clone to
//! their name, promises to an empty `Promise`-tagged object, and a cycle is
//! an error. Canonical → runtime always succeeds; functions and promises
//! cannot be recreated and come back as `undefined`.

use crate::error::{RealmError, Result};
use crate::realm::Realm;
use crate::value::{JsObject, JsValue, ObjectClass};
use core_types::{
    CanonicalObject, CanonicalValue, Error, ErrorDetails, ObjectEntry, Payload, ValueType,
};

struct CloneContext {
    depth: usize,
    max_depth: usize,
    /// Objects on the path from the root to the value being cloned.
    ancestors: Vec<usize>,
}

impl CloneContext {
    fn new(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            ancestors: Vec::new(),
        }
    }

    fn enter(&mut self, object: &JsObject) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(RealmError::DepthExceeded(self.max_depth));
        }
        if self.ancestors.contains(&object.addr()) {
            return Err(RealmError::CircularReference);
        }
        self.depth += 1;
        self.ancestors.push(object.addr());
        Ok(())
    }

    fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.ancestors.pop();
    }
}

impl Realm {
    /// Deep-copies a runtime value into canonical form.
    pub fn to_canonical(&self, value: &JsValue) -> Result<CanonicalValue> {
        let mut ctx = CloneContext::new(self.options().max_clone_depth);
        clone_value(value, &mut ctx)
    }

    /// Builds a runtime value from canonical form.
    pub fn from_canonical(&self, value: &CanonicalValue) -> JsValue {
        match (value.kind(), value.payload()) {
            (ValueType::Null, _) => JsValue::Null,
            (ValueType::Boolean, Some(Payload::Bool(b))) => JsValue::Boolean(*b),
            (ValueType::Number, Some(Payload::Number(n))) => JsValue::Number(*n),
            (ValueType::String, Some(Payload::String(s))) => JsValue::string(s),
            (ValueType::Symbol, Some(Payload::String(s))) => JsValue::Symbol(s.as_str().into()),
            (ValueType::BooleanObject, Some(Payload::Bool(b))) => boxed(JsValue::Boolean(*b)),
            (ValueType::NumberObject, Some(Payload::Number(n))) => boxed(JsValue::Number(*n)),
            (ValueType::StringObject, Some(Payload::String(s))) => boxed(JsValue::string(s)),
            (kind, Some(Payload::Bytes(bytes))) => JsValue::Object(JsObject::binary(kind, bytes.clone())),
            (ValueType::Array | ValueType::OtherObject, Some(Payload::Object(object))) => {
                let target = if object.kind() == ValueType::Array {
                    JsObject::with_class(ObjectClass::Array)
                } else {
                    JsObject::plain()
                };
                for entry in object.entries() {
                    target.set(&entry.key, self.from_canonical(&entry.value));
                }
                JsValue::Object(target)
            }
            _ => JsValue::Undefined,
        }
    }

    /// Converts a thrown value or rejection reason into a native error.
    ///
    /// Error-like objects contribute their `message`, and their numeric
    /// `category`/`code`/`severity` fields when all three are present.
    pub fn to_error(&self, thrown: &JsValue) -> Error {
        let Some(object) = thrown.as_object() else {
            return Error::invocation(thrown.to_string());
        };
        let message = match object.get("message") {
            JsValue::String(s) => s.to_string(),
            JsValue::Undefined => match object.get("code").as_number() {
                Some(code) => format!("Error code {}", code),
                None => thrown.to_string(),
            },
            other => other.to_string(),
        };
        let error = Error::invocation(message);
        let number = |key: &str| object.get(key).as_number().map(|n| n as i32);
        match (number("category"), number("code"), number("severity")) {
            (Some(category), Some(code), Some(severity)) => error.with_details(ErrorDetails {
                category,
                code,
                severity,
            }),
            _ => error,
        }
    }
}

fn boxed(inner: JsValue) -> JsValue {
    JsValue::Object(JsObject::with_class(ObjectClass::Boxed(inner)))
}

fn clone_value(value: &JsValue, ctx: &mut CloneContext) -> Result<CanonicalValue> {
    let object = match value {
        JsValue::Undefined => return Ok(CanonicalValue::undefined()),
        JsValue::Null => return Ok(CanonicalValue::null()),
        JsValue::Boolean(b) => return Ok(CanonicalValue::boolean(*b)),
        JsValue::Number(n) => return Ok(CanonicalValue::number(*n)),
        JsValue::String(s) => return Ok(CanonicalValue::string(s.as_ref())),
        JsValue::Symbol(s) => return Ok(CanonicalValue::tagged_string(ValueType::Symbol, s.as_ref())),
        JsValue::Object(object) => object,
    };

    let kind = value.value_type();
    match &*object.class() {
        ObjectClass::Function(function) => {
            return Ok(CanonicalValue::tagged_string(ValueType::Function, function.name()))
        }
        ObjectClass::Promise(_) => {
            return Ok(CanonicalValue::object(CanonicalObject::with_kind(
                ValueType::Promise,
                Vec::new(),
            )))
        }
        ObjectClass::Binary { kind, bytes } => return Ok(CanonicalValue::binary(*kind, bytes.clone())),
        ObjectClass::Boxed(inner) => {
            let inner = clone_value(inner, ctx)?;
            return Ok(CanonicalValue::boxed(kind, &inner).unwrap_or_default());
        }
        ObjectClass::Plain | ObjectClass::Array => {}
    }

    ctx.enter(object)?;
    let mut entries = Vec::new();
    for (key, member) in object.entries() {
        match clone_value(&member, ctx) {
            Ok(value) => entries.push(ObjectEntry { key, value }),
            Err(err) => {
                ctx.exit();
                return Err(err);
            }
        }
    }
    ctx.exit();

    let cloned = if object.is_array() {
        CanonicalObject::sparse_array(entries, object.array_length())
    } else {
        CanonicalObject::new(entries)
    };
    Ok(CanonicalValue::object(cloned))
}
