//! Runtime value representation.
//!
//! Values are reference counted and single-threaded: they may only exist on
//! the thread that owns the [`Realm`](crate::Realm). Native code on other
//! threads sees them only as [`CanonicalValue`](core_types::CanonicalValue)s
//! or [`Persistent`](crate::Persistent) handles.

use crate::promise::PromiseState;
use crate::realm::Realm;
use core_types::ValueType;
use indexmap::IndexMap;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Signature of a native function: `(realm, this, args) -> value or thrown value`.
pub type NativeFn = dyn Fn(&Realm, &JsValue, &[JsValue]) -> Result<JsValue, JsValue>;

/// A callable implemented in Rust.
#[derive(Clone)]
pub struct NativeFunction {
    name: Rc<str>,
    call: Rc<NativeFn>,
}

impl NativeFunction {
    /// Wraps a closure.
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Realm, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
    {
        Self {
            name: Rc::from(name),
            call: Rc::new(f),
        }
    }

    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the function.
    pub fn call(&self, realm: &Realm, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
        (self.call)(realm, this, args)
    }
}

/// Internal class of an object.
pub enum ObjectClass {
    /// Ordinary object
    Plain,
    /// Array; elements are stored under decimal keys
    Array,
    /// Callable object
    Function(NativeFunction),
    /// Promise with its settlement state
    Promise(PromiseState),
    /// `ArrayBuffer`, typed array or `DataView`
    Binary {
        /// Which binary kind
        kind: ValueType,
        /// Backing bytes
        bytes: Vec<u8>,
    },
    /// Boxed primitive (`new Number(1)`, ...)
    Boxed(JsValue),
}

struct ObjectData {
    class: RefCell<ObjectClass>,
    properties: RefCell<IndexMap<String, JsValue>>,
}

/// A reference to a runtime object.
#[derive(Clone)]
pub struct JsObject(Rc<ObjectData>);

impl JsObject {
    /// Creates an object of the given class with no properties.
    pub fn with_class(class: ObjectClass) -> Self {
        Self(Rc::new(ObjectData {
            class: RefCell::new(class),
            properties: RefCell::new(IndexMap::new()),
        }))
    }

    /// Creates an ordinary object.
    pub fn plain() -> Self {
        Self::with_class(ObjectClass::Plain)
    }

    /// Creates an array from elements.
    pub fn array(items: impl IntoIterator<Item = JsValue>) -> Self {
        let object = Self::with_class(ObjectClass::Array);
        for (index, item) in items.into_iter().enumerate() {
            object.set(&index.to_string(), item);
        }
        object
    }

    /// Creates a binary object.
    pub fn binary(kind: ValueType, bytes: Vec<u8>) -> Self {
        Self::with_class(ObjectClass::Binary { kind, bytes })
    }

    /// Creates a callable object.
    pub fn function(function: NativeFunction) -> Self {
        Self::with_class(ObjectClass::Function(function))
    }

    /// Borrows the internal class.
    pub fn class(&self) -> Ref<'_, ObjectClass> {
        self.0.class.borrow()
    }

    pub(crate) fn class_mut(&self) -> RefMut<'_, ObjectClass> {
        self.0.class.borrow_mut()
    }

    /// Reads a property; absent properties read as `undefined`.
    pub fn get(&self, key: &str) -> JsValue {
        self.0
            .properties
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(JsValue::Undefined)
    }

    /// Returns true if the property exists.
    pub fn has(&self, key: &str) -> bool {
        self.0.properties.borrow().contains_key(key)
    }

    /// Writes a property, keeping the original insertion position.
    pub fn set(&self, key: &str, value: JsValue) {
        self.0.properties.borrow_mut().insert(key.to_string(), value);
    }

    /// Removes a property.
    pub fn remove(&self, key: &str) -> Option<JsValue> {
        self.0.properties.borrow_mut().shift_remove(key)
    }

    /// Snapshot of the properties in insertion order.
    pub fn entries(&self) -> Vec<(String, JsValue)> {
        self.0
            .properties
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Array length: one past the highest index, or zero.
    pub fn array_length(&self) -> u32 {
        self.0
            .properties
            .borrow()
            .keys()
            .filter_map(|k| array_index(k))
            .filter_map(|i| i.checked_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Appends to an array.
    pub fn push(&self, value: JsValue) {
        let index = self.array_length();
        self.set(&index.to_string(), value);
    }

    /// Returns true for arrays.
    pub fn is_array(&self) -> bool {
        matches!(*self.class(), ObjectClass::Array)
    }

    /// Returns true for callables.
    pub fn is_function(&self) -> bool {
        matches!(*self.class(), ObjectClass::Function(_))
    }

    /// Returns true for promises.
    pub fn is_promise(&self) -> bool {
        matches!(*self.class(), ObjectClass::Promise(_))
    }

    /// The native function, if callable.
    pub fn as_function(&self) -> Option<NativeFunction> {
        match &*self.class() {
            ObjectClass::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match &*self.class() {
            ObjectClass::Plain => "Object".to_string(),
            ObjectClass::Array => "Array".to_string(),
            ObjectClass::Function(func) => format!("Function({})", func.name()),
            ObjectClass::Promise(_) => "Promise".to_string(),
            ObjectClass::Binary { kind, bytes } => format!("{}({} bytes)", kind, bytes.len()),
            ObjectClass::Boxed(_) => "Boxed".to_string(),
        };
        write!(f, "JsObject({})", class)
    }
}

/// Any runtime value.
#[derive(Clone, Debug)]
pub enum JsValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Boolean(bool),
    /// Number primitive
    Number(f64),
    /// String primitive
    String(Rc<str>),
    /// Symbol with its description
    Symbol(Rc<str>),
    /// Any object
    Object(JsObject),
}

impl JsValue {
    /// Creates a string value.
    pub fn string(s: &str) -> Self {
        JsValue::String(Rc::from(s))
    }

    /// The object, if this is one.
    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The string, if this is a string primitive.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number, if this is a number primitive.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean primitive.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// True for undefined and null.
    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    /// True for callable objects.
    pub fn is_function(&self) -> bool {
        self.as_object().is_some_and(JsObject::is_function)
    }

    /// True for promise objects.
    pub fn is_promise(&self) -> bool {
        self.as_object().is_some_and(JsObject::is_promise)
    }

    /// The runtime type tag, as used by the canonical representation.
    pub fn value_type(&self) -> ValueType {
        match self {
            JsValue::Undefined => ValueType::Undefined,
            JsValue::Null => ValueType::Null,
            JsValue::Boolean(_) => ValueType::Boolean,
            JsValue::Number(_) => ValueType::Number,
            JsValue::String(_) => ValueType::String,
            JsValue::Symbol(_) => ValueType::Symbol,
            JsValue::Object(object) => match &*object.class() {
                ObjectClass::Plain => ValueType::OtherObject,
                ObjectClass::Array => ValueType::Array,
                ObjectClass::Function(_) => ValueType::Function,
                ObjectClass::Promise(_) => ValueType::Promise,
                ObjectClass::Binary { kind, .. } => *kind,
                ObjectClass::Boxed(inner) => match inner {
                    JsValue::Boolean(_) => ValueType::BooleanObject,
                    JsValue::Number(_) => ValueType::NumberObject,
                    _ => ValueType::StringObject,
                },
            },
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::string(s)
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::String(s) => write!(f, "{}", s),
            JsValue::Symbol(s) => write!(f, "Symbol({})", s),
            JsValue::Object(o) if o.is_function() => write!(f, "function"),
            JsValue::Object(_) => write!(f, "[object Object]"),
        }
    }
}

/// Parses an array index: a canonical decimal below `2^32 - 1`. Other keys,
/// "4294967295" and "01" included, are ordinary properties.
fn array_index(key: &str) -> Option<u32> {
    let index = key.parse::<u32>().ok()?;
    (index < u32::MAX && index.to_string() == key).then_some(index)
}
