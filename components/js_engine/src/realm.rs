//! The realm: global object, call machinery and persistent handles.
//!
//! A realm is installed into a thread-local on the thread that owns it and
//! is reachable from there through [`Realm::current`]. Nothing here is
//! `Send`; other threads refer to runtime objects through [`Persistent`]
//! ids and marshal work onto the owning thread.

use crate::error::{RealmError, Result};
use crate::value::{JsObject, JsValue, NativeFunction};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

thread_local! {
    static CURRENT: RefCell<Option<Realm>> = const { RefCell::new(None) };
}

/// Realm construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealmOptions {
    /// Deepest nesting accepted when cloning to canonical form.
    pub max_clone_depth: usize,
}

impl Default for RealmOptions {
    fn default() -> Self {
        Self { max_clone_depth: 64 }
    }
}

/// A `Send` reference to a runtime value owned by a realm's handle table.
///
/// The value stays alive until [`Realm::release`] is called with the handle.
/// Handles may only be dereferenced on the realm's thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Persistent(u64);

impl Persistent {
    /// Raw id, for logging.
    pub fn id(self) -> u64 {
        self.0
    }
}

struct RealmInner {
    global: JsObject,
    options: RealmOptions,
    handles: RefCell<HashMap<u64, JsValue>>,
    next_handle: Cell<u64>,
}

/// A runtime instance.
#[derive(Clone)]
pub struct Realm {
    inner: Rc<RealmInner>,
}

impl Realm {
    /// Creates a realm with an empty global object.
    pub fn new(options: RealmOptions) -> Self {
        Self {
            inner: Rc::new(RealmInner {
                global: JsObject::plain(),
                options,
                handles: RefCell::new(HashMap::new()),
                next_handle: Cell::new(1),
            }),
        }
    }

    /// Makes this realm current on the calling thread, replacing any other.
    pub fn install(self) {
        CURRENT.with(|current| *current.borrow_mut() = Some(self));
    }

    /// Removes the calling thread's realm.
    pub fn uninstall() -> Option<Realm> {
        CURRENT.with(|current| current.borrow_mut().take())
    }

    /// The calling thread's realm, if any.
    pub fn try_current() -> Result<Realm> {
        CURRENT
            .with(|current| current.borrow().clone())
            .ok_or(RealmError::NotInstalled)
    }

    /// The calling thread's realm.
    ///
    /// # Panics
    ///
    /// Panics when no realm is installed: runtime values must only be touched
    /// on the thread that owns them.
    pub fn current() -> Realm {
        match Self::try_current() {
            Ok(realm) => realm,
            Err(err) => panic!("{}", err),
        }
    }

    /// Construction options.
    pub fn options(&self) -> RealmOptions {
        self.inner.options
    }

    /// The global object.
    pub fn global(&self) -> JsObject {
        self.inner.global.clone()
    }

    /// Reads `name` from `target`; non-objects have no members.
    pub fn get_member(&self, target: &JsValue, name: &str) -> JsValue {
        match target {
            JsValue::Object(object) => object.get(name),
            _ => JsValue::Undefined,
        }
    }

    /// Writes `name` on `target`.
    pub fn set_member(&self, target: &JsObject, name: &str, value: JsValue) {
        target.set(name, value);
    }

    /// Follows `path` member by member starting at `root`.
    ///
    /// Every value the walk reads a member from must be an object; the last
    /// segment may be absent, in which case the result is `undefined`.
    pub fn get_descendant(&self, root: &JsValue, path: &[&str]) -> Result<JsValue> {
        let mut current = root.clone();
        for segment in path {
            if current.as_object().is_none() {
                return Err(RealmError::NotAnObject {
                    path: path.join("."),
                    segment: segment.to_string(),
                });
            }
            current = self.get_member(&current, segment);
        }
        Ok(current)
    }

    /// Resolves a dotted path from the global object.
    pub fn get_global_path(&self, path: &str) -> Result<JsValue> {
        let segments: Vec<&str> = path.split('.').collect();
        self.get_descendant(&JsValue::Object(self.global()), &segments)
    }

    /// Calls `function` with `this`. A non-callable throws a `TypeError`.
    pub fn call(&self, function: &JsValue, this: &JsValue, args: &[JsValue]) -> std::result::Result<JsValue, JsValue> {
        let native = function.as_object().and_then(JsObject::as_function);
        match native {
            Some(native) => native.call(self, this, args),
            None => Err(self.new_type_error(&format!("{} is not a function", function))),
        }
    }

    /// Calls the member `name` of `target` with `target` as `this`.
    pub fn invoke_member(&self, target: &JsValue, name: &str, args: &[JsValue]) -> std::result::Result<JsValue, JsValue> {
        let member = self.get_member(target, name);
        if !member.is_function() {
            return Err(self.new_type_error(&format!("'{}' is not a function", name)));
        }
        self.call(&member, target, args)
    }

    /// Runs `constructor` against a fresh object.
    ///
    /// The constructor's return value replaces the fresh object when it is an
    /// object itself.
    pub fn construct(&self, constructor: &JsValue, args: &[JsValue]) -> std::result::Result<JsValue, JsValue> {
        let this = JsValue::Object(JsObject::plain());
        match self.call(constructor, &this, args)? {
            result @ JsValue::Object(_) => Ok(result),
            _ => Ok(this),
        }
    }

    /// Keeps `value` alive until released and returns its handle.
    pub fn persist(&self, value: JsValue) -> Persistent {
        let id = self.inner.next_handle.get();
        self.inner.next_handle.set(id + 1);
        self.inner.handles.borrow_mut().insert(id, value);
        Persistent(id)
    }

    /// Dereferences a handle.
    pub fn resolve(&self, handle: Persistent) -> Result<JsValue> {
        self.inner
            .handles
            .borrow()
            .get(&handle.0)
            .cloned()
            .ok_or(RealmError::StaleHandle(handle.0))
    }

    /// Drops the table's reference. Returns false for an unknown handle.
    pub fn release(&self, handle: Persistent) -> bool {
        self.inner.handles.borrow_mut().remove(&handle.0).is_some()
    }

    /// Number of live handles.
    pub fn live_handles(&self) -> usize {
        self.inner.handles.borrow().len()
    }

    /// Creates an empty object.
    pub fn new_object(&self) -> JsObject {
        JsObject::plain()
    }

    /// Creates an array.
    pub fn new_array(&self, items: impl IntoIterator<Item = JsValue>) -> JsObject {
        JsObject::array(items)
    }

    /// Creates a callable.
    pub fn new_function<F>(&self, name: &str, f: F) -> JsValue
    where
        F: Fn(&Realm, &JsValue, &[JsValue]) -> std::result::Result<JsValue, JsValue> + 'static,
    {
        JsValue::Object(JsObject::function(NativeFunction::new(name, f)))
    }

    /// Creates an `Error` object with `message`.
    pub fn new_error(&self, message: &str) -> JsValue {
        self.error_object("Error", message)
    }

    /// Creates a `TypeError` object with `message`.
    pub fn new_type_error(&self, message: &str) -> JsValue {
        self.error_object("TypeError", message)
    }

    fn error_object(&self, name: &str, message: &str) -> JsValue {
        let error = JsObject::plain();
        error.set("name", JsValue::string(name));
        error.set("message", JsValue::string(message));
        JsValue::Object(error)
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("options", &self.inner.options)
            .field("live_handles", &self.live_handles())
            .finish()
    }
}
