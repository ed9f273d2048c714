//! Native-side proxy for one runtime object.
//!
//! [`JsObjectWrapper`] holds a [`Persistent`] handle and turns native calls
//! into main-thread tasks: arguments cross as [`CanonicalValue`]s, the task
//! invokes the member, and the result (or thrown value) comes back through a
//! [`Future`]. Runtime promises returned by a member are followed with a
//! reaction instead of blocking the main thread.

use async_runtime::{promise, Future, MainThread, Promise, TaskPriority};
use core_types::{convert, CanonicalValue, Error, FromCanonical, Result};
use js_engine::{JsValue, Persistent, Realm};
use parking_lot::Mutex;
use std::sync::Arc;

/// Band for calls on a held object. The constructor task runs in the
/// internal band, ahead of all of them.
const HELD_OBJECT_BAND: TaskPriority = TaskPriority::Immediate;

/// Proxy for a runtime object living on the main thread.
pub struct JsObjectWrapper {
    main: MainThread,
    handle: Arc<Mutex<Option<Persistent>>>,
}

impl JsObjectWrapper {
    /// A wrapper with no object yet; see [`JsObjectWrapper::construct`].
    pub fn new(main: MainThread) -> Self {
        Self {
            main,
            handle: Arc::new(Mutex::new(None)),
        }
    }

    /// The held object, once initialized.
    pub fn handle(&self) -> Option<Persistent> {
        *self.handle.lock()
    }

    /// The main thread calls are marshaled to.
    pub fn main_thread(&self) -> &MainThread {
        &self.main
    }

    /// Constructs the object with the constructor at dotted
    /// `constructor_path`, then runs `setup` on it.
    ///
    /// Runs as an internal task, so it goes ahead of any call queued
    /// afterwards. The handle is stored before `setup` runs; a failing
    /// `setup` fails the returned future but keeps the object.
    pub fn construct<F>(&self, constructor_path: &str, args: Vec<CanonicalValue>, setup: F) -> Future<()>
    where
        F: FnOnce(&Realm, &JsValue) -> Result<()> + Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        let path = constructor_path.to_string();
        let task_name = format!("{} ctor", constructor_path);
        schedule(&self.main, TaskPriority::Internal, &task_name, move |realm, promise| {
            let constructor = realm.get_global_path(&path).unwrap_or(JsValue::Undefined);
            if !constructor.is_function() {
                tracing::error!(constructor = %path, "constructor is missing; is the player script loaded?");
                promise.reject(Error::construction(format!("The constructor '{}' is not found.", path)));
                return;
            }
            let args = to_runtime_args(realm, &args);
            let instance = match realm.construct(&constructor, &args) {
                Ok(instance) => instance,
                Err(thrown) => {
                    promise.reject(realm.to_error(&thrown));
                    return;
                }
            };
            let persistent = realm.persist(instance.clone());
            if let Some(previous) = handle.lock().replace(persistent) {
                realm.release(previous);
            }
            promise.settle(setup(realm, &instance));
        })
    }

    /// Calls `name` on the held object.
    ///
    /// Calls made before the object exists still run after a pending
    /// constructor task, since that task is internal.
    pub fn call_method<T>(&self, name: &str, args: Vec<CanonicalValue>) -> Future<T>
    where
        T: FromCanonical + Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        let method = name.to_string();
        self.on_held_object(name, move |realm, promise| {
            let target = match held_object(realm, &handle) {
                Ok(target) => target,
                Err(err) => {
                    promise.reject(err);
                    return;
                }
            };
            let args = to_runtime_args(realm, &args);
            let result = realm.invoke_member(&target, &method, &args);
            settle_call(realm, method, result, promise);
        })
    }

    /// Calls the function at dotted `path` from the global object, with its
    /// parent object as `this`.
    pub fn call_global_method<T>(main: &MainThread, path: &str, args: Vec<CanonicalValue>) -> Future<T>
    where
        T: FromCanonical + Send + 'static,
    {
        let path = path.to_string();
        schedule(main, TaskPriority::Immediate, "call_global_method", move |realm, promise| {
            let (parent, method) = match path.rsplit_once('.') {
                Some((parent, method)) => (realm.get_global_path(parent), method),
                None => (Ok(JsValue::Object(realm.global())), path.as_str()),
            };
            let parent = match parent {
                Ok(parent) => parent,
                Err(err) => {
                    promise.reject(err.into());
                    return;
                }
            };
            let function = realm.get_member(&parent, method);
            if !function.is_function() {
                promise.reject(Error::invocation(format!("'{}' is not a function", path)));
                return;
            }
            let args = to_runtime_args(realm, &args);
            let result = realm.call(&function, &parent, &args);
            settle_call(realm, path.clone(), result, promise);
        })
    }

    /// Reads the value at dotted `path` from the global object.
    pub fn get_global_field<T>(main: &MainThread, path: &str) -> Future<T>
    where
        T: FromCanonical + Send + 'static,
    {
        let path = path.to_string();
        schedule(main, TaskPriority::Immediate, "get_global_field", move |realm, promise| {
            let result = realm
                .get_global_path(&path)
                .map_err(Error::from)
                .and_then(|value| to_native(realm, &path, &value));
            promise.settle(result);
        })
    }

    /// Reads the member `name` of the held object.
    pub fn get_member<T>(&self, name: &str) -> Future<T>
    where
        T: FromCanonical + Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        let name = name.to_string();
        self.on_held_object("get_member", move |realm, promise| {
            let result = held_object(realm, &handle)
                .and_then(|target| to_native(realm, &name, &realm.get_member(&target, &name)));
            promise.settle(result);
        })
    }

    /// Reads a value from the object's `getConfiguration()` result by dotted
    /// path, e.g. `streaming.bufferingGoal`.
    ///
    /// Runs inline when called on the main thread. A missing segment or a
    /// value of the wrong type is a conversion error naming the full path.
    pub fn get_config_value<T>(&self, name_path: &str) -> Future<T>
    where
        T: FromCanonical + Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        let name_path = name_path.to_string();
        let read = move |realm: &Realm| -> Result<T> {
            let target = held_object(realm, &handle)?;
            let configuration = realm
                .invoke_member(&target, "getConfiguration", &[])
                .map_err(|thrown| realm.to_error(&thrown))?;
            let segments: Vec<&str> = name_path.split('.').collect();
            let value = realm.get_descendant(&configuration, &segments).map_err(|err| {
                Error::conversion(format!("Invalid type for '{}': {}", name_path, err))
            })?;
            to_native(realm, &name_path, &value)
        };
        if self.main.belongs_to_current_thread() {
            return Future::ready(read(&Realm::current()));
        }
        self.on_held_object("get_config_value", move |realm, promise| {
            promise.settle(read(realm));
        })
    }

    /// Calls `destroy` on the held object and waits for it.
    ///
    /// On the main thread the call is made inline and a returned runtime
    /// promise is not waited for.
    pub fn destroy_blocking(&self) {
        if self.handle().is_none() {
            return;
        }
        if self.main.belongs_to_current_thread() {
            let realm = Realm::current();
            let result = held_object(&realm, &self.handle)
                .and_then(|target| realm.invoke_member(&target, "destroy", &[]).map_err(|t| realm.to_error(&t)));
            if let Err(err) = result {
                tracing::warn!(error = %err, "destroy failed");
            }
            return;
        }
        if !self.main.is_running() {
            tracing::debug!("main thread stopped; skipping destroy");
            return;
        }
        if let Err(err) = self.call_method::<()>("destroy", Vec::new()).get() {
            tracing::warn!(error = %err, "destroy failed");
        }
    }

    /// Queues `body` against the held object.
    ///
    /// Every operation on the held object shares one band, so calls from
    /// one thread run in the order they were issued whatever their kind.
    fn on_held_object<T, F>(&self, name: &str, body: F) -> Future<T>
    where
        T: Send + 'static,
        F: FnOnce(&Realm, Promise<T>) + Send + 'static,
    {
        schedule(&self.main, HELD_OBJECT_BAND, name, body)
    }

    /// Releases the held object on the main thread.
    pub fn release(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        let release = move || {
            Realm::current().release(handle);
        };
        if self.main.belongs_to_current_thread() {
            release();
        } else {
            self.main.post(HELD_OBJECT_BAND, "release handle", release);
        }
    }
}

impl Drop for JsObjectWrapper {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for JsObjectWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsObjectWrapper")
            .field("handle", &self.handle())
            .finish()
    }
}

/// Queues `body` on the main thread with the promise for its result.
fn schedule<T, F>(main: &MainThread, priority: TaskPriority, name: &str, body: F) -> Future<T>
where
    T: Send + 'static,
    F: FnOnce(&Realm, Promise<T>) + Send + 'static,
{
    if !main.is_running() {
        return Future::ready(Err(main.stopped_error()));
    }
    let (promise, future) = promise::pair();
    main.post(priority, name, move || body(&Realm::current(), promise));
    future
}

fn held_object(realm: &Realm, handle: &Mutex<Option<Persistent>>) -> Result<JsValue> {
    let handle = (*handle.lock()).ok_or_else(|| Error::invocation("object is not initialized"))?;
    Ok(realm.resolve(handle)?)
}

fn to_runtime_args(realm: &Realm, args: &[CanonicalValue]) -> Vec<JsValue> {
    args.iter().map(|arg| realm.from_canonical(arg)).collect()
}

fn to_native<T: FromCanonical>(realm: &Realm, context: &str, value: &JsValue) -> Result<T> {
    let canonical = realm.to_canonical(value)?;
    convert(context, &canonical)
}

/// Settles `promise` from a call result, following runtime promises.
fn settle_call<T>(realm: &Realm, context: String, result: std::result::Result<JsValue, JsValue>, promise: Promise<T>)
where
    T: FromCanonical + Send + 'static,
{
    match result {
        Err(thrown) => {
            let err = realm.to_error(&thrown);
            tracing::debug!(call = %context, error = %err, "runtime call failed");
            promise.reject(err);
        }
        Ok(value) if value.is_promise() => {
            realm.on_promise_settled(&value, move |realm, settled| {
                settle_call(realm, context, settled, promise);
            });
        }
        Ok(value) => {
            promise.settle(to_native(realm, &context, &value));
        }
    }
}

/// Builds the runtime error object for a native error.
pub(crate) fn error_value(realm: &Realm, err: &Error) -> JsValue {
    let value = realm.new_error(&err.message);
    if let (Some(object), Some(details)) = (value.as_object(), err.details) {
        object.set("category", JsValue::Number(details.category.into()));
        object.set("code", JsValue::Number(details.code.into()));
        object.set("severity", JsValue::Number(details.severity.into()));
    }
    value
}
