//! Reference scripting runtime behind the player bridge.
//!
//! This is not a script engine: there is no parser or VM. It provides the
//! runtime boundary the bridge is written against:
//!
//! - [`JsValue`] / [`JsObject`] - the object model, with ordered properties
//! - [`Realm`] - global path resolution, calls, construction and the
//!   [`Persistent`] handle table
//! - runtime promises with synchronous reactions
//! - cloning to and from [`CanonicalValue`](core_types::CanonicalValue)
//!
//! Hosts populate the global object with native functions; the player
//! script in production is replaced by whatever the host installs.
//!
//! # Examples
//!
//! ```
//! use js_engine::{JsValue, Realm, RealmOptions};
//!
//! let realm = Realm::new(RealmOptions::default());
//! let shaka = realm.new_object();
//! shaka.set("version", JsValue::string("v4.3.0"));
//! realm.global().set("shaka", JsValue::Object(shaka));
//!
//! let version = realm.get_global_path("shaka.version").unwrap();
//! assert_eq!(version.as_str(), Some("v4.3.0"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod clone;
mod error;
mod promise;
mod realm;
mod value;

pub use error::{RealmError, Result};
pub use promise::{PromiseState, Reaction};
pub use realm::{Persistent, Realm, RealmOptions};
pub use value::{JsObject, JsValue, NativeFn, NativeFunction, ObjectClass};
