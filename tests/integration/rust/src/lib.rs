//! Cross-crate test support for the player bridge.
//!
//! [`FakeShaka`] installs a scripted stand-in for the `shaka` namespace: a
//! `shaka.Player` constructor whose instances record every call, keep a
//! configuration object, and expose a networking engine that stores the
//! filters the bridge registers. The helpers below play the part of the
//! script side: dispatching events and pushing requests through the
//! registered filters.

use async_runtime::{promise, Future, TaskPriority};
use core_types::json::from_json;
use core_types::{convert, CanonicalValue, Error, FromCanonical, Result, ToCanonical};
use js_engine::{JsObject, JsValue, Persistent, Realm};
use parking_lot::Mutex;
use player::{JsManager, JsManagerConfig, SetupResult};
use serde_json::json;
use std::sync::Arc;
use web_platform::RequestType;

/// Version reported by `shaka.Player.version`.
pub const FAKE_VERSION: &str = "v4.3.0-fake";

/// Uri prefix that makes the fake's `load` reject.
pub const FAILING_URI: &str = "https://fail.example/";

/// Element id that makes the fake's `attach` reject.
pub const BROKEN_VIDEO: &str = "broken";

/// One recorded call on a fake player.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Method name, or `constructor`
    pub method: String,
    /// Arguments as they arrived
    pub args: Vec<CanonicalValue>,
}

/// Recorder shared by every fake player in one realm.
#[derive(Clone, Default)]
pub struct FakeShaka {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeShaka {
    /// A recorder with no calls yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a manager with the fake installed.
    pub fn start(&self) -> SetupResult<JsManager> {
        self.start_with(JsManagerConfig::default())
    }

    /// Starts a manager with `config` and the fake installed.
    pub fn start_with(&self, config: JsManagerConfig) -> SetupResult<JsManager> {
        let fake = self.clone();
        JsManager::with_bootstrap(config, move |realm| fake.install(realm))
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of calls to `method`.
    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.method == method).count()
    }

    /// Arguments of the latest call to `method`.
    pub fn last_args(&self, method: &str) -> Option<Vec<CanonicalValue>> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|call| call.method == method)
            .map(|call| call.args.clone())
    }

    /// Installs `shaka.log` and `shaka.Player` on the global object.
    pub fn install(&self, realm: &Realm) -> Result<()> {
        let shaka = realm.new_object();

        let log = realm.new_object();
        log.set("currentLevel", JsValue::Number(3.0));
        log.set(
            "setLevel",
            realm.new_function("setLevel", |_, this, args| {
                if let Some(log) = this.as_object() {
                    log.set("currentLevel", arg(args, 0));
                }
                Ok(JsValue::Undefined)
            }),
        );
        shaka.set("log", JsValue::Object(log));

        let calls = Arc::clone(&self.calls);
        let player = realm.new_function("Player", move |realm, this, args| {
            record(&calls, realm, "constructor", args);
            let instance = this.as_object().ok_or_else(|| realm.new_type_error("Player needs new"))?;
            build_player(realm, instance, &calls);
            Ok(JsValue::Undefined)
        });
        if let Some(constructor) = player.as_object() {
            constructor.set("version", JsValue::string(FAKE_VERSION));
        }
        shaka.set("Player", player);

        realm.global().set("shaka", JsValue::Object(shaka));
        Ok(())
    }
}

impl std::fmt::Debug for FakeShaka {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeShaka").field("calls", &self.calls.lock().len()).finish()
    }
}

/// Calls the listener the bridge registered for `event` with `event_object`.
pub fn emit(manager: &JsManager, player: Persistent, event: &str, event_object: CanonicalValue) -> Future<()> {
    let event = event.to_string();
    manager.with_realm(move |realm| {
        let listener = listeners(realm, player)?.get(&event);
        let payload = realm.from_canonical(&event_object);
        realm
            .call(&listener, &JsValue::Undefined, &[payload])
            .map(drop)
            .map_err(|thrown| realm.to_error(&thrown))
    })
}

/// Passes `value` to the request filter the bridge registered on the fake's
/// networking engine and returns the object as the script sees it after.
pub fn filter_request<T>(manager: &JsManager, player: Persistent, ty: RequestType, value: &T) -> Future<T>
where
    T: ToCanonical + FromCanonical + Send + 'static,
{
    run_registered(manager, player, "requestFilters", ty, value.to_canonical())
}

/// Response counterpart of [`filter_request`].
pub fn filter_response<T>(manager: &JsManager, player: Persistent, ty: RequestType, value: &T) -> Future<T>
where
    T: ToCanonical + FromCanonical + Send + 'static,
{
    run_registered(manager, player, "responseFilters", ty, value.to_canonical())
}

fn run_registered<T>(
    manager: &JsManager,
    player: Persistent,
    list: &'static str,
    ty: RequestType,
    value: CanonicalValue,
) -> Future<T>
where
    T: FromCanonical + Send + 'static,
{
    let (promise, future) = promise::pair();
    manager.main_thread().post(TaskPriority::Immediate, "fake networking engine", move || {
        let realm = Realm::current();
        let engine = match resolve(&realm, player) {
            Ok(player) => player.get("__engine"),
            Err(err) => {
                promise.reject(err);
                return;
            }
        };
        let hooks = realm.get_member(&engine, list);
        let Some(hook) = hooks.as_object().map(|hooks| hooks.get("0")).filter(JsValue::is_function) else {
            promise.reject(Error::invocation(format!("no {} registered", list)));
            return;
        };
        let target = realm.from_canonical(&value);
        let args = [JsValue::Number(f64::from(ty.code())), target.clone()];
        let pending = match realm.call(&hook, &JsValue::Undefined, &args) {
            Ok(pending) => pending,
            Err(thrown) => {
                promise.reject(realm.to_error(&thrown));
                return;
            }
        };
        realm.on_promise_settled(&pending, move |realm, settled| {
            let result = match settled {
                Ok(_) => realm
                    .to_canonical(&target)
                    .map_err(Error::from)
                    .and_then(|value| convert(list, &value)),
                Err(reason) => Err(realm.to_error(&reason)),
            };
            promise.settle(result);
        });
    });
    future
}

fn resolve(realm: &Realm, player: Persistent) -> Result<JsObject> {
    match realm.resolve(player)? {
        JsValue::Object(object) => Ok(object),
        other => Err(Error::invocation(format!("player handle holds {}", other))),
    }
}

fn listeners(realm: &Realm, player: Persistent) -> Result<JsObject> {
    resolve(realm, player)?
        .get("__listeners")
        .as_object()
        .cloned()
        .ok_or_else(|| Error::invocation("player has no listeners"))
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

fn record(calls: &Mutex<Vec<Call>>, realm: &Realm, method: &str, args: &[JsValue]) {
    let args = args
        .iter()
        .map(|value| realm.to_canonical(value).unwrap_or_else(|_| CanonicalValue::undefined()))
        .collect();
    calls.lock().push(Call {
        method: method.to_string(),
        args,
    });
}

fn default_configuration() -> serde_json::Value {
    json!({
        "streaming": {"bufferingGoal": 10, "rebufferingGoal": 2, "alwaysStreamText": false},
        "manifest": {"dash": {"clockSyncUri": ""}},
        "preferredAudioLanguage": "",
    })
}

fn script_error(realm: &Realm, message: &str, code: f64) -> JsValue {
    let error = realm.new_error(message);
    if let Some(object) = error.as_object() {
        object.set("category", JsValue::Number(1.0));
        object.set("code", JsValue::Number(code));
        object.set("severity", JsValue::Number(2.0));
    }
    error
}

type Body = fn(&Realm, &JsObject, &[JsValue]) -> std::result::Result<JsValue, JsValue>;

fn build_player(realm: &Realm, instance: &JsObject, calls: &Arc<Mutex<Vec<Call>>>) {
    instance.set("__listeners", JsValue::Object(realm.new_object()));
    instance.set("__config", realm.from_canonical(&from_json(&default_configuration())));
    instance.set("__asset", JsValue::Null);
    instance.set("__textVisible", JsValue::Boolean(false));

    let engine = realm.new_object();
    for (register, list) in [("registerRequestFilter", "requestFilters"), ("registerResponseFilter", "responseFilters")] {
        engine.set(list, JsValue::Object(realm.new_array([])));
        engine.set(
            register,
            realm.new_function(register, move |_, this, args| {
                if let Some(hooks) = this.as_object().and_then(|engine| engine.get(list).as_object().cloned()) {
                    hooks.push(arg(args, 0));
                }
                Ok(JsValue::Undefined)
            }),
        );
    }
    instance.set("__engine", JsValue::Object(engine));

    let methods: &[(&'static str, Body)] = &[
        ("addEventListener", |_, player, args| {
            if let (Some(listeners), Some(event)) = (player.get("__listeners").as_object(), arg(args, 0).as_str()) {
                listeners.set(event, arg(args, 1));
            }
            Ok(JsValue::Undefined)
        }),
        ("getNetworkingEngine", |_, player, _| Ok(player.get("__engine"))),
        ("attach", |realm, _, args| {
            let video = arg(args, 0);
            if realm.get_member(&video, "id").as_str() == Some(BROKEN_VIDEO) {
                return Ok(realm.rejected_promise(script_error(realm, "cannot attach", 7000.0)));
            }
            Ok(realm.resolved_promise(JsValue::Undefined))
        }),
        ("detach", |realm, _, _| Ok(realm.resolved_promise(JsValue::Undefined))),
        ("load", |realm, player, args| {
            let uri = arg(args, 0);
            if uri.as_str().is_some_and(|uri| uri.starts_with(FAILING_URI)) {
                return Ok(realm.rejected_promise(script_error(realm, "HTTP 404", 1001.0)));
            }
            player.set("__asset", uri);
            Ok(realm.resolved_promise(JsValue::Undefined))
        }),
        ("unload", |realm, player, _| {
            player.set("__asset", JsValue::Null);
            Ok(realm.resolved_promise(JsValue::Undefined))
        }),
        ("destroy", |realm, _, _| Ok(realm.resolved_promise(JsValue::Undefined))),
        ("configure", configure),
        ("getConfiguration", |_, player, _| Ok(player.get("__config"))),
        ("resetConfiguration", |realm, player, _| {
            player.set("__config", realm.from_canonical(&from_json(&default_configuration())));
            Ok(JsValue::Undefined)
        }),
        ("retryStreaming", |_, _, _| Ok(JsValue::Undefined)),
        ("isAudioOnly", |_, _, _| Ok(JsValue::Boolean(false))),
        ("isBuffering", |_, _, _| Ok(JsValue::Boolean(false))),
        ("isInProgress", |_, _, _| Ok(JsValue::Boolean(false))),
        ("isLive", |_, player, _| Ok(JsValue::Boolean(player.get("__asset").as_str().is_some_and(|uri| uri.contains("live"))))),
        ("isTextTrackVisible", |_, player, _| Ok(player.get("__textVisible"))),
        ("setTextTrackVisibility", |_, player, args| {
            player.set("__textVisible", JsValue::Boolean(arg(args, 0).as_bool().unwrap_or(false)));
            Ok(JsValue::Undefined)
        }),
        ("usingEmbeddedTextTrack", |_, _, _| Ok(JsValue::Boolean(false))),
        ("assetUri", |_, player, _| Ok(player.get("__asset"))),
        ("drmInfo", |_, _, _| Ok(JsValue::Null)),
        ("keySystem", |_, _, _| Ok(JsValue::string(""))),
        ("getExpiration", |_, _, _| Ok(JsValue::Number(f64::INFINITY))),
        ("getAudioLanguagesAndRoles", |realm, _, _| {
            Ok(realm.from_canonical(&from_json(&json!([{"language": "en", "role": "main"}]))))
        }),
        ("getTextLanguagesAndRoles", |realm, _, _| {
            Ok(realm.from_canonical(&from_json(&json!([{"language": "fr", "role": ""}]))))
        }),
        ("getBufferedInfo", |realm, _, _| {
            Ok(realm.from_canonical(&from_json(&json!({
                "total": [{"start": 0, "end": 12.5}],
                "audio": [{"start": 0, "end": 12.5}],
                "video": [{"start": 0, "end": 14}],
                "text": [],
            }))))
        }),
        ("seekRange", |realm, _, _| Ok(realm.from_canonical(&from_json(&json!({"start": 0, "end": 30}))))),
        ("getStats", |realm, _, _| {
            let stats = realm.from_canonical(&from_json(&json!({
                "width": 1280, "height": 720, "streamBandwidth": 2_000_000, "playTime": 4.5,
            })));
            if let Some(object) = stats.as_object() {
                object.set("loadLatency", JsValue::Number(f64::NAN));
            }
            Ok(stats)
        }),
        ("getVariantTracks", |realm, _, _| {
            Ok(realm.from_canonical(&from_json(&json!([
                {"id": 1, "active": true, "type": "variant", "bandwidth": 2_000_000, "language": "en",
                 "width": 1280, "height": 720, "mimeType": "video/mp4", "roles": ["main"]},
                {"id": 2, "active": false, "type": "variant", "bandwidth": 500_000, "language": "en",
                 "width": 640, "height": 360, "mimeType": "video/mp4", "roles": []},
            ]))))
        }),
        ("getTextTracks", |realm, _, _| {
            Ok(realm.from_canonical(&from_json(&json!([
                {"id": 3, "active": false, "type": "text", "bandwidth": 0, "language": "fr",
                 "kind": "subtitle", "mimeType": "text/vtt"},
            ]))))
        }),
        ("selectAudioLanguage", |_, _, _| Ok(JsValue::Undefined)),
        ("selectTextLanguage", |_, _, _| Ok(JsValue::Undefined)),
        ("selectEmbeddedTextTrack", |_, _, _| Ok(JsValue::Undefined)),
        ("selectTextTrack", |_, _, _| Ok(JsValue::Undefined)),
        ("selectVariantTrack", |_, _, _| Ok(JsValue::Undefined)),
        ("addTextTrack", |realm, _, args| {
            let text = |index| arg(args, index).as_str().map(str::to_string);
            let track = json!({
                "id": 9, "active": false, "type": "text", "bandwidth": 0,
                "language": text(1), "kind": text(2), "mimeType": text(3),
                "codecs": text(4), "label": text(5),
            });
            Ok(realm.resolved_promise(realm.from_canonical(&from_json(&track))))
        }),
    ];

    for &(name, body) in methods {
        let calls = Arc::clone(calls);
        instance.set(
            name,
            realm.new_function(name, move |realm, this, args| {
                record(&calls, realm, name, args);
                let player = this.as_object().ok_or_else(|| realm.new_type_error("method called without a player"))?;
                body(realm, player, args)
            }),
        );
    }
}

/// `configure(path, value)`: sets an existing leaf. `undefined` restores the
/// default. Unknown paths are refused.
fn configure(realm: &Realm, player: &JsObject, args: &[JsValue]) -> std::result::Result<JsValue, JsValue> {
    let Some(path) = arg(args, 0).as_str().map(str::to_string) else {
        return Err(realm.new_type_error("configure needs a path"));
    };
    let segments: Vec<&str> = path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Ok(JsValue::Boolean(false));
    };
    let config = player.get("__config");
    let parent = match realm.get_descendant(&config, parents) {
        Ok(JsValue::Object(parent)) if parent.has(leaf) => parent,
        _ => return Ok(JsValue::Boolean(false)),
    };
    let value = match arg(args, 1) {
        JsValue::Undefined => {
            let defaults = realm.from_canonical(&from_json(&default_configuration()));
            realm.get_descendant(&defaults, &segments).unwrap_or(JsValue::Undefined)
        }
        value => value,
    };
    parent.set(leaf, value);
    Ok(JsValue::Boolean(true))
}
