//! The native player API.

use crate::js_manager::JsManager;
use crate::proxy::{error_value, JsObjectWrapper};
use crate::types::{
    BufferedInfo, BufferedRange, ConfigValue, DrmInfo, LanguageRole, LogLevel, Stats, Track,
};
use async_runtime::{promise, Future, MainThread, TaskPriority};
use core_types::{
    convert, CanonicalValue, Error, FromCanonical, OptionalNumber, Result, ToCanonical,
};
use js_engine::{JsValue, Persistent, Realm};
use parking_lot::Mutex;
use std::sync::Arc;
use web_platform::{FilterChain, FilterTarget, NetworkFilters, Request, RequestType, Response};

/// Receives player events. Methods run on the main thread.
pub trait Client: Send + Sync {
    /// An asynchronous error from the player.
    fn on_error(&self, error: &Error) {
        let _ = error;
    }

    /// Buffering started or stopped.
    fn on_buffering(&self, is_buffering: bool) {
        let _ = is_buffering;
    }
}

/// A media element the player renders into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoElement {
    id: String,
}

impl VideoElement {
    /// An element identified by `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The element id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl ToCanonical for VideoElement {
    fn to_canonical(&self) -> CanonicalValue {
        core_types::object_from_pairs([("tagName", "VIDEO"), ("id", self.id.as_str())])
    }
}

/// Handle to one player instance in the runtime.
///
/// Every method returns a [`Future`]; the work runs on the manager's main
/// thread. Dropping the player stops its network filters, destroys the
/// script object (waiting for it unless dropped on the main thread) and
/// releases it.
pub struct Player {
    wrapper: JsObjectWrapper,
    filters: FilterChain,
    video: Arc<Mutex<Option<VideoElement>>>,
}

impl Player {
    /// Creates an uninitialized player; call [`Player::initialize`] next.
    pub fn new(manager: &JsManager) -> Self {
        let main = manager.main_thread().clone();
        Self {
            wrapper: JsObjectWrapper::new(main.clone()),
            filters: FilterChain::new(main),
            video: Arc::new(Mutex::new(None)),
        }
    }

    /// Sets the player script's log level.
    pub fn set_log_level(manager: &JsManager, level: LogLevel) -> Future<()> {
        JsObjectWrapper::call_global_method(
            manager.main_thread(),
            "shaka.log.setLevel",
            vec![level.to_canonical()],
        )
    }

    /// The player script's log level.
    pub fn get_log_level(manager: &JsManager) -> Future<LogLevel> {
        JsObjectWrapper::get_global_field(manager.main_thread(), "shaka.log.currentLevel")
    }

    /// The player script's version string.
    pub fn get_player_version(manager: &JsManager) -> Future<String> {
        JsObjectWrapper::get_global_field(manager.main_thread(), "shaka.Player.version")
    }

    /// Constructs the script player, subscribes `client` to its events and
    /// hooks the network filters into its networking engine.
    pub fn initialize(&self, client: Arc<dyn Client>, video: Option<VideoElement>) -> Future<()> {
        let chain = self.filters.clone();
        let main = self.wrapper.main_thread().clone();
        let args = video.iter().map(ToCanonical::to_canonical).collect();
        let constructed = self.wrapper.construct("shaka.Player", args, move |realm, player| {
            attach_listeners(realm, player, client, chain, main)
        });
        match video {
            Some(video) => self.set_video_when_resolved(constructed, Some(video)),
            None => constructed,
        }
    }

    /// Destroys the script player. Network filter runs still in progress
    /// fail once their current filter finishes.
    pub fn destroy(&self) -> Future<()> {
        self.filters.close();
        self.wrapper.call_method("destroy", Vec::new())
    }

    /// Attaches to `video`. The element is recorded only once the call
    /// succeeds.
    pub fn attach(&self, video: VideoElement) -> Future<()> {
        let pending = self.wrapper.call_method("attach", vec![video.to_canonical()]);
        self.set_video_when_resolved(pending, Some(video))
    }

    /// Detaches from the current element.
    pub fn detach(&self) -> Future<()> {
        let pending = self.wrapper.call_method("detach", Vec::new());
        self.set_video_when_resolved(pending, None)
    }

    /// The element the player is attached to.
    pub fn video(&self) -> Option<VideoElement> {
        self.video.lock().clone()
    }

    /// Handle to the script player object, once initialized.
    pub fn handle(&self) -> Option<Persistent> {
        self.wrapper.handle()
    }

    fn set_video_when_resolved(&self, pending: Future<()>, video: Option<VideoElement>) -> Future<()> {
        let slot = Arc::clone(&self.video);
        let (promise, future) = promise::pair();
        pending.on_settled(move |result| {
            if result.is_ok() {
                *slot.lock() = video;
            }
            promise.settle(result);
        });
        future
    }

    fn call<T>(&self, name: &str, args: Vec<CanonicalValue>) -> Future<T>
    where
        T: FromCanonical + Send + 'static,
    {
        self.wrapper.call_method(name, args)
    }

    /// Whether the content is audio only.
    pub fn is_audio_only(&self) -> Future<bool> {
        self.call("isAudioOnly", Vec::new())
    }

    /// Whether the player is buffering.
    pub fn is_buffering(&self) -> Future<bool> {
        self.call("isBuffering", Vec::new())
    }

    /// Whether the content is still being produced.
    pub fn is_in_progress(&self) -> Future<bool> {
        self.call("isInProgress", Vec::new())
    }

    /// Whether the content is live.
    pub fn is_live(&self) -> Future<bool> {
        self.call("isLive", Vec::new())
    }

    /// Whether text is displayed.
    pub fn is_text_track_visible(&self) -> Future<bool> {
        self.call("isTextTrackVisible", Vec::new())
    }

    /// Whether the text track comes from the media itself.
    pub fn using_embedded_text_track(&self) -> Future<bool> {
        self.call("usingEmbeddedTextTrack", Vec::new())
    }

    /// The loaded manifest URI.
    pub fn asset_uri(&self) -> Future<Option<String>> {
        self.call("assetUri", Vec::new())
    }

    /// DRM settings, when the content is protected.
    pub fn drm_info(&self) -> Future<Option<DrmInfo>> {
        self.call("drmInfo", Vec::new())
    }

    /// Audio languages and roles.
    pub fn get_audio_languages_and_roles(&self) -> Future<Vec<LanguageRole>> {
        self.call("getAudioLanguagesAndRoles", Vec::new())
    }

    /// Text languages and roles.
    pub fn get_text_languages_and_roles(&self) -> Future<Vec<LanguageRole>> {
        self.call("getTextLanguagesAndRoles", Vec::new())
    }

    /// Buffered ranges.
    pub fn get_buffered_info(&self) -> Future<BufferedInfo> {
        self.call("getBufferedInfo", Vec::new())
    }

    /// License expiration time in milliseconds since the epoch.
    pub fn get_expiration(&self) -> Future<f64> {
        self.call("getExpiration", Vec::new())
    }

    /// Playback statistics.
    pub fn get_stats(&self) -> Future<Stats> {
        self.call("getStats", Vec::new())
    }

    /// Text tracks.
    pub fn get_text_tracks(&self) -> Future<Vec<Track>> {
        self.call("getTextTracks", Vec::new())
    }

    /// Variant tracks.
    pub fn get_variant_tracks(&self) -> Future<Vec<Track>> {
        self.call("getVariantTracks", Vec::new())
    }

    /// Active key system.
    pub fn key_system(&self) -> Future<String> {
        self.call("keySystem", Vec::new())
    }

    /// Seekable range.
    pub fn seek_range(&self) -> Future<BufferedRange> {
        self.call("seekRange", Vec::new())
    }

    /// Loads a manifest. A NaN `start_time` lets the player pick the start.
    pub fn load(&self, manifest_uri: &str, start_time: f64, mime_type: &str) -> Future<()> {
        self.call(
            "load",
            vec![
                manifest_uri.to_canonical(),
                OptionalNumber(start_time).to_canonical(),
                mime_type.to_canonical(),
            ],
        )
    }

    /// Unloads the current content.
    pub fn unload(&self) -> Future<()> {
        self.call("unload", Vec::new())
    }

    /// Sets the configuration value at dotted `name_path`. Resolves to
    /// whether the player accepted it.
    pub fn configure(&self, name_path: &str, value: impl Into<ConfigValue>) -> Future<bool> {
        self.call("configure", vec![name_path.to_canonical(), value.into().to_canonical()])
    }

    /// Reads a boolean configuration value.
    pub fn get_configuration_bool(&self, name_path: &str) -> Future<bool> {
        self.wrapper.get_config_value(name_path)
    }

    /// Reads a numeric configuration value.
    pub fn get_configuration_double(&self, name_path: &str) -> Future<f64> {
        self.wrapper.get_config_value(name_path)
    }

    /// Reads a string configuration value.
    pub fn get_configuration_string(&self, name_path: &str) -> Future<String> {
        self.wrapper.get_config_value(name_path)
    }

    /// Restores the default configuration.
    pub fn reset_configuration(&self) -> Future<()> {
        self.call("resetConfiguration", Vec::new())
    }

    /// Retries streaming after a failure.
    pub fn retry_streaming(&self) -> Future<()> {
        self.call("retryStreaming", Vec::new())
    }

    /// Prefers `language`, optionally with `role`, for audio.
    pub fn select_audio_language(&self, language: &str, role: Option<&str>) -> Future<()> {
        self.call("selectAudioLanguage", vec![language.to_canonical(), role.to_canonical()])
    }

    /// Uses the text track embedded in the media.
    pub fn select_embedded_text_track(&self) -> Future<()> {
        self.call("selectEmbeddedTextTrack", Vec::new())
    }

    /// Prefers `language`, optionally with `role`, for text.
    pub fn select_text_language(&self, language: &str, role: Option<&str>) -> Future<()> {
        self.call("selectTextLanguage", vec![language.to_canonical(), role.to_canonical()])
    }

    /// Switches to a text track.
    pub fn select_text_track(&self, track: &Track) -> Future<()> {
        self.call("selectTextTrack", vec![track.to_canonical()])
    }

    /// Switches to a variant track.
    pub fn select_variant_track(&self, track: &Track, clear_buffer: bool) -> Future<()> {
        self.call("selectVariantTrack", vec![track.to_canonical(), clear_buffer.to_canonical()])
    }

    /// Shows or hides text.
    pub fn set_text_track_visibility(&self, visibility: bool) -> Future<()> {
        self.call("setTextTrackVisibility", vec![visibility.to_canonical()])
    }

    /// Adds an external text track.
    pub fn add_text_track(
        &self,
        uri: &str,
        language: &str,
        kind: &str,
        mime: &str,
        codec: &str,
        label: &str,
    ) -> Future<Track> {
        self.call(
            "addTextTrack",
            [uri, language, kind, mime, codec, label]
                .iter()
                .map(ToCanonical::to_canonical)
                .collect(),
        )
    }

    /// Adds filters that see every request and response.
    pub fn add_network_filters<F: NetworkFilters + 'static>(&self, filters: &Arc<F>) {
        self.filters.add_filters(filters);
    }

    /// Removes filters added with [`Player::add_network_filters`].
    pub fn remove_network_filters<F: NetworkFilters + 'static>(&self, filters: &Arc<F>) {
        self.filters.remove_filters(filters);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.filters.close();
        self.wrapper.destroy_blocking();
        self.video.lock().take();
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("wrapper", &self.wrapper)
            .field("filters", &self.filters)
            .field("video", &self.video())
            .finish()
    }
}

fn first_arg(args: &[JsValue]) -> JsValue {
    args.first().cloned().unwrap_or(JsValue::Undefined)
}

fn attach_listeners(
    realm: &Realm,
    player: &JsValue,
    client: Arc<dyn Client>,
    chain: FilterChain,
    main: MainThread,
) -> Result<()> {
    let error_client = Arc::clone(&client);
    let on_error = realm.new_function("onError", move |realm, _, args| {
        let detail = realm.get_member(&first_arg(args), "detail");
        error_client.on_error(&realm.to_error(&detail));
        Ok(JsValue::Undefined)
    });
    add_event_listener(realm, player, "error", on_error)?;

    let on_buffering = realm.new_function("onBuffering", move |realm, _, args| {
        match realm.get_member(&first_arg(args), "buffering").as_bool() {
            Some(is_buffering) => client.on_buffering(is_buffering),
            None => client.on_error(&Error::invocation("Bad 'buffering' event from JavaScript Player")),
        }
        Ok(JsValue::Undefined)
    });
    add_event_listener(realm, player, "buffering", on_buffering)?;

    let engine = realm
        .invoke_member(player, "getNetworkingEngine", &[])
        .map_err(|thrown| realm.to_error(&thrown))?;
    let request_hook = network_hook::<Request>(realm, chain.clone(), main.clone());
    realm
        .invoke_member(&engine, "registerRequestFilter", &[request_hook])
        .map_err(|thrown| realm.to_error(&thrown))?;
    let response_hook = network_hook::<Response>(realm, chain, main);
    realm
        .invoke_member(&engine, "registerResponseFilter", &[response_hook])
        .map_err(|thrown| realm.to_error(&thrown))?;
    Ok(())
}

fn add_event_listener(realm: &Realm, target: &JsValue, event: &str, listener: JsValue) -> Result<()> {
    realm
        .invoke_member(target, "addEventListener", &[JsValue::string(event), listener])
        .map(drop)
        .map_err(|thrown| realm.to_error(&thrown))
}

/// Builds the runtime function the networking engine calls with
/// `(type, requestOrResponse)`. It runs the filter chain and returns a
/// runtime promise settled when the chain ends.
fn network_hook<T>(realm: &Realm, chain: FilterChain, main: MainThread) -> JsValue
where
    T: FilterTarget + FromCanonical + ToCanonical,
{
    let name = format!("{}Filter", T::LABEL);
    realm.new_function(&name, move |realm, _, args| {
        let (ty, value) = filter_args::<T>(realm, args).map_err(|err| error_value(realm, &err))?;
        let target = realm.persist(args.get(1).cloned().unwrap_or(JsValue::Undefined));
        let promise = realm.new_promise();
        let pending = realm.persist(JsValue::Object(promise.clone()));

        let owner = main.clone();
        let done = chain.run(ty, Arc::new(Mutex::new(value)), move |filtered| {
            write_back(&owner, target, &*filtered.lock());
        });
        let main = main.clone();
        done.on_settled(move |result| {
            let owner = main.clone();
            let settle = move || settle_runtime_promise(&owner, pending, target, result);
            if main.belongs_to_current_thread() {
                settle();
            } else {
                main.post(TaskPriority::Immediate, "network filter result", settle);
            }
        });
        Ok(JsValue::Object(promise))
    })
}

fn filter_args<T: FromCanonical>(realm: &Realm, args: &[JsValue]) -> Result<(RequestType, T)> {
    let ty = realm.to_canonical(&first_arg(args))?;
    let value = realm.to_canonical(&args.get(1).cloned().unwrap_or(JsValue::Undefined))?;
    Ok((convert("type", &ty)?, convert(T::TYPE_NAME, &value)?))
}

/// The realm `main` runs, when called on that thread. Handles carry no realm
/// identity, so anywhere else they must not be resolved.
fn owned_realm(main: &MainThread) -> Option<Realm> {
    if !main.belongs_to_current_thread() {
        return None;
    }
    Realm::try_current().ok()
}

/// Copies the filtered fields back onto the script object. Skipped when not
/// on the main thread, which only happens once it has stopped.
fn write_back<T: ToCanonical>(main: &MainThread, handle: Persistent, value: &T) {
    let Some(realm) = owned_realm(main) else {
        tracing::debug!("not on the owning main thread; filtered values not written back");
        return;
    };
    let Ok(JsValue::Object(target)) = realm.resolve(handle) else {
        return;
    };
    if let JsValue::Object(updated) = realm.from_canonical(&value.to_canonical()) {
        for (key, field) in updated.entries() {
            target.set(&key, field);
        }
    }
}

fn settle_runtime_promise(main: &MainThread, pending: Persistent, target: Persistent, result: Result<()>) {
    let Some(realm) = owned_realm(main) else {
        return;
    };
    if let Ok(JsValue::Object(promise)) = realm.resolve(pending) {
        match result {
            Ok(()) => realm.resolve_promise(&promise, JsValue::Undefined),
            Err(err) => realm.reject_promise(&promise, error_value(&realm, &err)),
        }
    }
    realm.release(pending);
    realm.release(target);
}
