//! Owner of the main thread and its realm.

use crate::config::JsManagerConfig;
use crate::error::SetupResult;
use async_runtime::{Future, MainThread, TaskPriority};
use core_types::Result;
use js_engine::{Realm, RealmOptions};

/// Runs the scripting runtime on a dedicated main thread.
///
/// The realm is created on the main thread before any task runs; the host
/// bootstrap (which installs the player script's globals) is the first
/// internal task. Dropping the manager stops the thread using the configured
/// [`ShutdownMode`](async_runtime::ShutdownMode).
///
/// # Examples
///
/// ```
/// use js_engine::JsValue;
/// use player::{JsManager, JsManagerConfig};
///
/// let manager = JsManager::with_bootstrap(JsManagerConfig::default(), |realm| {
///     realm.global().set("answer", JsValue::Number(42.0));
///     Ok(())
/// })
/// .unwrap();
///
/// let answer = manager.with_realm(|realm| {
///     Ok(realm.get_global_path("answer").ok().and_then(|v| v.as_number()))
/// });
/// assert_eq!(answer.get().unwrap(), Some(42.0));
/// ```
pub struct JsManager {
    main: MainThread,
    config: JsManagerConfig,
}

impl JsManager {
    /// Starts a runtime with an empty global object.
    pub fn new(config: JsManagerConfig) -> SetupResult<Self> {
        Self::with_bootstrap(config, |_| Ok(()))
    }

    /// Starts a runtime and runs `bootstrap` on its main thread before any
    /// other task. Blocks until the bootstrap finishes.
    pub fn with_bootstrap<F>(config: JsManagerConfig, bootstrap: F) -> SetupResult<Self>
    where
        F: FnOnce(&Realm) -> Result<()> + Send + 'static,
    {
        let options = RealmOptions {
            max_clone_depth: config.max_clone_depth,
        };
        let main = MainThread::spawn(config.thread_name.clone(), move || {
            Realm::new(options).install();
        })?;
        let manager = Self { main, config };

        let ready = manager
            .main
            .add_internal_task("bootstrap", move || bootstrap(&Realm::current()));
        if let Err(err) = ready.get() {
            tracing::error!(error = %err, "runtime bootstrap failed");
            return Err(err.into());
        }
        tracing::debug!(thread = %manager.main.name(), "runtime ready");
        Ok(manager)
    }

    /// The main-thread handle.
    pub fn main_thread(&self) -> &MainThread {
        &self.main
    }

    /// The configuration the manager was started with.
    pub fn config(&self) -> &JsManagerConfig {
        &self.config
    }

    /// Runs `f` against the realm on the main thread.
    pub fn with_realm<T, F>(&self, f: F) -> Future<T>
    where
        T: Send + 'static,
        F: FnOnce(&Realm) -> Result<T> + Send + 'static,
    {
        self.main
            .add_task(TaskPriority::Immediate, "with_realm", move || f(&Realm::current()))
    }

    /// Stops the main thread now instead of on drop.
    pub fn stop(&self) {
        self.main.stop(self.config.shutdown);
    }
}

impl Drop for JsManager {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for JsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsManager")
            .field("main", &self.main)
            .field("config", &self.config)
            .finish()
    }
}
