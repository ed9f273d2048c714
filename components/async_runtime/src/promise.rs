//! Native future/promise pair.
//!
//! A [`Promise`] is the single-writer side, a [`Future`] the reader side.
//! Settlement happens at most once; the reader can block from any thread
//! except a main-thread worker, chain lazy continuations with
//! [`Future::then`], or register a non-blocking callback with
//! [`Future::on_settled`].

use crate::event_loop::is_main_thread;
use core_types::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;

type Callback<T> = Box<dyn FnOnce(Result<T>) + Send>;

enum State<T> {
    Pending(Option<Callback<T>>),
    Settled(Result<T>),
    Taken,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    settled: Condvar,
}

impl<T> Shared<T> {
    fn new(state: State<T>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            settled: Condvar::new(),
        })
    }

    fn settle(&self, result: Result<T>) -> bool {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Taken) {
            State::Pending(Some(callback)) => {
                drop(state);
                callback(result);
                true
            }
            State::Pending(None) => {
                *state = State::Settled(result);
                self.settled.notify_all();
                true
            }
            previous => {
                *state = previous;
                false
            }
        }
    }

    fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), State::Pending(_))
    }

    fn wait_settled(&self) {
        let mut state = self.state.lock();
        while matches!(*state, State::Pending(_)) {
            debug_assert!(
                !is_main_thread(),
                "blocking on a pending future from the main thread would deadlock"
            );
            self.settled.wait(&mut state);
        }
    }

    fn take(&self) -> Result<T> {
        self.wait_settled();
        match std::mem::replace(&mut *self.state.lock(), State::Taken) {
            State::Settled(result) => result,
            _ => Err(Error::shutdown("future result was already taken")),
        }
    }
}

/// Creates a connected promise/future pair.
///
/// # Examples
///
/// ```
/// use async_runtime::promise;
///
/// let (promise, future) = promise::pair::<i32>();
/// assert!(promise.resolve(42));
/// assert!(!promise.resolve(7));
/// assert_eq!(future.get().unwrap(), 42);
/// ```
pub fn pair<T>() -> (Promise<T>, Future<T>) {
    let shared = Shared::new(State::Pending(None));
    (
        Promise {
            shared: Arc::clone(&shared),
        },
        Future {
            inner: Inner::Shared(shared),
        },
    )
}

/// The writing side of a pair.
///
/// A promise dropped without being settled rejects its future with a
/// [`Shutdown`](core_types::ErrorKind::Shutdown) error, so a cancelled task
/// never leaves a waiter blocked.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    /// Settles with `result`. Returns false if already settled.
    pub fn settle(&self, result: Result<T>) -> bool {
        let settled = self.shared.settle(result);
        if !settled {
            tracing::debug!("ignoring settlement of an already settled promise");
        }
        settled
    }

    /// Resolves with a value. Returns false if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects with an error. Returns false if already settled.
    pub fn reject(&self, error: Error) -> bool {
        self.settle(Err(error))
    }

    /// Returns true once resolved or rejected.
    pub fn is_settled(&self) -> bool {
        !self.shared.is_pending()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.shared.is_pending() {
            self.shared
                .settle(Err(Error::shutdown("promise dropped before settlement")));
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.is_settled())
            .finish()
    }
}

enum Inner<T> {
    Shared(Arc<Shared<T>>),
    Deferred(Box<dyn FnOnce() -> Result<T> + Send>),
}

/// The reading side of a pair.
pub struct Future<T> {
    inner: Inner<T>,
}

impl<T> Future<T> {
    /// A future that is already settled.
    pub fn ready(result: Result<T>) -> Self {
        Self {
            inner: Inner::Shared(Shared::new(State::Settled(result))),
        }
    }

    /// Returns true if `get` would not block.
    ///
    /// Deferred futures report false until evaluated by [`Future::wait`].
    pub fn is_ready(&self) -> bool {
        match &self.inner {
            Inner::Shared(shared) => !shared.is_pending(),
            Inner::Deferred(_) => false,
        }
    }

    /// Blocks until settled, evaluating a deferred continuation if needed.
    pub fn wait(&mut self) {
        if let Inner::Shared(shared) = &self.inner {
            shared.wait_settled();
            return;
        }
        let placeholder = Inner::Shared(Shared::new(State::Taken));
        if let Inner::Deferred(f) = std::mem::replace(&mut self.inner, placeholder) {
            self.inner = Inner::Shared(Shared::new(State::Settled(f())));
        }
    }

    /// Blocks until settled and returns the result.
    ///
    /// Must not be called on a main-thread worker while the future is still
    /// pending; use [`Future::on_settled`] there.
    pub fn get(self) -> Result<T> {
        match self.inner {
            Inner::Shared(shared) => shared.take(),
            Inner::Deferred(f) => f(),
        }
    }
}

impl<T: Send + 'static> Future<T> {
    /// Chains a continuation that runs lazily when the returned future is
    /// waited on, not when this one settles.
    pub fn then<U, F>(self, f: F) -> Future<U>
    where
        F: FnOnce(Result<T>) -> Result<U> + Send + 'static,
    {
        Future {
            inner: Inner::Deferred(Box::new(move || f(self.get()))),
        }
    }

    /// Calls `callback` with the result without blocking the caller.
    ///
    /// The callback runs on the thread that settles the promise, or inline if
    /// already settled. A deferred future is evaluated on a helper thread.
    pub fn on_settled<F>(self, callback: F)
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        match self.inner {
            Inner::Shared(shared) => {
                let mut state = shared.state.lock();
                match std::mem::replace(&mut *state, State::Taken) {
                    State::Pending(_) => *state = State::Pending(Some(Box::new(callback))),
                    State::Settled(result) => {
                        drop(state);
                        callback(result);
                    }
                    State::Taken => {
                        drop(state);
                        callback(Err(Error::shutdown("future result was already taken")));
                    }
                }
            }
            Inner::Deferred(f) => {
                let spawned = thread::Builder::new()
                    .name("deferred-future".into())
                    .spawn(move || callback(f()));
                if let Err(err) = spawned {
                    tracing::error!(error = %err, "failed to spawn thread for deferred future");
                }
            }
        }
    }

    /// Waits for the result asynchronously.
    pub async fn into_async(self) -> Result<T> {
        let (tx, rx) = futures::channel::oneshot::channel();
        self.on_settled(move |result| {
            let _ = tx.send(result);
        });
        rx.await
            .unwrap_or_else(|_| Err(Error::shutdown("future callback dropped")))
    }
}

impl<T> std::fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            Inner::Shared(_) => "shared",
            Inner::Deferred(_) => "deferred",
        };
        f.debug_struct("Future")
            .field("kind", &kind)
            .field("ready", &self.is_ready())
            .finish()
    }
}
