//! Network filter chain.
//!
//! Filters registered with a [`FilterChain`] see every request before it is
//! sent and every response before the player script consumes it. A chain run
//! walks the registered filters in order, one at a time: the next filter only
//! starts once the previous filter's future settles, and the first error ends
//! the run.
//!
//! The filter list lock is held only while looking up the next live filter,
//! never while a filter runs, so filters may add or remove filters (or start
//! other chain runs) from inside their callbacks.

use crate::net::{Request, RequestType, Response};
use async_runtime::{promise, Future, MainThread, Promise, TaskPriority};
use core_types::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Native hooks on network traffic.
///
/// A filter may modify the request or response in place and resolves its
/// future with `None` to continue or `Some(error)` to fail the request.
/// Rejecting the future also fails the request.
pub trait NetworkFilters: Send + Sync {
    /// Called before a request is sent.
    fn on_request_filter(&self, ty: RequestType, request: &Arc<Mutex<Request>>) -> Future<Option<Error>> {
        let _ = (ty, request);
        Future::ready(Ok(None))
    }

    /// Called when a response arrives.
    fn on_response_filter(&self, ty: RequestType, response: &Arc<Mutex<Response>>) -> Future<Option<Error>> {
        let _ = (ty, response);
        Future::ready(Ok(None))
    }
}

/// The value a chain run passes through its filters.
pub trait FilterTarget: Send + 'static {
    /// Label for log output.
    const LABEL: &'static str;

    /// Invokes the hook of `filter` that handles this target.
    fn apply(filter: &dyn NetworkFilters, ty: RequestType, target: &Arc<Mutex<Self>>) -> Future<Option<Error>>;
}

impl FilterTarget for Request {
    const LABEL: &'static str = "request";

    fn apply(filter: &dyn NetworkFilters, ty: RequestType, target: &Arc<Mutex<Self>>) -> Future<Option<Error>> {
        filter.on_request_filter(ty, target)
    }
}

impl FilterTarget for Response {
    const LABEL: &'static str = "response";

    fn apply(filter: &dyn NetworkFilters, ty: RequestType, target: &Arc<Mutex<Self>>) -> Future<Option<Error>> {
        filter.on_response_filter(ty, target)
    }
}

type Entry = Option<Weak<dyn NetworkFilters>>;

struct ChainInner {
    main: MainThread,
    // Removal leaves a `None` so indices held by in-flight runs stay valid.
    entries: Mutex<Vec<Entry>>,
    closed: AtomicBool,
}

impl ChainInner {
    fn next_filter(&self, start: usize) -> Option<(usize, Arc<dyn NetworkFilters>)> {
        let entries = self.entries.lock();
        entries
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(index, entry)| entry.as_ref()?.upgrade().map(|filter| (index, filter)))
    }
}

/// Ordered, shared list of [`NetworkFilters`] and the runs that walk it.
///
/// The chain holds filters weakly: a filter whose last `Arc` is dropped is
/// skipped as if removed.
#[derive(Clone)]
pub struct FilterChain {
    inner: Arc<ChainInner>,
}

impl FilterChain {
    /// Creates an empty chain whose runs continue on `main`.
    pub fn new(main: MainThread) -> Self {
        Self {
            inner: Arc::new(ChainInner {
                main,
                entries: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Appends `filters` to the end of the chain.
    pub fn add_filters<F: NetworkFilters + 'static>(&self, filters: &Arc<F>) {
        let weak: Weak<dyn NetworkFilters> = Arc::downgrade(filters) as Weak<dyn NetworkFilters>;
        self.inner.entries.lock().push(Some(weak));
    }

    /// Removes every registration of `filters`. Runs already past it are
    /// unaffected; runs that have not reached it skip it.
    pub fn remove_filters<F: NetworkFilters + 'static>(&self, filters: &Arc<F>) {
        let target: Weak<dyn NetworkFilters> = Arc::downgrade(filters) as Weak<dyn NetworkFilters>;
        let mut entries = self.inner.entries.lock();
        for entry in entries.iter_mut() {
            if entry.as_ref().is_some_and(|weak| Weak::ptr_eq(weak, &target)) {
                *entry = None;
            }
        }
    }

    /// Number of registered filters that are still alive.
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .lock()
            .iter()
            .filter(|entry| entry.as_ref().is_some_and(|weak| weak.strong_count() > 0))
            .count()
    }

    /// Returns true when no live filter is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops the chain. A filter that is already running finishes, but no
    /// further filter starts; affected runs finalize and fail with a
    /// shutdown error.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("network filter chain closed");
        }
    }

    /// Returns true after [`FilterChain::close`].
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Runs `target` through the filters.
    ///
    /// `finalize` runs exactly once when the run ends, whatever the outcome,
    /// before the returned future settles. Continuations after an
    /// asynchronous filter are posted back to the main thread.
    pub fn run<T, F>(&self, ty: RequestType, target: Arc<Mutex<T>>, finalize: F) -> Future<()>
    where
        T: FilterTarget,
        F: FnOnce(&Arc<Mutex<T>>) + Send + 'static,
    {
        let (promise, future) = promise::pair();
        let traversal = Traversal {
            chain: Arc::clone(&self.inner),
            ty,
            target,
            finalize: Some(Box::new(finalize)),
            promise: Some(promise),
        };
        traversal.step(0);
        future
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

type Finalizer<T> = Box<dyn FnOnce(&Arc<Mutex<T>>) + Send>;

/// One run through the chain.
///
/// Dropping an unfinished run (its continuation was rejected by a stopped
/// main thread) still finalizes it and fails it with a shutdown error.
struct Traversal<T: FilterTarget> {
    chain: Arc<ChainInner>,
    ty: RequestType,
    target: Arc<Mutex<T>>,
    finalize: Option<Finalizer<T>>,
    promise: Option<Promise<()>>,
}

impl<T: FilterTarget> Traversal<T> {
    fn step(self, start: usize) {
        if self.chain.closed.load(Ordering::SeqCst) {
            return self.finish(Err(Error::shutdown("network filter chain is closed")));
        }
        let Some((index, filter)) = self.chain.next_filter(start) else {
            tracing::trace!(target_kind = T::LABEL, ty = ?self.ty, "network filter chain complete");
            return self.finish(Ok(()));
        };

        tracing::debug!(target_kind = T::LABEL, ty = ?self.ty, index, "running network filter");
        let pending = T::apply(filter.as_ref(), self.ty, &self.target);
        drop(filter);

        let main = self.chain.main.clone();
        pending.on_settled(move |result| {
            let resume = move || self.resume(index, result);
            if main.belongs_to_current_thread() {
                resume();
            } else {
                main.post(TaskPriority::Immediate, "network-filter-step", resume);
            }
        });
    }

    fn resume(self, index: usize, result: Result<Option<Error>>) {
        if self.chain.closed.load(Ordering::SeqCst) {
            return self.finish(Err(Error::shutdown("network filter chain is closed")));
        }
        match result {
            Ok(None) => self.step(index + 1),
            Ok(Some(err)) | Err(err) => {
                tracing::debug!(target_kind = T::LABEL, ty = ?self.ty, index, error = %err, "network filter failed");
                self.finish(Err(err))
            }
        }
    }

    fn finish(mut self, result: Result<()>) {
        if let Some(finalize) = self.finalize.take() {
            finalize(&self.target);
        }
        if let Some(promise) = self.promise.take() {
            promise.settle(result);
        }
    }
}

impl<T: FilterTarget> Drop for Traversal<T> {
    fn drop(&mut self) {
        if let Some(finalize) = self.finalize.take() {
            tracing::warn!(target_kind = T::LABEL, ty = ?self.ty, "network filter run abandoned");
            finalize(&self.target);
            if let Some(promise) = self.promise.take() {
                promise.reject(Error::shutdown("network filter run abandoned"));
            }
        }
    }
}
