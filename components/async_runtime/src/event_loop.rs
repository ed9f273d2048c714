//! The main thread: the one worker allowed to run scripting-runtime code.
//!
//! Every runtime-touching operation either already runs on this worker or is
//! marshaled onto it through [`MainThread::add_task`] /
//! [`MainThread::invoke_or_schedule`]. Tasks run one at a time to completion,
//! highest priority band first and FIFO within a band.

use crate::promise::{self, Future};
use crate::task_queue::{Task, TaskPriority, TaskQueue};
use core_types::{Error, Result};
use parking_lot::{Condvar, Mutex};
use serde::Deserialize;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};

thread_local! {
    static IS_MAIN_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Returns true when called on any [`MainThread`] worker.
pub fn is_main_thread() -> bool {
    IS_MAIN_THREAD.with(Cell::get)
}

/// What happens to queued tasks when the main thread stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    /// Run every task queued before the stop, then exit.
    #[default]
    Drain,
    /// Drop queued tasks; their futures reject with a shutdown error.
    Cancel,
}

struct QueueState {
    tasks: TaskQueue,
    accepting: bool,
    stop: Option<ShutdownMode>,
}

struct Inner {
    name: String,
    queue: Mutex<QueueState>,
    available: Condvar,
    thread_id: OnceLock<ThreadId>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn next_task(&self) -> Option<Task> {
        let mut state = self.queue.lock();
        loop {
            match state.stop {
                Some(ShutdownMode::Cancel) => {
                    let cancelled = state.tasks.drain();
                    drop(state);
                    if !cancelled.is_empty() {
                        tracing::debug!(thread = %self.name, count = cancelled.len(), "cancelling queued tasks");
                    }
                    // Dropping the tasks rejects their futures; do it unlocked
                    // since rejection may run callbacks that post new work.
                    drop(cancelled);
                    return None;
                }
                Some(ShutdownMode::Drain) if state.tasks.is_empty() => return None,
                _ => {}
            }
            if let Some(task) = state.tasks.dequeue() {
                return Some(task);
            }
            self.available.wait(&mut state);
        }
    }

    fn run(&self) {
        while let Some(task) = self.next_task() {
            let name = task.name().to_string();
            tracing::trace!(thread = %self.name, task = %name, priority = ?task.priority(), "running task");
            if panic::catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
                tracing::error!(thread = %self.name, task = %name, "task panicked on the main thread");
                std::process::abort();
            }
        }
        tracing::debug!(thread = %self.name, "main thread exiting");
    }
}

/// Handle to the main-thread worker.
///
/// Handles are cheap to clone; every clone feeds the same queue. The worker
/// runs until [`MainThread::stop`] is called.
///
/// # Examples
///
/// ```
/// use async_runtime::{MainThread, ShutdownMode, TaskPriority};
///
/// let main = MainThread::spawn("example", || {}).unwrap();
/// let on_main = main.add_task(TaskPriority::Immediate, "probe", || {
///     Ok(async_runtime::is_main_thread())
/// });
/// assert!(on_main.get().unwrap());
/// main.stop(ShutdownMode::Drain);
/// ```
#[derive(Clone)]
pub struct MainThread {
    inner: Arc<Inner>,
}

impl MainThread {
    /// Starts the worker. `init` runs on it before any task.
    pub fn spawn<F>(name: impl Into<String>, init: F) -> std::io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let inner = Arc::new(Inner {
            name: name.clone(),
            queue: Mutex::new(QueueState {
                tasks: TaskQueue::new(),
                accepting: true,
                stop: None,
            }),
            available: Condvar::new(),
            thread_id: OnceLock::new(),
            handle: Mutex::new(None),
        });

        let worker = Arc::clone(&inner);
        let handle = thread::Builder::new().name(name).spawn(move || {
            let _ = worker.thread_id.set(thread::current().id());
            IS_MAIN_THREAD.with(|flag| flag.set(true));
            init();
            worker.run();
        })?;
        let _ = inner.thread_id.set(handle.thread().id());
        *inner.handle.lock() = Some(handle);
        tracing::debug!(thread = %inner.name, "main thread started");
        Ok(Self { inner })
    }

    /// The worker's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns true when called on this worker.
    pub fn belongs_to_current_thread(&self) -> bool {
        self.inner.thread_id.get() == Some(&thread::current().id())
    }

    /// Returns true until [`MainThread::stop`] is called.
    pub fn is_running(&self) -> bool {
        self.inner.queue.lock().accepting
    }

    /// Number of tasks waiting to run.
    pub fn pending_tasks(&self) -> usize {
        self.inner.queue.lock().tasks.len()
    }

    /// Queues a fire-and-forget closure. Returns false if the worker has
    /// stopped, in which case the closure is dropped without running.
    pub fn post<F>(&self, priority: TaskPriority, name: &str, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Task::new(priority, name, f))
    }

    fn enqueue(&self, task: Task) -> bool {
        let mut state = self.inner.queue.lock();
        if !state.accepting {
            drop(state);
            tracing::warn!(thread = %self.inner.name, task = %task.name(), "main thread stopped; task rejected");
            drop(task);
            return false;
        }
        state.tasks.enqueue(task);
        self.inner.available.notify_one();
        true
    }

    /// Queues `f` and returns a future for its result.
    pub fn add_task<T, F>(&self, priority: TaskPriority, name: &str, f: F) -> Future<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (promise, future) = promise::pair();
        let task = Task::new(priority, name, move || {
            promise.settle(f());
        });
        self.enqueue(task);
        future
    }

    /// Queues `f` in the [`TaskPriority::Internal`] band.
    pub fn add_internal_task<T, F>(&self, name: &str, f: F) -> Future<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.add_task(TaskPriority::Internal, name, f)
    }

    /// Runs `f` inline when already on the worker, otherwise queues it.
    pub fn invoke_or_schedule<T, F>(&self, f: F) -> Future<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        if self.belongs_to_current_thread() {
            Future::ready(f())
        } else {
            self.add_task(TaskPriority::Immediate, "invoke_or_schedule", f)
        }
    }

    /// Stops the worker.
    ///
    /// The task currently running always finishes. Called from another
    /// thread this joins the worker; called from the worker itself it only
    /// marks the queue stopped.
    pub fn stop(&self, mode: ShutdownMode) {
        {
            let mut state = self.inner.queue.lock();
            state.accepting = false;
            if state.stop != Some(ShutdownMode::Cancel) {
                state.stop = Some(mode);
            }
            self.inner.available.notify_all();
        }
        tracing::debug!(thread = %self.inner.name, ?mode, "stopping main thread");

        if self.belongs_to_current_thread() {
            return;
        }
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(thread = %self.inner.name, "main thread terminated abnormally");
            }
        }
    }

    /// Rejects with a shutdown error naming this worker.
    pub fn stopped_error(&self) -> Error {
        Error::shutdown(format!("main thread '{}' is stopped", self.inner.name))
    }
}

impl std::fmt::Debug for MainThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainThread")
            .field("name", &self.inner.name)
            .field("running", &self.is_running())
            .finish()
    }
}
