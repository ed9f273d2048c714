//! Main-thread dispatch for the player bridge.
//!
//! This crate provides the concurrency core the bridge is built on:
//! - [`MainThread`] - the single worker allowed to touch runtime state
//! - [`TaskQueue`] - priority bands with FIFO ordering inside each band
//! - [`Promise`] / [`Future`] - single-settlement pair observable from any thread
//!
//! # Examples
//!
//! ## Running work on the main thread
//!
//! ```
//! use async_runtime::{MainThread, ShutdownMode, TaskPriority};
//!
//! let main = MainThread::spawn("runtime", || {}).unwrap();
//! let answer = main.add_task(TaskPriority::Immediate, "answer", || Ok(42));
//! assert_eq!(answer.get().unwrap(), 42);
//! main.stop(ShutdownMode::Drain);
//! ```
//!
//! ## Chaining a deferred continuation
//!
//! ```
//! use async_runtime::promise;
//!
//! let (promise, future) = promise::pair::<i32>();
//! let doubled = future.then(|r| r.map(|v| v * 2));
//! promise.resolve(21);
//! assert_eq!(doubled.get().unwrap(), 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event_loop;
pub mod promise;
pub mod task_queue;

// Re-export main types at crate root
pub use event_loop::{is_main_thread, MainThread, ShutdownMode};
pub use promise::{Future, Promise};
pub use task_queue::{Task, TaskPriority, TaskQueue};
