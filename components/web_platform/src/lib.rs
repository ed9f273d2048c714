//! Network plumbing for the player bridge.
//!
//! - [`Request`] / [`Response`] - mutable contexts shared with filters
//! - [`NetworkFilters`] - native hooks on requests and responses
//! - [`FilterChain`] - ordered filter list and the asynchronous runs over it

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod filters;
pub mod net;

pub use filters::{FilterChain, FilterTarget, NetworkFilters};
pub use net::{Request, RequestType, Response};
