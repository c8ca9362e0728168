//! HTTP plumbing shared by the poller and the offline cache worker.
//!
//! Requests and responses are plain owned values so they can be stored in
//! the cache store and replayed later. The `Network` trait is the single
//! seam to the outside world; `HttpNetwork` implements it with reqwest.

mod client;
mod error;
mod types;

pub use client::{HttpNetwork, Network};
pub use error::FetchError;
pub use types::{CacheMode, Method, Request, Response};

#[cfg(test)]
pub mod testing;
