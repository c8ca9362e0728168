//! Offline cache worker.
//!
//! Sits between the poller and the network the way a service worker sits
//! between a page and the browser's fetch:
//! - Install pre-populates the versioned store with the app shell
//! - Activate drops stores from other versions and takes control
//! - Fetch interception answers GETs network-first for the rates document
//!   and cache-first for everything else

mod lifecycle;
mod storage;
mod strategy;

pub use lifecycle::{register, CacheWorker, WorkerConfig, WorkerState};
pub use storage::{CacheStorage, SqliteStorage};
