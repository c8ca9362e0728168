//! Rate poller: loads the rates document on a timer and on demand.
//!
//! `Poller` is the application context for the refresh cycle. It owns the
//! background tasks (poll timer and wall clock) and starts and stops them
//! explicitly. Each load gets a sequence number; completions are sent to
//! the event loop as `RatesEvent`s and applied to the board there.

mod transport;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use url::Url;

use crate::board::Board;
use crate::event::Event;
use crate::net::{CacheMode, FetchError, Network, Request};
use crate::rates::RatesDocument;
use crate::worker::CacheStorage;

pub use transport::Transport;

/// Query parameter used to defeat intermediate caches
const CACHE_BUST_PARAM: &str = "t";

/// How often the wall clock label is refreshed
const CLOCK_PERIOD: Duration = Duration::from_secs(1);

/// Lifecycle of one `load_rates` call.
#[derive(Debug, Clone)]
pub enum RatesEvent {
  Started { seq: u64 },
  Loaded { seq: u64, doc: RatesDocument },
  Failed { seq: u64, error: FetchError },
}

impl RatesEvent {
  pub fn seq(&self) -> u64 {
    match self {
      RatesEvent::Started { seq }
      | RatesEvent::Loaded { seq, .. }
      | RatesEvent::Failed { seq, .. } => *seq,
    }
  }

  /// Apply to the board. Returns true when the cards or labels changed
  /// as a result of a completed load.
  pub fn apply_to(&self, board: &mut Board) -> bool {
    match self {
      RatesEvent::Started { seq } => {
        board.begin_load(*seq);
        false
      }
      RatesEvent::Loaded { seq, doc } => board.apply_loaded(*seq, doc),
      RatesEvent::Failed { seq, error } => board.apply_failed(*seq, error),
    }
  }
}

/// Issues individual loads. Cheap to clone; clones share the sequence
/// counter.
pub struct Loader<S: CacheStorage, N: Network + Clone> {
  transport: Transport<S, N>,
  endpoint: Url,
  seq: Arc<AtomicU64>,
  tx: mpsc::UnboundedSender<Event>,
}

impl<S, N> Loader<S, N>
where
  S: CacheStorage + 'static,
  N: Network + Clone + 'static,
{
  pub fn new(transport: Transport<S, N>, endpoint: Url, tx: mpsc::UnboundedSender<Event>) -> Self {
    Self {
      transport,
      endpoint,
      seq: Arc::new(AtomicU64::new(0)),
      tx,
    }
  }

  /// Build the request for one load. A forced load appends a cache-busting
  /// timestamp and bypasses HTTP caches.
  pub fn request(&self, force_network: bool) -> Request {
    if !force_network {
      return Request::get(self.endpoint.clone());
    }

    let mut url = self.endpoint.clone();
    url
      .query_pairs_mut()
      .append_pair(CACHE_BUST_PARAM, &Utc::now().timestamp_millis().to_string());
    Request::get(url).with_mode(CacheMode::NoStore)
  }

  /// Fetch and parse the rates document.
  pub async fn fetch_rates(&self, force_network: bool) -> Result<RatesDocument, FetchError> {
    let req = self.request(force_network);
    let resp = self.transport.fetch(&req).await?.error_for_status()?;
    RatesDocument::parse(&resp.body)
  }

  /// Run one load to completion and return its final event.
  /// The `Started` event is sent right away.
  pub async fn load_now(&self, force_network: bool) -> RatesEvent {
    let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
    let _ = self.tx.send(Event::Rates(RatesEvent::Started { seq }));

    match self.fetch_rates(force_network).await {
      Ok(doc) => {
        debug!(seq, rates = doc.rates.len(), "rates loaded");
        RatesEvent::Loaded { seq, doc }
      }
      Err(error) => RatesEvent::Failed { seq, error },
    }
  }

  /// Load in the background; the completion arrives as an event.
  /// Overlapping loads are allowed.
  pub fn load_rates(&self, force_network: bool) {
    let loader = self.clone();
    tokio::spawn(async move {
      let event = loader.load_now(force_network).await;
      let _ = loader.tx.send(Event::Rates(event));
    });
  }
}

impl<S: CacheStorage, N: Network + Clone> Clone for Loader<S, N> {
  fn clone(&self) -> Self {
    Self {
      transport: self.transport.clone(),
      endpoint: self.endpoint.clone(),
      seq: Arc::clone(&self.seq),
      tx: self.tx.clone(),
    }
  }
}

pub struct Poller<S: CacheStorage, N: Network + Clone> {
  loader: Loader<S, N>,
  interval: Duration,
  tasks: Vec<JoinHandle<()>>,
}

impl<S, N> Poller<S, N>
where
  S: CacheStorage + 'static,
  N: Network + Clone + 'static,
{
  pub fn new(loader: Loader<S, N>, interval: Duration) -> Self {
    Self {
      loader,
      interval,
      tasks: Vec::new(),
    }
  }

  pub fn is_running(&self) -> bool {
    !self.tasks.is_empty()
  }

  /// Start the poll timer and the clock. The first poll fires at once.
  pub fn start(&mut self) {
    if self.is_running() {
      return;
    }
    info!(interval_secs = self.interval.as_secs(), "poller starting");

    let loader = self.loader.clone();
    let interval = self.interval;
    self.tasks.push(tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        loader.load_rates(true);
      }
    }));

    let tx = self.loader.tx.clone();
    self.tasks.push(tokio::spawn(async move {
      let mut ticker = tokio::time::interval(CLOCK_PERIOD);
      loop {
        ticker.tick().await;
        if tx.send(Event::Clock(Local::now())).is_err() {
          break;
        }
      }
    }));
  }

  /// Stop the timers. Loads already in flight still complete.
  pub fn stop(&mut self) {
    if self.is_running() {
      info!("poller stopping");
    }
    for task in self.tasks.drain(..) {
      task.abort();
    }
  }

  /// Manual refresh.
  pub fn refresh(&self) {
    self.loader.load_rates(true);
  }
}

impl<S: CacheStorage, N: Network + Clone> Drop for Poller<S, N> {
  fn drop(&mut self) {
    for task in self.tasks.drain(..) {
      task.abort();
    }
  }
}
