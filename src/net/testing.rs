//! Scripted in-memory network for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{FetchError, Network, Request, Response};

pub const BASE_URL: &str = "https://rates.test";

/// Serves canned responses by URL path and records every request it sees.
/// Unknown paths answer 404; `go_offline` makes every fetch fail and
/// `stall` makes one path never answer.
#[derive(Default)]
pub struct FakeNetwork {
  routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
  stalled: Mutex<HashSet<String>>,
  calls: Mutex<Vec<Request>>,
  offline: AtomicBool,
}

impl FakeNetwork {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn serve(&self, path: &str, status: u16, body: &str) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(path.to_string(), (status, body.as_bytes().to_vec()));
  }

  /// Requests for `path` hang forever, like a server that accepts the
  /// connection and never responds.
  pub fn stall(&self, path: &str) {
    self.stalled.lock().unwrap().insert(path.to_string());
  }

  pub fn go_offline(&self) {
    self.offline.store(true, Ordering::SeqCst);
  }

  pub fn go_online(&self) {
    self.offline.store(false, Ordering::SeqCst);
  }

  pub fn calls(&self) -> Vec<Request> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }
}

impl Network for FakeNetwork {
  async fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
    self.calls.lock().unwrap().push(req.clone());

    if self.offline.load(Ordering::SeqCst) {
      return Err(FetchError::Network("connection refused".to_string()));
    }

    let stalled = self.stalled.lock().unwrap().contains(req.url.path());
    if stalled {
      std::future::pending::<()>().await;
    }

    let (status, body) = self
      .routes
      .lock()
      .unwrap()
      .get(req.url.path())
      .cloned()
      .unwrap_or((404, b"not found".to_vec()));

    Ok(Response {
      url: req.url.to_string(),
      status,
      content_type: Some("application/json".to_string()),
      body,
    })
  }
}

/// Absolute URL on the fake origin.
pub fn url(path: &str) -> url::Url {
  url::Url::parse(BASE_URL)
    .and_then(|base| base.join(path))
    .unwrap()
}
