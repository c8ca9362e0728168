//! The fetch layer the poller talks to.

use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::net::{FetchError, Network, Request, Response};
use crate::worker::{CacheStorage, CacheWorker};

/// Routes requests through the cache worker while it is in control, and
/// straight to the network otherwise.
///
/// The worker slot starts empty and is filled at most once, whenever
/// registration finishes. Clones share the slot.
pub struct Transport<S: CacheStorage, N: Network + Clone> {
  network: N,
  worker: Arc<OnceLock<Arc<CacheWorker<S, N>>>>,
}

impl<S: CacheStorage, N: Network + Clone> Transport<S, N> {
  /// No worker registered yet.
  pub fn direct(network: N) -> Self {
    Self {
      network,
      worker: Arc::new(OnceLock::new()),
    }
  }

  /// Hand requests to `worker` from now on. Returns false if a worker was
  /// already attached; the first one stays.
  pub fn attach(&self, worker: Arc<CacheWorker<S, N>>) -> bool {
    if self.worker.set(worker).is_err() {
      warn!("cache worker already attached");
      return false;
    }
    true
  }

  pub fn worker(&self) -> Option<&CacheWorker<S, N>> {
    self.worker.get().map(|w| w.as_ref())
  }

  pub async fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
    if let Some(worker) = self.worker().filter(|w| w.is_controlling()) {
      if let Some(result) = worker.handle_fetch(req).await {
        return result;
      }
    }
    self.network.fetch(req).await
  }
}

impl<S: CacheStorage, N: Network + Clone> Clone for Transport<S, N> {
  fn clone(&self) -> Self {
    Self {
      network: self.network.clone(),
      worker: Arc::clone(&self.worker),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::net::testing::{url, FakeNetwork};
  use crate::net::Method;
  use crate::worker::{SqliteStorage, WorkerConfig};

  fn worker(network: &Arc<FakeNetwork>) -> Arc<CacheWorker<SqliteStorage, Arc<FakeNetwork>>> {
    Arc::new(CacheWorker::new(
      Arc::new(SqliteStorage::open_in_memory().unwrap()),
      network.clone(),
      WorkerConfig {
        cache_name: "t-v1".to_string(),
        shell: vec![url("/rates.json")],
        rates_file: "rates.json".to_string(),
      },
    ))
  }

  #[tokio::test]
  async fn test_direct_transport_uses_network() {
    let network = Arc::new(FakeNetwork::new());
    network.serve("/rates.json", 200, "{}");
    let transport: Transport<SqliteStorage, _> = Transport::direct(network.clone());

    let resp = transport.fetch(&Request::get(url("/rates.json"))).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(network.call_count(), 1);
  }

  #[test]
  fn test_clones_share_one_worker_slot() {
    let network = Arc::new(FakeNetwork::new());
    let transport = Transport::direct(network.clone());
    let clone = transport.clone();
    assert!(clone.worker().is_none());

    let first = worker(&network);
    assert!(transport.attach(first.clone()));
    assert!(!clone.attach(worker(&network)));
    assert!(std::ptr::eq(clone.worker().unwrap(), first.as_ref()));
  }

  #[tokio::test]
  async fn test_worker_not_in_control_is_bypassed() {
    let network = Arc::new(FakeNetwork::new());
    network.serve("/rates.json", 200, "{}");
    let worker = worker(&network);
    let transport = Transport::direct(network.clone());
    assert!(transport.attach(worker));

    // Not activated yet
    network.go_offline();
    let result = transport.fetch(&Request::get(url("/rates.json"))).await;
    assert!(matches!(result, Err(FetchError::Network(_))));
  }

  #[tokio::test]
  async fn test_controlling_worker_serves_offline() {
    let network = Arc::new(FakeNetwork::new());
    network.serve("/rates.json", 200, r#"{"rates":[]}"#);
    let worker = worker(&network);
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    let transport = Transport::direct(network.clone());
    transport.attach(worker);

    network.go_offline();
    let resp = transport
      .fetch(&Request::get(url("/rates.json?t=1")))
      .await
      .unwrap();
    assert_eq!(resp.body, br#"{"rates":[]}"#);
  }

  #[tokio::test]
  async fn test_non_get_goes_straight_to_network() {
    let network = Arc::new(FakeNetwork::new());
    network.serve("/rates.json", 200, "{}");
    let worker = worker(&network);
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    let transport = Transport::direct(network.clone());
    transport.attach(worker);
    network.serve("/rates.json", 405, "");
    let before = network.call_count();

    let mut req = Request::get(url("/rates.json"));
    req.method = Method::Post;
    let resp = transport.fetch(&req).await.unwrap();
    assert_eq!(resp.status, 405);
    assert_eq!(network.call_count(), before + 1);
  }
}
