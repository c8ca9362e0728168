//! Cache strategies that orchestrate the cache store with network fetching.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::storage::CacheStorage;
use crate::net::{FetchError, Request, Response};

/// Result from a strategy, including the response and where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Network failed and the cache stood in.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Served from the store without touching the network
  Cache,
  /// Network unavailable, serving the stored copy
  Offline,
}

/// Strategies bound to one named cache store.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  cache_name: String,
}

impl<S: CacheStorage> CacheLayer<S> {
  pub fn new(storage: Arc<S>, cache_name: impl Into<String>) -> Self {
    Self {
      storage,
      cache_name: cache_name.into(),
    }
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  /// Network-first.
  ///
  /// 1. Fetch from network; store 2xx responses and return whatever came back
  /// 2. On network failure, return the stored copy (offline mode)
  /// 3. Nothing stored either: `FetchError::NoNetworkNoCache`
  pub async fn network_first<F, Fut>(
    &self,
    req: &Request,
    fetcher: F,
  ) -> Result<CacheResult<Response>, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Response, FetchError>>,
  {
    match fetcher().await {
      Ok(fresh) => {
        self.store(req, &fresh);
        Ok(CacheResult::from_network(fresh))
      }
      Err(err) => {
        debug!(url = %req.url, error = %err, "network failed, trying cache");
        match self.lookup(req) {
          Some((cached, cached_at)) => Ok(CacheResult::offline(cached, cached_at)),
          None => Err(FetchError::NoNetworkNoCache),
        }
      }
    }
  }

  /// Cache-first.
  ///
  /// 1. Stored copy present: return it without calling the fetcher
  /// 2. Otherwise fetch, store 2xx responses and return the response
  /// 3. Network errors propagate unchanged
  pub async fn cache_first<F, Fut>(
    &self,
    req: &Request,
    fetcher: F,
  ) -> Result<CacheResult<Response>, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Response, FetchError>>,
  {
    if let Some((cached, cached_at)) = self.lookup(req) {
      return Ok(CacheResult::from_cache(cached, cached_at));
    }

    let fresh = fetcher().await?;
    self.store(req, &fresh);
    Ok(CacheResult::from_network(fresh))
  }

  /// Read errors count as a miss.
  fn lookup(&self, req: &Request) -> Option<(Response, DateTime<Utc>)> {
    match self.storage.match_ignoring_search(&self.cache_name, req) {
      Ok(Some(entry)) => {
        debug!(url = %req.url, stored_for = %entry.request_url, "cache hit");
        Some((entry.response, entry.cached_at))
      }
      Ok(None) => None,
      Err(e) => {
        warn!(url = %req.url, error = %e, "cache read failed");
        None
      }
    }
  }

  /// Only 2xx responses are kept. Write errors never fail the request.
  fn store(&self, req: &Request, resp: &Response) {
    if !resp.is_ok() {
      debug!(url = %req.url, status = resp.status, "not caching non-success response");
      return;
    }
    if let Err(e) = self.storage.put(&self.cache_name, req, resp) {
      warn!(url = %req.url, error = %e, "cache write failed");
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      cache_name: self.cache_name.clone(),
    }
  }
}
