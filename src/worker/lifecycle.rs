use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use tracing::{debug, info, warn};
use url::Url;

use super::storage::CacheStorage;
use super::strategy::{CacheLayer, CacheResult};
use crate::net::{CacheMode, FetchError, Method, Network, Request, Response};

/// Worker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Parsed,
  Installing,
  Installed,
  Activating,
  Activated,
  /// Installation failed; the worker never controls anything
  Redundant,
}

/// What a worker version caches and how it recognises the rates document.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
  /// Versioned store name, e.g. "monitor-tasas-v1"
  pub cache_name: String,
  /// App shell fetched at install time
  pub shell: Vec<Url>,
  /// Requests whose path ends with "/<rates_file>" go network-first
  pub rates_file: String,
}

pub struct CacheWorker<S: CacheStorage, N: Network> {
  layer: CacheLayer<S>,
  network: N,
  config: WorkerConfig,
  state: Mutex<WorkerState>,
  controlling: AtomicBool,
}

impl<S: CacheStorage, N: Network> CacheWorker<S, N> {
  pub fn new(storage: Arc<S>, network: N, config: WorkerConfig) -> Self {
    Self {
      layer: CacheLayer::new(storage, config.cache_name.clone()),
      network,
      config,
      state: Mutex::new(WorkerState::Parsed),
      controlling: AtomicBool::new(false),
    }
  }

  pub fn state(&self) -> WorkerState {
    self
      .state
      .lock()
      .map(|s| *s)
      .unwrap_or(WorkerState::Redundant)
  }

  fn set_state(&self, state: WorkerState) {
    if let Ok(mut current) = self.state.lock() {
      let from = *current;
      debug!(?from, to = ?state, "worker state");
      *current = state;
    }
  }

  /// Whether fetches should be routed through this worker.
  pub fn is_controlling(&self) -> bool {
    self.controlling.load(Ordering::SeqCst)
  }

  pub fn cache_name(&self) -> &str {
    &self.config.cache_name
  }

  /// Fetch the whole shell fresh and store it in one go.
  ///
  /// Any network error or non-2xx response fails the install and nothing
  /// is written.
  pub async fn install(&self) -> Result<()> {
    self.set_state(WorkerState::Installing);
    info!(cache = %self.config.cache_name, assets = self.config.shell.len(), "installing");

    let fetches = self.config.shell.iter().map(|url| async move {
      let req = Request::get(url.clone()).with_mode(CacheMode::NoStore);
      let resp = self
        .network
        .fetch(&req)
        .await
        .and_then(Response::error_for_status)
        .map_err(|e| eyre!("Failed to fetch shell resource {}: {}", url, e))?;
      Ok::<_, color_eyre::Report>((req, resp))
    });

    let entries = match try_join_all(fetches).await {
      Ok(entries) => entries,
      Err(e) => {
        self.set_state(WorkerState::Redundant);
        return Err(e);
      }
    };

    if let Err(e) = self.layer.storage().put_all(&self.config.cache_name, &entries) {
      self.set_state(WorkerState::Redundant);
      return Err(e);
    }

    self.set_state(WorkerState::Installed);
    Ok(())
  }

  /// Delete every store but the current one, then take control.
  pub async fn activate(&self) -> Result<()> {
    self.set_state(WorkerState::Activating);

    let storage = self.layer.storage();
    for name in storage.keys()? {
      if name != self.config.cache_name {
        storage.delete(&name)?;
        info!(cache = %name, "deleted old cache store");
      }
    }
    storage.open(&self.config.cache_name)?;

    // Claim clients: fetches route through the worker from now on
    self.controlling.store(true, Ordering::SeqCst);
    self.set_state(WorkerState::Activated);
    info!(cache = %self.config.cache_name, "worker activated");
    Ok(())
  }

  /// Answer an intercepted request.
  ///
  /// Returns None for requests the worker does not intercept (anything
  /// but GET); the caller sends those to the network itself.
  pub async fn handle_fetch(&self, req: &Request) -> Option<Result<Response, FetchError>> {
    if req.method != Method::Get {
      return None;
    }

    let result = if self.is_rates_request(req) {
      let fresh = req.clone().with_mode(CacheMode::NoStore);
      self
        .layer
        .network_first(req, || self.network.fetch(&fresh))
        .await
    } else {
      self.layer.cache_first(req, || self.network.fetch(req)).await
    };

    Some(result.map(|r: CacheResult<Response>| {
      debug!(url = %req.url, source = ?r.source, cached_at = ?r.cached_at, "served");
      r.data
    }))
  }

  fn is_rates_request(&self, req: &Request) -> bool {
    req
      .url
      .path()
      .ends_with(&format!("/{}", self.config.rates_file))
  }
}

/// Bring a worker for `config` to the activated state.
///
/// A store left by an earlier run of the same version counts as an
/// existing installation and is reused without touching the network.
pub async fn register<S, N>(
  storage: Arc<S>,
  network: N,
  config: WorkerConfig,
) -> Result<CacheWorker<S, N>>
where
  S: CacheStorage,
  N: Network,
{
  let worker = CacheWorker::new(storage, network, config);

  if worker.layer.storage().has(worker.cache_name())? {
    info!(cache = %worker.cache_name(), "reusing installed cache store");
    worker.set_state(WorkerState::Installed);
  } else if let Err(e) = worker.install().await {
    warn!(error = %e, "worker install failed");
    return Err(e);
  }

  // Install skips waiting: activate right away
  worker.activate().await?;
  Ok(worker)
}
