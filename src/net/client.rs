use std::future::Future;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use reqwest::{header, Client};
use tracing::debug;

use super::{CacheMode, FetchError, Method, Request, Response};

/// Anything that can turn a request into a response.
///
/// The worker and the transport are generic over this so tests can script
/// the network without sockets.
pub trait Network: Send + Sync {
  fn fetch(&self, req: &Request) -> impl Future<Output = Result<Response, FetchError>> + Send;
}

/// reqwest-backed network.
/// Clone is cheap - reqwest::Client shares its connection pool.
#[derive(Clone)]
pub struct HttpNetwork {
  client: Client,
}

impl HttpNetwork {
  /// Build a client with the given connect timeout.
  ///
  /// No overall request timeout is set; a request runs until the server
  /// answers or the connection drops.
  pub fn new(connect_timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .connect_timeout(connect_timeout)
      .user_agent(concat!("ratemon/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Network for HttpNetwork {
  async fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
    let method = match req.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
    };

    let mut builder = self.client.request(method, req.url.clone());
    if req.mode == CacheMode::NoStore {
      builder = builder
        .header(header::CACHE_CONTROL, "no-store")
        .header(header::PRAGMA, "no-cache");
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let content_type = response
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response.bytes().await?.to_vec();

    debug!(method = req.method.as_str(), %url, status, bytes = body.len(), "fetched");

    Ok(Response {
      url,
      status,
      content_type,
      body,
    })
  }
}

impl<N: Network> Network for std::sync::Arc<N> {
  fn fetch(&self, req: &Request) -> impl Future<Output = Result<Response, FetchError>> + Send {
    (**self).fetch(req)
  }
}
