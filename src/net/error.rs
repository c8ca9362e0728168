use thiserror::Error;

/// Failures a fetch can end in, on either side of the worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  #[error("Network error: {0}")]
  Network(String),

  #[error("HTTP {0}")]
  Status(u16),

  #[error("Invalid response: {0}")]
  InvalidResponse(String),

  #[error("No network and no cache")]
  NoNetworkNoCache,
}

impl From<reqwest::Error> for FetchError {
  fn from(err: reqwest::Error) -> Self {
    FetchError::Network(err.to_string())
  }
}

impl From<serde_json::Error> for FetchError {
  fn from(err: serde_json::Error) -> Self {
    FetchError::InvalidResponse(err.to_string())
  }
}
