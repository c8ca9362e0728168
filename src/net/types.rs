use url::Url;

use super::FetchError;

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  /// The app only issues GETs; POST exercises the worker's pass-through
  #[cfg_attr(not(test), allow(dead_code))]
  Post,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
    }
  }
}

/// How a request treats intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
  /// Let HTTP caches answer as they normally would
  #[default]
  Default,
  /// Always go to the origin and do not keep the response in HTTP caches
  NoStore,
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub mode: CacheMode,
}

impl Request {
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::Get,
      url,
      mode: CacheMode::Default,
    }
  }

  pub fn with_mode(mut self, mode: CacheMode) -> Self {
    self.mode = mode;
    self
  }

  /// The request URL with query string and fragment removed.
  ///
  /// Cache lookups are keyed on this, so `/rates.json?t=1` and
  /// `/rates.json?t=2` share one entry.
  pub fn url_without_search(&self) -> String {
    let mut url = self.url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.to_string()
  }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub url: String,
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl Response {
  /// True for 2xx statuses.
  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Turn a non-2xx response into `FetchError::Status`.
  pub fn error_for_status(self) -> Result<Self, FetchError> {
    if self.is_ok() {
      Ok(self)
    } else {
      Err(FetchError::Status(self.status))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_url_without_search_strips_query_and_fragment() {
    let url = Url::parse("https://rates.example.com/rates.json?t=1700000000000#top").unwrap();
    let req = Request::get(url);
    assert_eq!(req.url_without_search(), "https://rates.example.com/rates.json");
  }

  #[test]
  fn test_error_for_status() {
    let ok = Response {
      url: "https://rates.example.com/".to_string(),
      status: 204,
      content_type: None,
      body: Vec::new(),
    };
    assert!(ok.clone().error_for_status().is_ok());

    let missing = Response { status: 404, ..ok };
    assert_eq!(missing.error_for_status(), Err(FetchError::Status(404)));
  }
}
