use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::rates::Locale;
use crate::worker::WorkerConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub server: ServerConfig,
  /// Seconds between scheduled refreshes
  pub poll_interval_secs: u64,
  /// Custom title for header (defaults to the server host if not set)
  pub title: Option<String>,
  pub display: DisplayConfig,
  pub worker: WorkerSettings,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      server: ServerConfig::default(),
      poll_interval_secs: 120,
      title: None,
      display: DisplayConfig::default(),
      worker: WorkerSettings::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Base URL of the site serving the rates document
  pub url: Option<String>,
  /// Absolute path of the rates document on that site
  pub rates_path: String,
  pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      url: None,
      rates_path: "/rates.json".to_string(),
      connect_timeout_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
  pub locale: Locale,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
  pub enabled: bool,
  pub cache_prefix: String,
  /// Bumping this invalidates every store from earlier versions
  pub version: u32,
  /// App shell paths cached at install time
  pub shell: Vec<String>,
  /// SQLite file (defaults to $XDG_DATA_HOME/ratemon/cache.db)
  pub database: Option<PathBuf>,
}

impl Default for WorkerSettings {
  fn default() -> Self {
    Self {
      enabled: true,
      cache_prefix: "monitor-tasas".to_string(),
      version: 1,
      shell: [
        "/",
        "/index.html",
        "/styles.css",
        "/app.js",
        "/rates.json",
        "/manifest.webmanifest",
        "/icons/icon-192.png",
        "/icons/icon-512.png",
      ]
      .into_iter()
      .map(String::from)
      .collect(),
      database: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ratemon.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ratemon/config.yaml
  ///
  /// With no file anywhere the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("ratemon.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ratemon").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  fn base_url(&self) -> Result<Url> {
    let raw = self.server.url.as_deref().ok_or_else(|| {
      eyre!("No server URL configured. Set server.url in the config file or pass --url.")
    })?;
    Url::parse(raw).map_err(|e| eyre!("Invalid server URL {}: {}", raw, e))
  }

  /// Full URL of the rates document.
  pub fn rates_url(&self) -> Result<Url> {
    let base = self.base_url()?;
    base
      .join(&self.server.rates_path)
      .map_err(|e| eyre!("Invalid rates path {}: {}", self.server.rates_path, e))
  }

  pub fn poll_interval(&self) -> Duration {
    // tokio intervals reject a zero period
    Duration::from_secs(self.poll_interval_secs.max(1))
  }

  pub fn connect_timeout(&self) -> Duration {
    Duration::from_secs(self.server.connect_timeout_secs)
  }

  /// Header title: explicit title, else the server host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    self
      .base_url()
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| "ratemon".to_string())
  }

  /// Versioned store name, e.g. "monitor-tasas-v1".
  pub fn cache_name(&self) -> String {
    format!("{}-v{}", self.worker.cache_prefix, self.worker.version)
  }

  pub fn worker_config(&self) -> Result<WorkerConfig> {
    let base = self.base_url()?;
    let shell = self
      .worker
      .shell
      .iter()
      .map(|p| {
        base
          .join(p)
          .map_err(|e| eyre!("Invalid shell path {}: {}", p, e))
      })
      .collect::<Result<Vec<_>>>()?;

    let rates_file = self
      .server
      .rates_path
      .rsplit('/')
      .next()
      .unwrap_or_default()
      .to_string();

    Ok(WorkerConfig {
      cache_name: self.cache_name(),
      shell,
      rates_file,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.poll_interval_secs, 120);
    assert_eq!(config.server.rates_path, "/rates.json");
    assert_eq!(config.display.locale, Locale::En);
    assert!(config.worker.enabled);
    assert_eq!(config.worker.shell.len(), 8);
    assert_eq!(config.cache_name(), "monitor-tasas-v1");
  }

  #[test]
  fn test_full_file() {
    let config = Config::from_yaml(
      r#"
server:
  url: https://tasas.example.com/app/
  rates_path: /data/rates.json
poll_interval_secs: 30
title: Tasas
display:
  locale: es
worker:
  version: 3
  shell: ["/", "/data/rates.json"]
"#,
    )
    .unwrap();

    assert_eq!(
      config.rates_url().unwrap().as_str(),
      "https://tasas.example.com/data/rates.json"
    );
    assert_eq!(config.poll_interval(), Duration::from_secs(30));
    assert_eq!(config.display.locale, Locale::Es);
    assert_eq!(config.display_title(), "Tasas");

    let worker = config.worker_config().unwrap();
    assert_eq!(worker.cache_name, "monitor-tasas-v3");
    assert_eq!(worker.rates_file, "rates.json");
    assert_eq!(worker.shell[1].as_str(), "https://tasas.example.com/data/rates.json");
  }

  #[test]
  fn test_missing_url_is_an_error() {
    let config = Config::default();
    assert!(config.rates_url().is_err());
    assert_eq!(config.display_title(), "ratemon");
  }

  #[test]
  fn test_title_falls_back_to_host() {
    let mut config = Config::default();
    config.server.url = Some("https://rates.example.org".to_string());
    assert_eq!(config.display_title(), "rates.example.org");
  }

  #[test]
  fn test_zero_interval_is_clamped() {
    let config = Config::from_yaml("poll_interval_secs: 0").unwrap();
    assert_eq!(config.poll_interval(), Duration::from_secs(1));
  }

  #[test]
  fn test_unknown_locale_is_rejected() {
    assert!(Config::from_yaml("display:\n  locale: fr").is_err());
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/ratemon.yaml"))).is_err());
  }
}
