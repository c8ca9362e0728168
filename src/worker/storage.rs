//! Cache storage trait and SQLite implementation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::net::{Request, Response};

/// A stored request/response pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
  /// URL of the request that produced the entry, query string included
  pub request_url: String,
  pub response: Response,
  pub cached_at: DateTime<Utc>,
}

/// Named cache stores holding request/response pairs.
///
/// Lookups always ignore the query string, so entries are keyed on the
/// request URL without it and a later put for the same path replaces the
/// earlier one.
pub trait CacheStorage: Send + Sync {
  /// Create the named store if it does not exist yet.
  fn open(&self, cache_name: &str) -> Result<()>;

  /// Whether the named store exists.
  fn has(&self, cache_name: &str) -> Result<bool>;

  /// Names of all stores, oldest first.
  fn keys(&self) -> Result<Vec<String>>;

  /// Delete a store and everything in it. Returns false if it did not exist.
  fn delete(&self, cache_name: &str) -> Result<bool>;

  /// Store one response.
  fn put(&self, cache_name: &str, req: &Request, resp: &Response) -> Result<()>;

  /// Store several responses atomically: either all are written or none.
  fn put_all(&self, cache_name: &str, entries: &[(Request, Response)]) -> Result<()>;

  /// Find the entry for `req`, ignoring its query string.
  fn match_ignoring_search(&self, cache_name: &str, req: &Request) -> Result<Option<CachedEntry>>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// A throwaway database that lives as long as the storage.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("ratemon").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One row per named cache store
CREATE TABLE IF NOT EXISTS cache_stores (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored responses, keyed on the request URL without its query string
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name TEXT NOT NULL,
    key_hash TEXT NOT NULL,
    request_url TEXT NOT NULL,
    response_url TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, key_hash)
);
"#;

/// SHA256 of the search-less request URL, for stable fixed-length keys.
fn key_hash(req: &Request) -> String {
  let mut hasher = Sha256::new();
  hasher.update(req.url_without_search().as_bytes());
  hex::encode(hasher.finalize())
}

fn insert_entry(conn: &Connection, cache_name: &str, req: &Request, resp: &Response) -> Result<()> {
  conn
    .execute(
      "INSERT OR IGNORE INTO cache_stores (name) VALUES (?)",
      params![cache_name],
    )
    .map_err(|e| eyre!("Failed to create cache store {}: {}", cache_name, e))?;

  conn
    .execute(
      "INSERT OR REPLACE INTO cache_entries
         (cache_name, key_hash, request_url, response_url, status, content_type, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        cache_name,
        key_hash(req),
        req.url.as_str(),
        resp.url,
        resp.status,
        resp.content_type,
        resp.body,
      ],
    )
    .map_err(|e| eyre!("Failed to store {}: {}", req.url, e))?;

  Ok(())
}

impl CacheStorage for SqliteStorage {
  fn open(&self, cache_name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO cache_stores (name) VALUES (?)",
        params![cache_name],
      )
      .map_err(|e| eyre!("Failed to create cache store {}: {}", cache_name, e))?;

    Ok(())
  }

  fn has(&self, cache_name: &str) -> Result<bool> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let found: Option<String> = conn
      .query_row(
        "SELECT name FROM cache_stores WHERE name = ?",
        params![cache_name],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cache store {}: {}", cache_name, e))?;

    Ok(found.is_some())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM cache_stores ORDER BY created_at, name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list cache stores: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache store name: {}", e))?;

    Ok(names)
  }

  fn delete(&self, cache_name: &str) -> Result<bool> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "DELETE FROM cache_entries WHERE cache_name = ?",
      params![cache_name],
    )
    .map_err(|e| eyre!("Failed to delete entries of {}: {}", cache_name, e))?;

    let removed = tx
      .execute("DELETE FROM cache_stores WHERE name = ?", params![cache_name])
      .map_err(|e| eyre!("Failed to delete cache store {}: {}", cache_name, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn put(&self, cache_name: &str, req: &Request, resp: &Response) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    insert_entry(&conn, cache_name, req, resp)
  }

  fn put_all(&self, cache_name: &str, entries: &[(Request, Response)]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    // Create the store even when there is nothing to put
    tx.execute(
      "INSERT OR IGNORE INTO cache_stores (name) VALUES (?)",
      params![cache_name],
    )
    .map_err(|e| eyre!("Failed to create cache store {}: {}", cache_name, e))?;

    for (req, resp) in entries {
      insert_entry(&tx, cache_name, req, resp)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn match_ignoring_search(&self, cache_name: &str, req: &Request) -> Result<Option<CachedEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row = conn
      .query_row(
        "SELECT request_url, response_url, status, content_type, body, cached_at
         FROM cache_entries WHERE cache_name = ? AND key_hash = ?",
        params![cache_name, key_hash(req)],
        |row| {
          Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u16>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Vec<u8>>(4)?,
            row.get::<_, String>(5)?,
          ))
        },
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache for {}: {}", req.url, e))?;

    match row {
      Some((request_url, url, status, content_type, body, cached_at)) => Ok(Some(CachedEntry {
        request_url,
        response: Response {
          url,
          status,
          content_type,
          body,
        },
        cached_at: parse_datetime(&cached_at)?,
      })),
      None => Ok(None),
    }
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::net::testing::url;

  fn response(path: &str, body: &str) -> Response {
    Response {
      url: url(path).to_string(),
      status: 200,
      content_type: Some("text/plain".to_string()),
      body: body.as_bytes().to_vec(),
    }
  }

  #[test]
  fn test_put_and_match_ignoring_search() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let req = Request::get(url("/rates.json?t=1"));
    storage.put("v1", &req, &response("/rates.json", "one")).unwrap();

    let other_query = Request::get(url("/rates.json?t=2"));
    let hit = storage.match_ignoring_search("v1", &other_query).unwrap().unwrap();
    assert_eq!(hit.response.body, b"one");
    assert_eq!(hit.request_url, url("/rates.json?t=1").to_string());

    assert!(storage
      .match_ignoring_search("v1", &Request::get(url("/app.js")))
      .unwrap()
      .is_none());
  }

  #[test]
  fn test_later_put_replaces_entry() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .put("v1", &Request::get(url("/rates.json?t=1")), &response("/rates.json", "old"))
      .unwrap();
    storage
      .put("v1", &Request::get(url("/rates.json?t=2")), &response("/rates.json", "new"))
      .unwrap();

    let hit = storage
      .match_ignoring_search("v1", &Request::get(url("/rates.json")))
      .unwrap()
      .unwrap();
    assert_eq!(hit.response.body, b"new");
  }

  #[test]
  fn test_stores_are_isolated() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let req = Request::get(url("/styles.css"));
    storage.put("v1", &req, &response("/styles.css", "a")).unwrap();

    assert!(storage.match_ignoring_search("v2", &req).unwrap().is_none());
  }

  #[test]
  fn test_keys_open_and_delete() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.open("a").unwrap();
    storage.open("b").unwrap();
    storage.open("a").unwrap();
    assert_eq!(storage.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    assert!(storage.has("a").unwrap());

    let req = Request::get(url("/"));
    storage.put("a", &req, &response("/", "shell")).unwrap();
    assert!(storage.delete("a").unwrap());
    assert!(!storage.delete("a").unwrap());
    assert!(!storage.has("a").unwrap());
    assert!(storage.match_ignoring_search("a", &req).unwrap().is_none());
    assert_eq!(storage.keys().unwrap(), vec!["b".to_string()]);
  }

  #[test]
  fn test_put_all_creates_store() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let entries = vec![
      (Request::get(url("/")), response("/", "root")),
      (Request::get(url("/app.js")), response("/app.js", "js")),
    ];
    storage.put_all("v1", &entries).unwrap();

    assert!(storage.has("v1").unwrap());
    let hit = storage
      .match_ignoring_search("v1", &Request::get(url("/app.js?v=3")))
      .unwrap()
      .unwrap();
    assert_eq!(hit.response.body, b"js");
  }
}
