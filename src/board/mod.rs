//! The render target: cards, labels and the status line.
//!
//! `Board` is what the poller mutates and what the terminal UI and the
//! HTML snapshot read. Every completed load carries the sequence number it
//! was issued with, and the board ignores completions older than the last
//! one it applied, so a slow early request can never overwrite a newer
//! result.

mod html;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::net::FetchError;
use crate::rates::format::{format_clock, format_timestamp, format_value, PLACEHOLDER};
use crate::rates::{Locale, RatesDocument};

pub use html::render_html;

/// Connectivity state shown under the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
  #[default]
  Idle,
  Updating,
  Ready,
  Offline,
}

impl Status {
  pub fn message(&self) -> &'static str {
    match self {
      Status::Idle => "Waiting for first load",
      Status::Updating => "Updating…",
      Status::Ready => "Ready",
      Status::Offline => "Offline (showing last value if available)",
    }
  }
}

/// A rate ready for display. All strings are already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateCard {
  pub title: String,
  pub pair: String,
  pub value: String,
  pub unit: String,
  /// Document timestamp, identical on every card of one render
  pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Card {
  Rate(RateCard),
  Placeholder { title: String, detail: String },
}

impl Card {
  fn no_data() -> Self {
    Card::Placeholder {
      title: "No data".to_string(),
      detail: "No rates found in rates.json".to_string(),
    }
  }

  fn load_failed() -> Self {
    Card::Placeholder {
      title: "Could not load".to_string(),
      detail: "Check your connection or try again later.".to_string(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Board {
  locale: Locale,
  cards: Vec<Card>,
  server_updated: String,
  client_now: String,
  status: Status,
  /// Sequence number of the newest load applied so far
  last_applied: u64,
  last_error: Option<String>,
}

impl Board {
  pub fn new(locale: Locale) -> Self {
    Self {
      locale,
      cards: Vec::new(),
      server_updated: PLACEHOLDER.to_string(),
      client_now: PLACEHOLDER.to_string(),
      status: Status::Idle,
      last_applied: 0,
      last_error: None,
    }
  }

  /// Replace all cards with the contents of `doc`.
  pub fn render_rates(&mut self, doc: &RatesDocument) {
    self.cards.clear();

    if doc.rates.is_empty() {
      self.cards.push(Card::no_data());
      return;
    }

    let locale = self.locale;
    let updated = format_timestamp(doc.updated_at.as_deref(), locale);
    self.cards.extend(doc.rates.iter().map(|r| {
      Card::Rate(RateCard {
        title: r.title.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
        pair: r.pair.clone().unwrap_or_default(),
        value: format_value(r.value, locale),
        unit: r.unit.clone().unwrap_or_default(),
        updated: updated.clone(),
      })
    }));
  }

  /// A load with sequence `seq` was issued.
  pub fn begin_load(&mut self, seq: u64) {
    if seq > self.last_applied {
      self.status = Status::Updating;
    }
  }

  /// Apply a successful load. Returns false when a newer load already won.
  pub fn apply_loaded(&mut self, seq: u64, doc: &RatesDocument) -> bool {
    if !self.accept(seq) {
      return false;
    }

    self.render_rates(doc);
    self.server_updated = format_timestamp(doc.updated_at.as_deref(), self.locale);
    self.status = Status::Ready;
    self.last_error = None;
    true
  }

  /// Apply a failed load. Existing cards stay; an empty board gets a
  /// "could not load" card. Returns false when a newer load already won.
  pub fn apply_failed(&mut self, seq: u64, err: &FetchError) -> bool {
    if !self.accept(seq) {
      return false;
    }

    warn!(seq, error = %err, "rates load failed");
    self.status = Status::Offline;
    self.last_error = Some(err.to_string());
    if self.cards.is_empty() {
      self.cards.push(Card::load_failed());
    }
    true
  }

  fn accept(&mut self, seq: u64) -> bool {
    if seq <= self.last_applied {
      debug!(seq, last_applied = self.last_applied, "discarding stale load");
      return false;
    }
    self.last_applied = seq;
    true
  }

  pub fn tick_clock(&mut self, now: DateTime<Local>) {
    self.client_now = format_clock(now, self.locale);
  }

  pub fn cards(&self) -> &[Card] {
    &self.cards
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn server_updated(&self) -> &str {
    &self.server_updated
  }

  pub fn client_now(&self) -> &str {
    &self.client_now
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }
}
