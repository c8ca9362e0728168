//! The rates document and everything needed to display it.

pub mod format;
mod types;

pub use format::Locale;
pub use types::{RateEntry, RatesDocument};
