//! Display formatting for rate values and timestamps.

use std::fmt::Display;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// Shown wherever a value is missing or cannot be displayed
pub const PLACEHOLDER: &str = "—";

/// Maximum fractional digits for non-integer values
const MAX_FRACTION_DIGITS: usize = 4;

/// Display conventions for numbers and dates.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
  /// 1,234.5678 and MM/DD/YYYY
  #[default]
  En,
  /// 1.234,5678 and DD/MM/YYYY
  Es,
}

impl Locale {
  fn group_separator(&self) -> char {
    match self {
      Locale::En => ',',
      Locale::Es => '.',
    }
  }

  fn decimal_separator(&self) -> char {
    match self {
      Locale::En => '.',
      Locale::Es => ',',
    }
  }

  fn datetime_pattern(&self) -> &'static str {
    match self {
      Locale::En => "%m/%d/%Y, %H:%M:%S",
      Locale::Es => "%d/%m/%Y, %H:%M:%S",
    }
  }
}

/// Format a rate value.
///
/// Integers are printed as is, without grouping. Anything else is rounded
/// to four fractional digits, trailing zeros dropped, and the integer part
/// grouped by thousands.
pub fn format_number(n: f64, locale: Locale) -> String {
  if !n.is_finite() {
    return PLACEHOLDER.to_string();
  }
  if n.fract() == 0.0 {
    // -0.0 prints as "-0"
    return if n == 0.0 { "0".to_string() } else { format!("{}", n) };
  }

  let rounded = format!("{:.*}", MAX_FRACTION_DIGITS, break_tie_away_from_zero(n.abs()));
  let (int_part, frac_part) = rounded.split_once('.').unwrap_or((&rounded, ""));
  let frac_part = frac_part.trim_end_matches('0');
  let grouped = group_thousands(int_part, locale.group_separator());

  let mut out = String::new();
  if n < 0.0 && !(grouped == "0" && frac_part.is_empty()) {
    out.push('-');
  }
  out.push_str(&grouped);
  if !frac_part.is_empty() {
    out.push(locale.decimal_separator());
    out.push_str(frac_part);
  }
  out
}

/// `{:.4}` rounds exact ties to even; displayed values round them away
/// from zero. A fifth-digit tie is only exact for odd multiples of 1/32,
/// which are representable, so they can be detected without error and
/// moved one ulp up.
fn break_tie_away_from_zero(abs: f64) -> f64 {
  let is_tie = (abs * 32.0).fract() == 0.0 && (abs * 16.0).fract() != 0.0;
  if is_tie {
    f64::from_bits(abs.to_bits() + 1)
  } else {
    abs
  }
}

/// Format an optional value, using the placeholder when absent.
pub fn format_value(value: Option<f64>, locale: Locale) -> String {
  match value {
    Some(n) => format_number(n, locale),
    None => PLACEHOLDER.to_string(),
  }
}

fn group_thousands(digits: &str, separator: char) -> String {
  let len = digits.len();
  let mut out = String::with_capacity(len + len / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (len - i) % 3 == 0 {
      out.push(separator);
    }
    out.push(c);
  }
  out
}

/// Parse a server timestamp.
///
/// Accepts RFC 3339, a date-time without offset (read as local time) and
/// a bare date (read as UTC midnight).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();

  if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }

  if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
    return Local
      .from_local_datetime(&naive)
      .earliest()
      .map(|dt| dt.with_timezone(&Utc));
  }

  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

/// Render an instant in the given time zone.
pub fn format_in<Tz>(dt: &DateTime<Utc>, tz: &Tz, locale: Locale) -> String
where
  Tz: TimeZone,
  Tz::Offset: Display,
{
  dt.with_timezone(tz)
    .format(locale.datetime_pattern())
    .to_string()
}

/// Format a server timestamp for the viewer's local time zone.
/// Missing or unparseable input yields the placeholder.
pub fn format_timestamp(iso: Option<&str>, locale: Locale) -> String {
  iso
    .and_then(parse_timestamp)
    .map(|dt| format_in(&dt, &Local, locale))
    .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Format the current wall-clock time.
pub fn format_clock(now: DateTime<Local>, locale: Locale) -> String {
  now.format(locale.datetime_pattern()).to_string()
}

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#039;"),
      _ => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_integers_have_no_decimals() {
    assert_eq!(format_number(1500.0, Locale::En), "1500");
    assert_eq!(format_number(0.0, Locale::En), "0");
    assert_eq!(format_number(-0.0, Locale::En), "0");
    assert_eq!(format_number(-42.0, Locale::Es), "-42");
  }

  #[test]
  fn test_fraction_grouping_en() {
    assert_eq!(format_number(1234.5678, Locale::En), "1,234.5678");
    assert_eq!(format_number(1234567.5, Locale::En), "1,234,567.5");
    assert_eq!(format_number(0.25, Locale::En), "0.25");
  }

  #[test]
  fn test_fraction_grouping_es() {
    assert_eq!(format_number(1234.5678, Locale::Es), "1.234,5678");
    assert_eq!(format_number(-987654.125, Locale::Es), "-987.654,125");
  }

  #[test]
  fn test_at_most_four_fraction_digits() {
    for n in [1.0 / 3.0, 2.718281828, 1234.56789, 0.00012345, 99.99999] {
      let s = format_number(n, Locale::En);
      let digits = s.split_once('.').map(|(_, f)| f.len()).unwrap_or(0);
      assert!(digits <= 4, "{} -> {}", n, s);
    }
    assert_eq!(format_number(1.0 / 3.0, Locale::En), "0.3333");
    assert_eq!(format_number(99.99999, Locale::En), "100");
  }

  #[test]
  fn test_ties_round_away_from_zero() {
    assert_eq!(format_number(0.03125, Locale::En), "0.0313");
    assert_eq!(format_number(1.03125, Locale::En), "1.0313");
    assert_eq!(format_number(-0.03125, Locale::En), "-0.0313");
    assert_eq!(format_number(1234.40625, Locale::Es), "1.234,4063");
    // Not a tie, plain rounding
    assert_eq!(format_number(0.09374, Locale::En), "0.0937");
  }

  #[test]
  fn test_tiny_negative_rounds_to_zero() {
    assert_eq!(format_number(-0.00001, Locale::En), "0");
  }

  #[test]
  fn test_non_finite_and_missing_values() {
    assert_eq!(format_number(f64::NAN, Locale::En), PLACEHOLDER);
    assert_eq!(format_value(None, Locale::En), PLACEHOLDER);
    assert_eq!(format_value(Some(3.0), Locale::En), "3");
  }

  #[test]
  fn test_parse_timestamp_variants() {
    let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(expected));
    assert_eq!(parse_timestamp("2024-01-01T03:00:00+03:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-01-01"), Some(expected));
    assert!(parse_timestamp("2024-01-01T00:00:00").is_some());
    assert_eq!(parse_timestamp("yesterday"), None);
    assert_eq!(parse_timestamp(""), None);
  }

  #[test]
  fn test_format_in_locale_order() {
    let dt = Utc.with_ymd_and_hms(2024, 1, 2, 13, 4, 5).unwrap();
    assert_eq!(format_in(&dt, &Utc, Locale::En), "01/02/2024, 13:04:05");
    assert_eq!(format_in(&dt, &Utc, Locale::Es), "02/01/2024, 13:04:05");

    let art = FixedOffset::west_opt(3 * 3600).unwrap();
    assert_eq!(format_in(&dt, &art, Locale::Es), "02/01/2024, 10:04:05");
  }

  #[test]
  fn test_format_timestamp_placeholder() {
    assert_eq!(format_timestamp(None, Locale::En), PLACEHOLDER);
    assert_eq!(format_timestamp(Some("not a date"), Locale::En), PLACEHOLDER);
    assert_ne!(format_timestamp(Some("2024-01-01T12:00:00Z"), Locale::En), PLACEHOLDER);
  }

  #[test]
  fn test_escape_html() {
    assert_eq!(
      escape_html(r#"<b class="x">Tom & Jerry's</b>"#),
      "&lt;b class=&quot;x&quot;&gt;Tom &amp; Jerry&#039;s&lt;/b&gt;"
    );
    assert_eq!(escape_html("USD/ARS"), "USD/ARS");
  }
}
