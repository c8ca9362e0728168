use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::net::FetchError;

/// The JSON document served at `/rates.json`.
///
/// Parsing only checks shape: anything that is valid JSON produces a
/// document, with missing or oddly typed fields left empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RatesDocument {
  #[serde(default, deserialize_with = "lenient_text")]
  pub updated_at: Option<String>,
  #[serde(default, deserialize_with = "lenient_entries")]
  pub rates: Vec<RateEntry>,
}

/// One rate shown as a card.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RateEntry {
  #[serde(default, deserialize_with = "lenient_text")]
  pub title: Option<String>,
  #[serde(default, deserialize_with = "lenient_text")]
  pub pair: Option<String>,
  /// None when the value is missing or not numeric
  #[serde(default, deserialize_with = "lenient_number")]
  pub value: Option<f64>,
  #[serde(default, deserialize_with = "lenient_text")]
  pub unit: Option<String>,
}

impl RatesDocument {
  /// Parse a response body. Fails when the body is not JSON or is `null`;
  /// any other non-object document has no fields and is empty.
  pub fn parse(body: &[u8]) -> Result<Self, FetchError> {
    let value: Value = serde_json::from_slice(body)?;
    match value {
      Value::Object(_) => Ok(serde_json::from_value(value)?),
      Value::Null => Err(FetchError::InvalidResponse("document is null".to_string())),
      _ => Ok(Self::default()),
    }
  }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let v = Value::deserialize(deserializer)?;
  Ok(match v {
    Value::String(s) => Some(s),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  let v = Value::deserialize(deserializer)?;
  let n = match v {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  };
  Ok(n.filter(|n| n.is_finite()))
}

fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<RateEntry>, D::Error>
where
  D: Deserializer<'de>,
{
  let v = Value::deserialize(deserializer)?;
  let Value::Array(items) = v else {
    return Ok(Vec::new());
  };

  Ok(
    items
      .into_iter()
      .map(|item| match item {
        Value::Object(_) => serde_json::from_value(item).unwrap_or_default(),
        _ => RateEntry::default(),
      })
      .collect(),
  )
}
