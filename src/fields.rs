//! Lenient readers for JSON handed to us by other programs (extractor
//! output, scanned QR text).

use serde_json::{Map, Value};

/// Trimmed non-empty string; numbers are accepted as their text.
pub(crate) fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
  match object.get(key)? {
    Value::String(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
    Value::Number(value) => Some(value.to_string()),
    _ => None,
  }
}

/// Finite number, also from a numeric string with grouping commas.
pub(crate) fn number(object: &Map<String, Value>, key: &str) -> Option<f64> {
  let parsed = match object.get(key)? {
    Value::Number(value) => value.as_f64(),
    Value::String(value) => value.trim().replace(',', "").parse::<f64>().ok(),
    _ => None,
  };
  parsed.filter(|value| value.is_finite())
}

/// Whole calendar year in 1..=9999.
pub(crate) fn year(object: &Map<String, Value>, key: &str) -> Option<i32> {
  number(object, key)
    .filter(|year| year.fract() == 0.0 && (1.0..=9999.0).contains(year))
    .map(|year| year as i32)
}
