use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

use crate::models::Month;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Lenient calendar date parsing for form, scan and QR input. Returns `None`
/// instead of failing; callers fall back to other period sources.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return None;
  }
  for format in DATE_FORMATS {
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
      return Some(date);
    }
  }
  DateTime::parse_from_rfc3339(trimmed)
    .ok()
    .map(|value| value.date_naive())
}

pub fn period_of(date: NaiveDate) -> (Month, i32) {
  // month() is always 1..=12
  let month = Month::from_number(date.month()).unwrap_or(Month::January);
  (month, date.year())
}

pub fn current_period<Tz: TimeZone>(now: &DateTime<Tz>) -> (Month, i32) {
  period_of(now.date_naive())
}
