//! Argument parsers for temperatures and dates.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// A finite temperature in °C. An optional trailing `C` or `°C` is accepted.
pub fn parse_celsius(s: &str) -> Result<f64, String> {
  let trimmed = s.trim();
  let number = trimmed
    .strip_suffix("°C")
    .or_else(|| trimmed.strip_suffix('C'))
    .unwrap_or(trimmed)
    .trim();
  let value: f64 = number
    .parse()
    .map_err(|_| format!("not a temperature: {s:?}"))?;
  if !value.is_finite() {
    return Err(format!("temperature must be finite: {s:?}"));
  }
  Ok(value)
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date taken as midnight UTC.
/// The year must have four digits.
pub fn parse_when(s: &str) -> Result<DateTime<Utc>, String> {
  let s = s.trim();
  let at = match DateTime::parse_from_rfc3339(s) {
    Ok(dt) => dt.with_timezone(&Utc),
    Err(_) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
      .ok()
      .and_then(|d| d.and_hms_opt(0, 0, 0))
      .map(|naive| naive.and_utc())
      .ok_or_else(|| format!("expected YYYY-MM-DD or an RFC 3339 timestamp, got {s:?}"))?,
  };
  if !(1..=9999).contains(&at.year()) {
    return Err(format!("year must be between 1 and 9999, got {}", at.year()));
  }
  Ok(at)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn celsius_forms() {
    assert_eq!(parse_celsius("21.5"), Ok(21.5));
    assert_eq!(parse_celsius("21.5C"), Ok(21.5));
    assert_eq!(parse_celsius(" -1 °C "), Ok(-1.0));
    assert!(parse_celsius("warm").is_err());
    assert!(parse_celsius("NaN").is_err());
    assert!(parse_celsius("inf").is_err());
  }

  #[test]
  fn dates_and_timestamps() {
    assert_eq!(
      parse_when("2024-01-02"),
      Ok(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
    );
    assert_eq!(
      parse_when("2024-01-02T08:30:00+01:00"),
      Ok(Utc.with_ymd_and_hms(2024, 1, 2, 7, 30, 0).unwrap())
    );
    assert!(parse_when("02/01/2024").is_err());
  }

  #[test]
  fn years_beyond_four_digits_are_rejected() {
    assert!(parse_when("+10000-01-01").is_err());
    assert!(parse_when("9999-12-31").is_ok());
  }
}
