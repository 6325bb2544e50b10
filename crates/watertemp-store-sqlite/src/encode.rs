//! Encoding and decoding helpers between [`Measurement`] and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings in UTC with a fixed microsecond
//! precision, so that lexical order in SQL equals chronological order. That
//! only holds for four-digit years, so others are rejected on write.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use watertemp_core::Measurement;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> Result<String> {
  if !(0..=9999).contains(&dt.year()) {
    return Err(Error::DateRange(dt));
  }
  Ok(dt.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Column values read directly from a `measurements` row.
pub struct RawMeasurement {
  pub id:               i64,
  pub temperature:      Option<f64>,
  pub measurement_date: Option<String>,
}

impl RawMeasurement {
  pub const COLUMNS: &'static str = "Id, Temperature, MeasurementDate";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      temperature:      row.get(1)?,
      measurement_date: row.get(2)?,
    })
  }

  pub fn into_measurement(self) -> Result<Measurement> {
    let taken_at = self
      .measurement_date
      .as_deref()
      .map(decode_dt)
      .transpose()?;

    Ok(Measurement {
      id: self.id,
      temperature: self.temperature,
      taken_at,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_dates_sort_lexically() {
    let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let later = earlier + chrono::Duration::milliseconds(500);

    let a = encode_dt(earlier).unwrap();
    let b = encode_dt(later).unwrap();
    assert_eq!(a, "2024-01-01T09:00:00.000000Z");
    assert_eq!(a.len(), b.len());
    assert!(a < b);
  }

  #[test]
  fn five_digit_years_are_rejected() {
    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    assert!(matches!(encode_dt(far), Err(Error::DateRange(_))));

    let first = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
    let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
    assert_eq!(encode_dt(first).unwrap().len(), encode_dt(last).unwrap().len());
  }

  #[test]
  fn decode_accepts_offsets() {
    let dt = decode_dt("2024-01-02T02:00:00+02:00").unwrap();
    assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
  }

  #[test]
  fn decode_rejects_garbage() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
