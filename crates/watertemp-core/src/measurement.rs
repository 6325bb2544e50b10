//! A single timestamped water temperature reading.
//!
//! Both fields are optional so that a reading can exist while the user is
//! still typing it in. Only a measurement with both fields present is
//! persisted or charted.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, MissingFields, Result};

/// Identity of a measurement that has never been written to the store.
pub const DRAFT_ID: i64 = 0;

/// A water temperature reading in degrees Celsius.
///
/// `id == DRAFT_ID` means the record has never been durably written. Any
/// positive id was assigned by the store on first insert and is never reused.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
  pub id:          i64,
  pub temperature: Option<f64>,
  pub taken_at:    Option<DateTime<Utc>>,
}

impl Measurement {
  /// A fresh draft: identity 0, both fields absent.
  pub fn draft() -> Self { Self::default() }

  /// An unpersisted measurement with both fields filled in.
  pub fn new(temperature: f64, taken_at: DateTime<Utc>) -> Self {
    Self {
      id:          DRAFT_ID,
      temperature: Some(temperature),
      taken_at:    Some(taken_at),
    }
  }

  pub fn with_id(mut self, id: i64) -> Self {
    self.id = id;
    self
  }

  /// Drop sub-microsecond digits from `taken_at`, the finest precision the
  /// store keeps.
  pub fn truncated_to_micros(mut self) -> Self {
    self.taken_at = self.taken_at.map(|at| at.trunc_subsecs(6));
    self
  }

  pub fn is_draft(&self) -> bool { self.id == DRAFT_ID }

  pub fn is_persisted(&self) -> bool { self.id > DRAFT_ID }

  /// Both fields present. This is the only predicate gating persistence and
  /// chart membership.
  pub fn is_valid(&self) -> bool {
    self.temperature.is_some() && self.taken_at.is_some()
  }

  pub fn missing_fields(&self) -> MissingFields {
    MissingFields {
      temperature: self.temperature.is_none(),
      taken_at:    self.taken_at.is_none(),
    }
  }

  /// `Ok(())` if valid, otherwise [`Error::Validation`] naming what is absent.
  pub fn validate(&self) -> Result<()> {
    let missing = self.missing_fields();
    if missing.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(missing))
    }
  }

  /// The `(timestamp, temperature)` pair, if valid.
  pub fn reading(&self) -> Option<(DateTime<Utc>, f64)> {
    Some((self.taken_at?, self.temperature?))
  }
}
