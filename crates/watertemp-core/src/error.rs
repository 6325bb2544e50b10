//! Error types for `watertemp-core`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The shared failure taxonomy for measurement persistence.
///
/// Backends convert their own error types into this one so that callers can
/// tell a missing row apart from an I/O failure regardless of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// The record is not yet eligible for persistence.
  #[error("measurement is incomplete: missing {0}")]
  Validation(MissingFields),

  /// An update or delete targeted an id the store does not hold.
  #[error("measurement not found: {0}")]
  NotFound(i64),

  /// An insert was attempted with a record that already carries an id.
  #[error("measurement {0} is already persisted")]
  AlreadyPersisted(i64),

  /// I/O or driver failure.
  #[error("storage error: {reason}")]
  Storage { reason: String },
}

impl Error {
  pub fn storage(reason: impl fmt::Display) -> Self {
    Self::Storage { reason: reason.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── MissingFields ───────────────────────────────────────────────────────────

/// Which of the two measurement fields are still absent.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct MissingFields {
  pub temperature: bool,
  pub taken_at:    bool,
}

impl MissingFields {
  pub fn is_empty(&self) -> bool { !self.temperature && !self.taken_at }
}

impl fmt::Display for MissingFields {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.temperature, self.taken_at) {
      (true, true) => f.write_str("temperature and date"),
      (true, false) => f.write_str("temperature"),
      (false, true) => f.write_str("date"),
      (false, false) => f.write_str("nothing"),
    }
  }
}
