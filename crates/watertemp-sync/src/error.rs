//! Error type for `watertemp-sync`.

use thiserror::Error;
use watertemp_core::MissingFields;

use crate::set::EntryKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
  /// The record is incomplete; it stays in the set, editable.
  #[error("measurement is incomplete: missing {0}")]
  Validation(MissingFields),

  /// The store no longer holds the row. Local state has been reloaded.
  #[error("measurement not found: {0}")]
  NotFound(i64),

  /// I/O or driver failure. Local state is left as it was.
  #[error("storage error: {reason}")]
  Storage { reason: String },

  #[error("no such entry: {0}")]
  UnknownEntry(EntryKey),

  /// The task owning the controller has stopped.
  #[error("sync task is no longer running")]
  Closed,
}

impl From<watertemp_core::Error> for SyncError {
  fn from(err: watertemp_core::Error) -> Self {
    use watertemp_core::Error as E;
    match err {
      E::Validation(missing) => Self::Validation(missing),
      E::NotFound(id) => Self::NotFound(id),
      E::AlreadyPersisted(id) => Self::Storage {
        reason: format!("measurement {id} is already persisted"),
      },
      E::Storage { reason } => Self::Storage { reason },
    }
  }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
