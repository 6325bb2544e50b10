//! Error type for `watertemp-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("date {0} is outside the storable range (years 0000-9999)")]
  DateRange(chrono::DateTime<chrono::Utc>),

  #[error("measurement not found: {0}")]
  NotFound(i64),

  #[error("measurement {0} is already persisted")]
  AlreadyPersisted(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for watertemp_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::NotFound(id) => Self::NotFound(id),
      Error::AlreadyPersisted(id) => Self::AlreadyPersisted(id),
      other => Self::storage(other),
    }
  }
}
