//! The `MeasurementStore` trait: durable keyed storage for completed
//! measurements.
//!
//! The trait is implemented by storage backends (e.g. `watertemp-store-sqlite`).
//! Higher layers reach it through
//! [`MeasurementRepository`](crate::MeasurementRepository), never directly.

use std::future::Future;

use crate::measurement::Measurement;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a measurement storage backend.
///
/// Callers must not issue overlapping operations for the same id on one
/// handle; the repository and sync layers serialise writes.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait MeasurementStore: Send + Sync {
  /// Backend error. Must classify into the shared taxonomy so that a missing
  /// row stays distinguishable from an I/O failure.
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// Persist a new record and return its store-assigned id.
  ///
  /// Never returns [`DRAFT_ID`](crate::DRAFT_ID). Fails if `record.id` is
  /// already non-zero.
  fn insert(
    &self,
    record: Measurement,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Overwrite both fields of the row with `record.id`. Fails with a
  /// not-found error if no such row exists.
  fn update(
    &self,
    record: Measurement,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove the row with `id`. Fails with a not-found error if absent.
  fn delete(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a single row. Returns `None` if not found.
  fn get(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Measurement>, Self::Error>> + Send + '_;

  /// All rows, newest first. Rows without a date sort last; ties are broken
  /// by descending id.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<Measurement>, Self::Error>> + Send + '_;
}
