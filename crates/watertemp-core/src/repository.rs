//! [`MeasurementRepository`]: typed CRUD façade over a [`MeasurementStore`].
//!
//! The repository persists whatever it is given. Deciding whether a record is
//! ready to be written is the caller's job.

use std::sync::Arc;

use tracing::debug;

use crate::{Error, Measurement, Result, store::MeasurementStore};

/// Typed wrapper around a storage backend.
///
/// Cloning is cheap; the backend is reference-counted.
pub struct MeasurementRepository<S> {
  store: Arc<S>,
}

impl<S> Clone for MeasurementRepository<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: MeasurementStore> MeasurementRepository<S> {
  pub fn new(store: S) -> Self { Self { store: Arc::new(store) } }

  pub fn from_shared(store: Arc<S>) -> Self { Self { store } }

  /// Insert `m` and return the id assigned by the store.
  pub async fn save(&self, m: &Measurement) -> Result<i64> {
    let id = self.store.insert(m.clone()).await.map_err(classify)?;
    debug!(id, "inserted measurement");
    Ok(id)
  }

  pub async fn update(&self, m: &Measurement) -> Result<()> {
    self.store.update(m.clone()).await.map_err(classify)?;
    debug!(id = m.id, "updated measurement");
    Ok(())
  }

  pub async fn delete(&self, m: &Measurement) -> Result<()> {
    self.store.delete(m.id).await.map_err(classify)?;
    debug!(id = m.id, "deleted measurement");
    Ok(())
  }

  /// Every stored measurement, newest first.
  pub async fn get_all(&self) -> Result<Vec<Measurement>> {
    self.store.list_all().await.map_err(classify)
  }
}

/// Backend failures keep their classification; only the type changes.
fn classify<E: Into<Error>>(err: E) -> Error { err.into() }
