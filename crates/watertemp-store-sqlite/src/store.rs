//! [`SqliteStore`]: the SQLite implementation of [`MeasurementStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tracing::debug;
use watertemp_core::{Measurement, store::MeasurementStore};

use crate::{
  Error, Result,
  encode::{RawMeasurement, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A measurement store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  ///
  /// Idempotent: opening an existing file leaves its rows untouched. Missing
  /// parent directories are created.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent).await?;
    }

    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    debug!(path = %path.display(), "opened measurement store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── MeasurementStore impl ───────────────────────────────────────────────────

impl MeasurementStore for SqliteStore {
  type Error = Error;

  async fn insert(&self, record: Measurement) -> Result<i64> {
    if record.is_persisted() {
      return Err(Error::AlreadyPersisted(record.id));
    }

    let temperature = record.temperature;
    let date_str = record.taken_at.map(encode_dt).transpose()?;

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO measurements (Temperature, MeasurementDate) VALUES (?1, ?2)",
          rusqlite::params![temperature, date_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(id)
  }

  async fn update(&self, record: Measurement) -> Result<()> {
    let id = record.id;
    let temperature = record.temperature;
    let date_str = record.taken_at.map(encode_dt).transpose()?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE measurements SET Temperature = ?1, MeasurementDate = ?2 WHERE Id = ?3",
          rusqlite::params![temperature, date_str, id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound(id));
    }
    Ok(())
  }

  async fn delete(&self, id: i64) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM measurements WHERE Id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound(id));
    }
    Ok(())
  }

  async fn get(&self, id: i64) -> Result<Option<Measurement>> {
    let raw: Option<RawMeasurement> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM measurements WHERE Id = ?1",
              RawMeasurement::COLUMNS
            ),
            rusqlite::params![id],
            RawMeasurement::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawMeasurement::into_measurement).transpose()
  }

  async fn list_all(&self) -> Result<Vec<Measurement>> {
    let raws: Vec<RawMeasurement> = self
      .conn
      .call(|conn| {
        // Undated rows last, then newest first; id breaks ties.
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM measurements
           ORDER BY MeasurementDate IS NULL, MeasurementDate DESC, Id DESC",
          RawMeasurement::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawMeasurement::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMeasurement::into_measurement).collect()
  }
}
