//! SQL schema for the measurement store.
//!
//! Executed at every connection startup; `PRAGMA user_version` records the
//! layout so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `AUTOINCREMENT` keeps ids monotonic and prevents reuse after a delete.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS measurements (
    Id              INTEGER PRIMARY KEY AUTOINCREMENT,
    Temperature     REAL,            -- degrees Celsius, NULL while unknown
    MeasurementDate TEXT             -- fixed-width RFC 3339 UTC, NULL while unknown
);

CREATE INDEX IF NOT EXISTS measurements_date_idx ON measurements(MeasurementDate);

PRAGMA user_version = 1;
";
