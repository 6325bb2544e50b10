//! In-memory measurement state and its synchronisation with storage.
//!
//! [`MeasurementSet`] is the authoritative list shown in the table, drafts
//! included. [`ChartProjection`] is derived from it after every mutation and
//! is the only thing the chart consumes. [`SyncController`] routes every
//! change through the repository first and only then touches local state.
//! [`SyncHandle`] confines the controller to a single task.

pub mod chart;
pub mod controller;
pub mod error;
pub mod handle;
pub mod observer;
pub mod set;

pub use chart::{ChartEntry, ChartPoint, ChartProjection, ChartStyle, ChartSummary};
pub use controller::{EditOutcome, FieldEdit, SyncController};
pub use error::{Result, SyncError};
pub use handle::{StateSnapshot, SyncHandle};
pub use observer::{NoopObserver, StateObserver};
pub use set::{DraftId, Entry, EntryKey, MeasurementSet};
