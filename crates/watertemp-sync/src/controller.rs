//! [`SyncController`] routes mutations through the repository and then
//! reconciles the [`MeasurementSet`] and [`ChartProjection`].
//!
//! Every operation either commits a complete local update or leaves local
//! state exactly as it found it. Local state is only touched after the
//! repository call it depends on has returned.
//!
//! Store-backed operations come in three phases: a synchronous plan that
//! validates and produces a [`Write`], the repository call itself
//! ([`Write::execute`]), and a synchronous settle that applies the result.
//! The async methods here chain the phases; [`SyncHandle`](crate::SyncHandle)
//! runs the middle phase off its command loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use watertemp_core::{
  DRAFT_ID, Measurement, MeasurementRepository, MissingFields, store::MeasurementStore,
};

use crate::{
  Result, SyncError,
  chart::ChartProjection,
  observer::{NoopObserver, StateObserver},
  set::{Entry, EntryKey, MeasurementSet},
};

// ─── Edits ───────────────────────────────────────────────────────────────────

/// A single field change made in the table view. `None` clears the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldEdit {
  Temperature(Option<f64>),
  TakenAt(Option<DateTime<Utc>>),
}

impl FieldEdit {
  pub fn apply(self, m: &mut Measurement) {
    match self {
      Self::Temperature(t) => m.temperature = t,
      Self::TakenAt(at) => m.taken_at = at,
    }
  }
}

/// What happened to an edited entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
  /// The entry is valid and was written to the store under this key.
  Saved(EntryKey),
  /// The entry is incomplete and was kept locally only. Persisted rows keep
  /// their last stored values until a later save.
  Held(MissingFields),
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOp {
  Insert,
  Update,
  Delete,
}

/// A repository call planned by the controller and not yet applied locally.
#[derive(Debug, Clone)]
pub(crate) struct Write {
  key:             EntryKey,
  record:          Measurement,
  op:              WriteOp,
  /// Keep `record` locally as an unsaved edit if the call fails.
  hold_on_failure: bool,
}

/// Successful result of [`Write::execute`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Written {
  Inserted(i64),
  Updated,
  Deleted,
}

impl Write {
  pub(crate) fn key(&self) -> EntryKey { self.key }

  pub(crate) async fn execute<S: MeasurementStore>(
    &self,
    repo: &MeasurementRepository<S>,
  ) -> watertemp_core::Result<Written> {
    match self.op {
      WriteOp::Insert => repo.save(&self.record).await.map(Written::Inserted),
      WriteOp::Update => repo.update(&self.record).await.map(|()| Written::Updated),
      WriteOp::Delete => repo.delete(&self.record).await.map(|()| Written::Deleted),
    }
  }
}

/// Either a finished local-only result or a write that still has to run.
pub(crate) enum Step<T> {
  Done(T),
  Pending(Write),
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// Owner of the local measurement state.
///
/// Mutation requires `&mut self`, so there is exactly one writer. Use
/// [`SyncHandle`](crate::SyncHandle) to share it across tasks.
pub struct SyncController<S, O = NoopObserver> {
  repo:     MeasurementRepository<S>,
  set:      MeasurementSet,
  chart:    ChartProjection,
  observer: O,
}

impl<S: MeasurementStore> SyncController<S> {
  pub fn new(repo: MeasurementRepository<S>) -> Self {
    Self {
      repo,
      set: MeasurementSet::new(),
      chart: ChartProjection::default(),
      observer: NoopObserver,
    }
  }
}

impl<S: MeasurementStore, O: StateObserver> SyncController<S, O> {
  /// Replace the observer notified after every operation.
  pub fn with_observer<P: StateObserver>(self, observer: P) -> SyncController<S, P> {
    SyncController {
      repo: self.repo,
      set: self.set,
      chart: self.chart,
      observer,
    }
  }

  pub(crate) fn repository(&self) -> &MeasurementRepository<S> { &self.repo }

  pub fn set(&self) -> &MeasurementSet { &self.set }

  pub fn chart(&self) -> &ChartProjection { &self.chart }

  pub fn get(&self, key: EntryKey) -> Option<&Measurement> { self.set.get(key) }

  /// The table view, in display order.
  pub fn measurements(&self) -> Vec<Entry> { self.set.snapshot() }

  /// Recompute the projection and notify the observer.
  fn publish(&mut self) {
    self.chart = ChartProjection::recompute(&self.set);
    let snapshot = self.set.snapshot();
    self.observer.on_state_changed(&snapshot, &self.chart);
  }

  // ── Load ──────────────────────────────────────────────────────────────────

  /// Reload every persisted row. Returns the number of rows loaded.
  ///
  /// Drafts and unsaved edits of rows that still exist are kept. On failure
  /// the set is left unchanged; the projection is still recomputed and
  /// published from it.
  pub async fn load(&mut self) -> Result<usize> {
    let rows = self.repo.get_all().await;
    self.settle_load(rows)
  }

  pub(crate) fn settle_load(
    &mut self,
    rows: watertemp_core::Result<Vec<Measurement>>,
  ) -> Result<usize> {
    match rows {
      Ok(records) => {
        let count = records.len();
        self.set.replace_all(records);
        self.publish();
        info!(count, drafts = self.set.draft_count(), "loaded measurements");
        Ok(count)
      }
      Err(err) => {
        warn!(error = %err, "failed to load measurements; keeping current state");
        self.publish();
        Err(err.into())
      }
    }
  }

  /// Reload after the store disagreed with local state.
  async fn resync(&mut self) {
    if let Err(err) = self.load().await {
      warn!(error = %err, "resync after missing row failed");
    }
  }

  // ── Drafts ────────────────────────────────────────────────────────────────

  /// Start a new, blank entry. Never touches the store.
  pub fn add_draft(&mut self) -> EntryKey {
    let key = self.set.add_draft();
    debug!(%key, "added draft");
    self.publish();
    key
  }

  // ── Save / update ─────────────────────────────────────────────────────────

  /// Persist `record` as the new content of the entry at `key` and return
  /// the entry's key afterwards (`Stored(id)` once saved).
  ///
  /// Incomplete records are rejected with [`SyncError::Validation`] before
  /// the store is consulted; the entry stays as it was. On a storage failure
  /// the entry is likewise left untouched.
  pub async fn save_or_update(&mut self, key: EntryKey, record: Measurement) -> Result<EntryKey> {
    let write = self.plan_save(key, record)?;
    self.run(write).await
  }

  pub(crate) fn plan_save(&self, key: EntryKey, mut record: Measurement) -> Result<Write> {
    if !self.set.contains(key) {
      return Err(SyncError::UnknownEntry(key));
    }
    if let Err(err) = record.validate() {
      debug!(%key, %err, "not saving incomplete measurement");
      return Err(err.into());
    }
    record.id = key.stored_id().unwrap_or(DRAFT_ID);
    let record = record.truncated_to_micros();
    let op = if key.is_draft() { WriteOp::Insert } else { WriteOp::Update };

    Ok(Write { key, record, op, hold_on_failure: false })
  }

  /// Apply field edits to the entry at `key`.
  ///
  /// A result that is valid goes through [`save_or_update`](Self::save_or_update).
  /// An incomplete result is kept locally as an unsaved edit; if it was a
  /// persisted row it drops out of the chart while its stored row stays as
  /// it was. If the save fails with a storage error the edit is still kept
  /// locally, so no typed-in value is lost.
  pub async fn edit(&mut self, key: EntryKey, edits: &[FieldEdit]) -> Result<EditOutcome> {
    match self.plan_edit(key, edits)? {
      Step::Done(outcome) => Ok(outcome),
      Step::Pending(write) => self.run(write).await.map(EditOutcome::Saved),
    }
  }

  pub(crate) fn plan_edit(
    &mut self,
    key: EntryKey,
    edits: &[FieldEdit],
  ) -> Result<Step<EditOutcome>> {
    let mut updated = self
      .set
      .get(key)
      .cloned()
      .ok_or(SyncError::UnknownEntry(key))?;
    for edit in edits {
      edit.apply(&mut updated);
    }

    let missing = updated.missing_fields();
    if !missing.is_empty() {
      self.set.hold(key, updated);
      debug!(%key, %missing, "holding incomplete measurement locally");
      self.publish();
      return Ok(Step::Done(EditOutcome::Held(missing)));
    }

    let mut write = self.plan_save(key, updated)?;
    write.hold_on_failure = true;
    Ok(Step::Pending(write))
  }

  // ── Delete ────────────────────────────────────────────────────────────────

  /// Remove the entry at `key`. Assumes the user already confirmed.
  ///
  /// Drafts are dropped locally without a store call. Persisted rows are
  /// deleted from the store first and only then removed locally.
  pub async fn delete(&mut self, key: EntryKey) -> Result<()> {
    match self.plan_delete(key)? {
      Step::Done(()) => Ok(()),
      Step::Pending(write) => self.run(write).await.map(|_| ()),
    }
  }

  pub(crate) fn plan_delete(&mut self, key: EntryKey) -> Result<Step<()>> {
    let record = self
      .set
      .get(key)
      .cloned()
      .ok_or(SyncError::UnknownEntry(key))?;

    if key.is_draft() {
      self.set.remove(key);
      debug!(%key, "dropped draft");
      self.publish();
      return Ok(Step::Done(()));
    }

    Ok(Step::Pending(Write { key, record, op: WriteOp::Delete, hold_on_failure: false }))
  }

  // ── Settle ────────────────────────────────────────────────────────────────

  async fn run(&mut self, write: Write) -> Result<EntryKey> {
    let result = write.execute(&self.repo).await;
    let settled = self.settle(write, result);
    if let Err(SyncError::NotFound(_)) = settled {
      self.resync().await;
    }
    settled
  }

  /// Apply the result of a repository call to local state.
  ///
  /// A `NotFound` result means local state is stale; the caller is expected
  /// to reload.
  pub(crate) fn settle(
    &mut self,
    write: Write,
    result: watertemp_core::Result<Written>,
  ) -> Result<EntryKey> {
    let Write { key, record, hold_on_failure, .. } = write;

    match result {
      Ok(Written::Inserted(id)) => {
        let stored = self.set.upsert(key, record.with_id(id));
        info!(id, %key, "saved new measurement");
        self.publish();
        Ok(stored)
      }
      Ok(Written::Updated) => {
        let stored = self.set.upsert(key, record);
        info!(%key, "updated measurement");
        self.publish();
        Ok(stored)
      }
      Ok(Written::Deleted) => {
        self.set.remove(key);
        info!(%key, "deleted measurement");
        self.publish();
        Ok(key)
      }
      Err(watertemp_core::Error::NotFound(id)) => {
        warn!(id, "measurement missing from store; reloading");
        Err(SyncError::NotFound(id))
      }
      Err(err) => {
        warn!(%key, error = %err, "store call failed");
        if hold_on_failure && self.set.contains(key) {
          self.set.hold(key, record);
          self.publish();
        }
        Err(err.into())
      }
    }
  }
}
