//! [`MeasurementSet`]: every measurement the UI currently knows about.
//!
//! Persisted rows are keyed by their store id. Drafts (id 0) get a
//! session-local [`DraftId`] so several can coexist and each can still be
//! addressed for editing or deletion.
//!
//! A persisted entry can carry local edits the store has not seen yet (for
//! example a cleared date). Such entries are marked unsaved and survive
//! [`MeasurementSet::replace_all`] until they are saved or deleted.

use std::{
  cmp::{Ordering, Reverse},
  collections::HashMap,
  fmt,
};

use serde::{Deserialize, Serialize};
use watertemp_core::{DRAFT_ID, Measurement};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Session-local handle for a draft. Never persisted, never reused within a
/// set.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DraftId(u64);

/// Address of an entry in a [`MeasurementSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntryKey {
  Draft(DraftId),
  Stored(i64),
}

impl EntryKey {
  /// The store id, if this entry has been persisted.
  pub fn stored_id(self) -> Option<i64> {
    match self {
      Self::Stored(id) => Some(id),
      Self::Draft(_) => None,
    }
  }

  pub fn is_draft(self) -> bool { matches!(self, Self::Draft(_)) }

  /// Deterministic tie-breaker: stored rows before drafts, higher ids first.
  fn rank(self) -> (u8, Reverse<i64>, Reverse<u64>) {
    match self {
      Self::Stored(id) => (0, Reverse(id), Reverse(0)),
      Self::Draft(DraftId(n)) => (1, Reverse(0), Reverse(n)),
    }
  }
}

impl fmt::Display for EntryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Draft(DraftId(n)) => write!(f, "draft #{n}"),
      Self::Stored(id) => write!(f, "#{id}"),
    }
  }
}

/// One row of the table view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
  pub key:         EntryKey,
  pub measurement: Measurement,
  /// Local edits not yet written to the store.
  pub unsaved:     bool,
}

// ─── Set ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Slot {
  measurement: Measurement,
  /// Logical clock value of the last insert or edit; 0 for loaded rows.
  edited:      u64,
  dirty:       bool,
}

/// Keyed collection with a stable display order.
///
/// Invariant: an entry has key `Stored(id)` iff its measurement carries that
/// same positive id; every other entry is a draft with id 0.
#[derive(Debug, Clone, Default)]
pub struct MeasurementSet {
  slots:      HashMap<EntryKey, Slot>,
  next_draft: u64,
  clock:      u64,
}

impl MeasurementSet {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize { self.slots.len() }

  pub fn is_empty(&self) -> bool { self.slots.is_empty() }

  pub fn contains(&self, key: EntryKey) -> bool { self.slots.contains_key(&key) }

  pub fn get(&self, key: EntryKey) -> Option<&Measurement> {
    self.slots.get(&key).map(|slot| &slot.measurement)
  }

  /// Whether the entry at `key` holds edits the store has not seen.
  pub fn is_unsaved(&self, key: EntryKey) -> bool {
    self.slots.get(&key).is_some_and(|slot| slot.dirty)
  }

  /// Number of entries that have never been persisted.
  pub fn draft_count(&self) -> usize {
    self.slots.keys().filter(|k| k.is_draft()).count()
  }

  /// Unordered iteration over every measurement.
  pub fn iter(&self) -> impl Iterator<Item = &Measurement> + '_ {
    self.slots.values().map(|slot| &slot.measurement)
  }

  /// Append a blank draft and return its key.
  pub fn add_draft(&mut self) -> EntryKey {
    let key = self.allocate_draft();
    let edited = self.tick();
    let slot = Slot { measurement: Measurement::draft(), edited, dirty: true };
    self.slots.insert(key, slot);
    key
  }

  /// Replace every persisted entry with `records`.
  ///
  /// Drafts are kept. Persisted entries with unsaved edits are kept as well,
  /// unless their row is missing from `records`.
  pub fn replace_all(&mut self, records: impl IntoIterator<Item = Measurement>) {
    let mut held: HashMap<EntryKey, Slot> = self
      .slots
      .drain()
      .filter(|(key, slot)| key.is_draft() || slot.dirty)
      .collect();

    for record in records {
      let key = if record.is_persisted() {
        EntryKey::Stored(record.id)
      } else {
        self.allocate_draft()
      };
      let slot = match held.remove(&key) {
        Some(local) => local,
        None => Slot { measurement: record, edited: 0, dirty: false },
      };
      self.slots.insert(key, slot);
    }

    self.slots.extend(held.into_iter().filter(|(key, _)| key.is_draft()));
  }

  /// Insert or overwrite the entry at `key` with a value the store agrees
  /// with, and return its (possibly new) key. A draft that now carries a
  /// store id moves to `Stored(id)`.
  pub fn upsert(&mut self, key: EntryKey, measurement: Measurement) -> EntryKey {
    self.put(key, measurement, false)
  }

  /// Like [`upsert`](Self::upsert), but the value exists only locally.
  pub fn hold(&mut self, key: EntryKey, measurement: Measurement) -> EntryKey {
    self.put(key, measurement, true)
  }

  fn put(&mut self, key: EntryKey, mut measurement: Measurement, dirty: bool) -> EntryKey {
    let target = match (key, measurement.is_persisted()) {
      (_, true) => EntryKey::Stored(measurement.id),
      (EntryKey::Draft(_), false) => key,
      (EntryKey::Stored(_), false) => self.allocate_draft(),
    };
    if !measurement.is_persisted() {
      measurement.id = DRAFT_ID;
    }
    if target != key {
      self.slots.remove(&key);
    }

    let edited = self.tick();
    let dirty = dirty || target.is_draft();
    self.slots.insert(target, Slot { measurement, edited, dirty });
    target
  }

  pub fn remove(&mut self, key: EntryKey) -> Option<Measurement> {
    self.slots.remove(&key).map(|slot| slot.measurement)
  }

  /// Every entry in display order: newest timestamp first, undated entries
  /// last, ties broken by most recent edit and then by key.
  pub fn snapshot(&self) -> Vec<Entry> {
    let mut slots: Vec<(&EntryKey, &Slot)> = self.slots.iter().collect();
    slots.sort_by(|(ka, a), (kb, b)| display_order(ka, a, kb, b));
    slots
      .into_iter()
      .map(|(key, slot)| Entry {
        key:         *key,
        measurement: slot.measurement.clone(),
        unsaved:     slot.dirty,
      })
      .collect()
  }

  fn allocate_draft(&mut self) -> EntryKey {
    self.next_draft += 1;
    EntryKey::Draft(DraftId(self.next_draft))
  }

  fn tick(&mut self) -> u64 {
    self.clock += 1;
    self.clock
  }
}

fn display_order(ka: &EntryKey, a: &Slot, kb: &EntryKey, b: &Slot) -> Ordering {
  let by_date = match (a.measurement.taken_at, b.measurement.taken_at) {
    (Some(x), Some(y)) => y.cmp(&x),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  };
  by_date
    .then_with(|| b.edited.cmp(&a.edited))
    .then_with(|| ka.rank().cmp(&kb.rank()))
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, TimeZone, Utc};

  use super::*;

  fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
  }

  fn stored(id: i64, temp: f64, day: u32) -> Measurement {
    Measurement::new(temp, jan(day)).with_id(id)
  }

  fn keys(set: &MeasurementSet) -> Vec<EntryKey> {
    set.snapshot().into_iter().map(|e| e.key).collect()
  }

  #[test]
  fn snapshot_orders_newest_first() {
    let mut set = MeasurementSet::new();
    set.replace_all([stored(1, 20.0, 1), stored(2, 21.0, 3), stored(3, 19.0, 2)]);

    assert_eq!(
      keys(&set),
      vec![EntryKey::Stored(2), EntryKey::Stored(3), EntryKey::Stored(1)]
    );
  }

  #[test]
  fn undated_drafts_sort_last_most_recent_first() {
    let mut set = MeasurementSet::new();
    set.replace_all([stored(1, 20.0, 1)]);
    let first = set.add_draft();
    let second = set.add_draft();

    assert_eq!(keys(&set), vec![EntryKey::Stored(1), second, first]);

    // Editing the older draft moves it ahead of the newer one.
    let edited = Measurement { temperature: Some(5.0), ..Measurement::draft() };
    set.upsert(first, edited);
    assert_eq!(keys(&set), vec![EntryKey::Stored(1), first, second]);
  }

  #[test]
  fn dated_draft_interleaves_by_timestamp() {
    let mut set = MeasurementSet::new();
    set.replace_all([stored(1, 20.0, 1), stored(2, 21.0, 3)]);
    let draft = set.add_draft();
    set.upsert(draft, Measurement { taken_at: Some(jan(2)), ..Measurement::draft() });

    assert_eq!(
      keys(&set),
      vec![EntryKey::Stored(2), draft, EntryKey::Stored(1)]
    );
  }

  #[test]
  fn replace_all_preserves_drafts() {
    let mut set = MeasurementSet::new();
    set.replace_all([stored(1, 20.0, 1)]);
    let draft = set.add_draft();
    set.upsert(draft, Measurement { temperature: Some(3.0), ..Measurement::draft() });

    set.replace_all([stored(2, 22.0, 2)]);

    assert_eq!(set.len(), 2);
    assert!(!set.contains(EntryKey::Stored(1)));
    assert!(set.contains(EntryKey::Stored(2)));
    assert_eq!(set.get(draft).unwrap().temperature, Some(3.0));
  }

  #[test]
  fn replace_all_keeps_unsaved_edits_of_stored_rows() {
    let mut set = MeasurementSet::new();
    set.replace_all([stored(1, 20.0, 1), stored(2, 21.0, 2)]);
    let cleared = Measurement { taken_at: None, ..stored(1, 20.0, 1) };
    set.hold(EntryKey::Stored(1), cleared.clone());
    assert!(set.is_unsaved(EntryKey::Stored(1)));

    set.replace_all([stored(1, 20.0, 1), stored(2, 23.0, 2)]);

    assert_eq!(set.get(EntryKey::Stored(1)), Some(&cleared));
    assert!(set.is_unsaved(EntryKey::Stored(1)));
    assert_eq!(set.get(EntryKey::Stored(2)).unwrap().temperature, Some(23.0));
    assert!(!set.is_unsaved(EntryKey::Stored(2)));
  }

  #[test]
  fn replace_all_drops_unsaved_edit_of_vanished_row() {
    let mut set = MeasurementSet::new();
    set.replace_all([stored(1, 20.0, 1)]);
    set.hold(EntryKey::Stored(1), Measurement { taken_at: None, ..stored(1, 20.0, 1) });

    set.replace_all([stored(2, 21.0, 2)]);

    assert!(!set.contains(EntryKey::Stored(1)));
    assert_eq!(set.len(), 1);
  }

  #[test]
  fn saving_clears_unsaved_mark() {
    let mut set = MeasurementSet::new();
    set.replace_all([stored(1, 20.0, 1)]);
    set.hold(EntryKey::Stored(1), Measurement { taken_at: None, ..stored(1, 20.0, 1) });

    set.upsert(EntryKey::Stored(1), stored(1, 20.0, 4));

    assert!(!set.is_unsaved(EntryKey::Stored(1)));
    assert!(!set.snapshot()[0].unsaved);
  }

  #[test]
  fn upsert_promotes_draft_to_stored_key() {
    let mut set = MeasurementSet::new();
    let draft = set.add_draft();

    let key = set.upsert(draft, stored(9, 21.5, 1));

    assert_eq!(key, EntryKey::Stored(9));
    assert!(!set.contains(draft));
    assert_eq!(set.len(), 1);
    assert_eq!(set.draft_count(), 0);
  }

  #[test]
  fn stored_keys_stay_unique() {
    let mut set = MeasurementSet::new();
    set.replace_all([stored(1, 20.0, 1)]);
    set.upsert(EntryKey::Stored(1), stored(1, 25.0, 1));

    assert_eq!(set.len(), 1);
    assert_eq!(set.get(EntryKey::Stored(1)).unwrap().temperature, Some(25.0));
  }

  #[test]
  fn remove_returns_measurement() {
    let mut set = MeasurementSet::new();
    let draft = set.add_draft();
    assert_eq!(set.remove(draft), Some(Measurement::draft()));
    assert!(set.remove(draft).is_none());
    assert!(set.is_empty());
  }

  #[test]
  fn draft_ids_are_not_reused() {
    let mut set = MeasurementSet::new();
    let a = set.add_draft();
    set.remove(a);
    let b = set.add_draft();
    assert_ne!(a, b);
  }
}
