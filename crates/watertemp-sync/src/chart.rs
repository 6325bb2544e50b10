//! [`ChartProjection`]: the validity-filtered, time-ascending view of a
//! [`MeasurementSet`], and the entries handed to the chart renderer.
//!
//! The projection is a materialised view: it is rebuilt from the set after
//! every mutation and never edited directly.

use std::fmt::Write as _;

use chrono::{
  DateTime, Utc,
  format::{Item, StrftimeItems},
};
use serde::{Deserialize, Serialize};

use crate::set::MeasurementSet;

/// Label and value label of the placeholder shown when nothing is chartable.
pub const NO_DATA_LABEL: &str = "No data";

// ─── Points ──────────────────────────────────────────────────────────────────

/// One chartable reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
  pub taken_at:    DateTime<Utc>,
  pub temperature: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartProjection {
  points: Vec<ChartPoint>,
}

impl ChartProjection {
  /// Every valid measurement in `set`, oldest first.
  pub fn recompute(set: &MeasurementSet) -> Self {
    let mut points: Vec<ChartPoint> = set
      .iter()
      .filter_map(|m| m.reading())
      .map(|(taken_at, temperature)| ChartPoint { taken_at, temperature })
      .collect();

    points.sort_by(|a, b| {
      a.taken_at
        .cmp(&b.taken_at)
        .then_with(|| a.temperature.total_cmp(&b.temperature))
    });

    Self { points }
  }

  pub fn points(&self) -> &[ChartPoint] { &self.points }

  pub fn len(&self) -> usize { self.points.len() }

  pub fn is_empty(&self) -> bool { self.points.is_empty() }

  /// Entries for the rendering sink. Never empty: with no points a single
  /// "No data" placeholder at 0 is returned.
  pub fn entries(&self, style: &ChartStyle) -> Vec<ChartEntry> {
    if self.points.is_empty() {
      return vec![ChartEntry {
        label:       NO_DATA_LABEL.to_owned(),
        value:       0.0,
        value_label: NO_DATA_LABEL.to_owned(),
        color_hint:  style.color_hint.clone(),
      }];
    }

    self
      .points
      .iter()
      .map(|p| ChartEntry {
        label:       style.label(p.taken_at),
        value:       p.temperature,
        value_label: format!("{:.1}°C", p.temperature),
        color_hint:  style.color_hint.clone(),
      })
      .collect()
  }

  /// Min / max / mean / latest over the projected points.
  pub fn summary(&self) -> Option<ChartSummary> {
    let latest = *self.points.last()?;
    let count = self.points.len();
    let (min, max, sum) = self.points.iter().fold(
      (f64::INFINITY, f64::NEG_INFINITY, 0.0),
      |(min, max, sum), p| {
        (min.min(p.temperature), max.max(p.temperature), sum + p.temperature)
      },
    );

    Some(ChartSummary { count, min, max, mean: sum / count as f64, latest })
  }
}

// ─── Rendering sink ──────────────────────────────────────────────────────────

/// One point as consumed by the chart renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartEntry {
  pub label:       String,
  pub value:       f64,
  pub value_label: String,
  pub color_hint:  String,
}

/// Presentation knobs for [`ChartProjection::entries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
  /// Colour the renderer should use for the series.
  pub color_hint:   String,
  /// `chrono` format string for point labels.
  pub label_format: String,
}

impl ChartStyle {
  /// Whether `label_format` parses as a `chrono` format string.
  pub fn has_valid_label_format(&self) -> bool {
    StrftimeItems::new(&self.label_format).all(|item| !matches!(item, Item::Error))
  }

  /// Format `at` as a point label. Falls back to `YYYY-MM-DD` if the
  /// configured format cannot be rendered.
  pub fn label(&self, at: DateTime<Utc>) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(&self.label_format)).is_err() {
      return at.format("%Y-%m-%d").to_string();
    }
    out
  }
}

impl Default for ChartStyle {
  fn default() -> Self {
    Self {
      color_hint:   "#2196F3".to_owned(),
      label_format: "%Y-%m-%d".to_owned(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartSummary {
  pub count:  usize,
  pub min:    f64,
  pub max:    f64,
  pub mean:   f64,
  pub latest: ChartPoint,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use watertemp_core::Measurement;

  use super::*;

  fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
  }

  fn set_of(records: Vec<Measurement>) -> MeasurementSet {
    let mut set = MeasurementSet::new();
    set.replace_all(records);
    set
  }

  #[test]
  fn empty_set_renders_placeholder() {
    let chart = ChartProjection::recompute(&MeasurementSet::new());
    assert!(chart.is_empty());

    let entries = chart.entries(&ChartStyle::default());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].label, "No data");
    assert_eq!(entries[0].value, 0.0);
    assert_eq!(entries[0].color_hint, "#2196F3");
    assert!(chart.summary().is_none());
  }

  #[test]
  fn only_valid_entries_ascending() {
    let mut set = set_of(vec![
      Measurement::new(22.0, jan(2)).with_id(2),
      Measurement::new(21.5, jan(1)).with_id(1),
      Measurement { id: 3, temperature: Some(30.0), taken_at: None },
    ]);
    let draft = set.add_draft();
    set.upsert(draft, Measurement { taken_at: Some(jan(5)), ..Measurement::draft() });

    let chart = ChartProjection::recompute(&set);
    assert_eq!(
      chart.points(),
      &[
        ChartPoint { taken_at: jan(1), temperature: 21.5 },
        ChartPoint { taken_at: jan(2), temperature: 22.0 },
      ]
    );
    assert!(chart.len() < set.len());
  }

  #[test]
  fn projection_size_matches_set_when_all_valid() {
    let set = set_of(vec![
      Measurement::new(10.0, jan(3)).with_id(1),
      Measurement::new(11.0, jan(1)).with_id(2),
      Measurement::new(12.0, jan(2)).with_id(3),
    ]);
    let chart = ChartProjection::recompute(&set);

    assert_eq!(chart.len(), set.len());
    assert!(chart.points().windows(2).all(|w| w[0].taken_at <= w[1].taken_at));
  }

  #[test]
  fn entries_use_style_and_units() {
    let set = set_of(vec![Measurement::new(21.54, jan(1)).with_id(1)]);
    let style = ChartStyle {
      color_hint:   "#FF0000".into(),
      label_format: "%d/%m".into(),
    };

    let entries = ChartProjection::recompute(&set).entries(&style);
    assert_eq!(
      entries,
      vec![ChartEntry {
        label:       "01/01".into(),
        value:       21.54,
        value_label: "21.5°C".into(),
        color_hint:  "#FF0000".into(),
      }]
    );
  }

  #[test]
  fn broken_label_format_falls_back() {
    let style = ChartStyle { label_format: "%Q".into(), ..ChartStyle::default() };
    assert!(!style.has_valid_label_format());
    assert_eq!(style.label(jan(4)), "2024-01-04");
    assert!(ChartStyle::default().has_valid_label_format());
  }

  #[test]
  fn summary_stats() {
    let set = set_of(vec![
      Measurement::new(18.0, jan(1)).with_id(1),
      Measurement::new(24.0, jan(3)).with_id(2),
      Measurement::new(21.0, jan(2)).with_id(3),
    ]);

    let summary = ChartProjection::recompute(&set).summary().unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.min, 18.0);
    assert_eq!(summary.max, 24.0);
    assert_eq!(summary.mean, 21.0);
    assert_eq!(summary.latest, ChartPoint { taken_at: jan(3), temperature: 24.0 });
  }
}
