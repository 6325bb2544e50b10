//! The single "state changed" hook fired after every controller operation.

use crate::{chart::ChartProjection, set::Entry};

/// Receives a complete, consistent view after each mutation or load.
///
/// Called on the task that owns the controller, never with a half-updated
/// collection.
pub trait StateObserver: Send + 'static {
  fn on_state_changed(&mut self, measurements: &[Entry], chart: &ChartProjection);
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StateObserver for NoopObserver {
  fn on_state_changed(&mut self, _: &[Entry], _: &ChartProjection) {}
}

impl<F> StateObserver for F
where
  F: FnMut(&[Entry], &ChartProjection) + Send + 'static,
{
  fn on_state_changed(&mut self, measurements: &[Entry], chart: &ChartProjection) {
    self(measurements, chart)
  }
}
