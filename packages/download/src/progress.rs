//! Progress reporting for tile downloads.
//!
//! [`ProgressCallback`] decouples the orchestrator from any rendering
//! backend (`indicatif` bars, log-only reporting, or silence).

use std::sync::Arc;

/// State after one tile attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileReport {
    /// Zero-based position of the tile among the tiles being fetched.
    pub index: usize,
    /// Number of tiles being fetched.
    pub total: usize,
    /// Features aggregated so far.
    pub aggregated: usize,
    /// Failed tiles so far.
    pub errors: usize,
}

/// Trait for reporting progress from a download run.
///
/// Implementations must be `Send + Sync` so they can be shared through an
/// `Arc` with the rendering side.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Set the current position (absolute, not delta).
    fn set_position(&self, pos: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);

    /// Reports the outcome of one tile attempt.
    fn report_tile(&self, report: &TileReport) {
        self.set_position(report.index as u64 + 1);
        self.set_message(format!(
            "Tile {}/{}: {} features, {} errors",
            report.index + 1,
            report.total,
            report.aggregated,
            report.errors
        ));
    }
}

/// A no-op implementation of [`ProgressCallback`].
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
    fn report_tile(&self, _report: &TileReport) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
