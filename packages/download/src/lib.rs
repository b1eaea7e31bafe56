#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tile download orchestration.
//!
//! Tiles are fetched strictly one at a time. Between consecutive tiles a
//! fixed pause is observed to respect the service's implicit rate limit;
//! it never grows on failure. Cancellation is polled before every fetch
//! and once per pacing tick, and never interrupts a request in flight.
//! A failed tile is logged and counted, and the run moves on.

pub mod interaction;
pub mod progress;

use std::{sync::Arc, time::Duration};

use geo::Geometry;
use parcel_wfs_geometry::GeometryOps;
use parcel_wfs_parcel_models::{FeatureRecord, SchemaInfo, Tile};
use parcel_wfs_wfs::TileFetcher;

use crate::{
    interaction::{CancelSignal, Prompter},
    progress::{ProgressCallback, TileReport, null_progress},
};

/// Inter-request pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Pause between the end of one tile and the start of the next.
    pub pause: Duration,
    /// Granularity of cancellation checks and countdown updates.
    pub tick: Duration,
}

impl PacingPolicy {
    /// Pauses `secs` seconds between tiles, ticking once per second.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            pause: Duration::from_secs(secs),
            tick: Duration::from_secs(1),
        }
    }
}

/// Tile counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Tiles in the full grid.
    pub total_tiles: usize,
    /// Tiles dropped because they miss the filter geometry.
    pub skipped_tiles: usize,
    /// Tiles a fetch was attempted for.
    pub attempted_tiles: usize,
    /// Tiles that failed.
    pub failed_tiles: usize,
    /// The run stopped on a cancellation request.
    pub cancelled: bool,
}

impl DownloadStats {
    /// Tiles fetched successfully.
    #[must_use]
    pub const fn succeeded_tiles(&self) -> usize {
        self.attempted_tiles - self.failed_tiles
    }

    /// Tiles left after the skip optimization.
    #[must_use]
    pub const fn planned_tiles(&self) -> usize {
        self.total_tiles - self.skipped_tiles
    }
}

/// Features gathered by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    /// Features of every successful tile, in tile order.
    pub features: Vec<FeatureRecord>,
    /// Schema of the first tile that returned features.
    pub schema: SchemaInfo,
    /// Tile counters.
    pub stats: DownloadStats,
}

/// Terminal state of a run. None of these is an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// The caller declined the multi-tile confirmation; nothing was
    /// fetched.
    Declined {
        /// Tile counters (nothing attempted).
        stats: DownloadStats,
    },
    /// No features were found, or every tile failed.
    NoResults {
        /// Tile counters.
        stats: DownloadStats,
    },
    /// The run was cancelled and the caller discarded the partial
    /// features.
    PartialDiscarded {
        /// Tile counters.
        stats: DownloadStats,
    },
    /// Features were gathered, possibly from a cancelled run.
    Completed(AggregateResult),
}

impl DownloadOutcome {
    /// Tile counters of the run.
    #[must_use]
    pub const fn stats(&self) -> &DownloadStats {
        match self {
            Self::Declined { stats }
            | Self::NoResults { stats }
            | Self::PartialDiscarded { stats } => stats,
            Self::Completed(result) => &result.stats,
        }
    }
}

/// Formats seconds as `X min Y sec`, or `Y sec` under a minute.
#[must_use]
pub fn format_duration(secs: u64) -> String {
    let (min, sec) = (secs / 60, secs % 60);
    if min > 0 {
        format!("{min} min {sec} sec")
    } else {
        format!("{sec} sec")
    }
}

/// Text of the multi-tile confirmation.
#[must_use]
pub fn confirmation_message(stats: &DownloadStats, pacing: &PacingPolicy) -> String {
    let planned = stats.planned_tiles();
    let pause = pacing.pause.as_secs();
    let estimate = format_duration(planned as u64 * pause);

    let scope = if stats.skipped_tiles > 0 {
        format!(
            "The area requires {} tiles, but only {planned} intersect the selected geometry \
             ({} skipped).",
            stats.total_tiles, stats.skipped_tiles
        )
    } else {
        format!("The area requires {planned} tiles.")
    };

    format!(
        "{scope}\nEstimated time: ~{estimate} ({pause} sec pause between requests).\n\nProceed?"
    )
}

/// Runs the per-tile state machine over a tile list.
pub struct DownloadOrchestrator {
    fetcher: Arc<dyn TileFetcher>,
    geometry: Arc<dyn GeometryOps>,
    prompter: Arc<dyn Prompter>,
    cancel: Arc<dyn CancelSignal>,
    progress: Arc<dyn ProgressCallback>,
    pacing: PacingPolicy,
}

impl DownloadOrchestrator {
    /// Creates an orchestrator with silent progress.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn TileFetcher>,
        geometry: Arc<dyn GeometryOps>,
        prompter: Arc<dyn Prompter>,
        cancel: Arc<dyn CancelSignal>,
        pacing: PacingPolicy,
    ) -> Self {
        Self {
            fetcher,
            geometry,
            prompter,
            cancel,
            progress: null_progress(),
            pacing,
        }
    }

    /// Reports progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Downloads every tile not excluded by `filter_geometry`.
    pub async fn run(
        &self,
        tiles: Vec<Tile>,
        filter_geometry: Option<&Geometry<f64>>,
    ) -> DownloadOutcome {
        let mut stats = DownloadStats {
            total_tiles: tiles.len(),
            ..DownloadStats::default()
        };

        let tiles = self.skip_disjoint_tiles(tiles, filter_geometry);
        stats.skipped_tiles = stats.total_tiles - tiles.len();

        if tiles.is_empty() {
            log::warn!("No tile intersects the selected geometry");
            return DownloadOutcome::NoResults { stats };
        }

        if tiles.len() > 1
            && !self.prompter.ask_yes_no(
                "Confirm download",
                &confirmation_message(&stats, &self.pacing),
            )
        {
            log::info!("Download of {} tiles declined", tiles.len());
            return DownloadOutcome::Declined { stats };
        }

        let total = tiles.len();
        self.progress.set_total(total as u64);

        let mut features: Vec<FeatureRecord> = Vec::new();
        let mut schema: Option<SchemaInfo> = None;

        for (i, tile) in tiles.iter().enumerate() {
            if self.cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }

            self.progress
                .set_message(format!("Downloading tile {}/{total}...", i + 1));
            stats.attempted_tiles += 1;

            match self.fetcher.fetch(tile).await {
                Ok(batch) => {
                    log::info!(
                        "Tile {}/{total} [{}]: {} features",
                        i + 1,
                        tile.bbox,
                        batch.features.len()
                    );
                    if schema.is_none() {
                        schema = batch.schema;
                    }
                    features.extend(batch.features);
                }
                Err(e) => {
                    stats.failed_tiles += 1;
                    log::warn!(
                        "Tile {}/{total} [{}]: {} failure: {e}",
                        i + 1,
                        tile.bbox,
                        e.kind()
                    );
                }
            }

            self.progress.report_tile(&TileReport {
                index: i,
                total,
                aggregated: features.len(),
                errors: stats.failed_tiles,
            });

            if i + 1 < total && self.pace(i + 1, total).await {
                stats.cancelled = true;
                break;
            }
        }

        if stats.cancelled {
            log::warn!(
                "Download cancelled after {}/{total} tiles",
                stats.attempted_tiles
            );
        }

        let (false, Some(schema)) = (features.is_empty(), schema) else {
            log::info!(
                "No features found ({} of {} tiles failed)",
                stats.failed_tiles,
                stats.attempted_tiles
            );
            return DownloadOutcome::NoResults { stats };
        };

        if stats.cancelled
            && !self.prompter.ask_yes_no(
                "Download interrupted",
                &format!(
                    "Downloaded {} features from {}/{total} tiles.\n\nKeep the partial results?",
                    features.len(),
                    stats.succeeded_tiles()
                ),
            )
        {
            return DownloadOutcome::PartialDiscarded { stats };
        }

        DownloadOutcome::Completed(AggregateResult {
            features,
            schema,
            stats,
        })
    }

    fn skip_disjoint_tiles(
        &self,
        tiles: Vec<Tile>,
        filter_geometry: Option<&Geometry<f64>>,
    ) -> Vec<Tile> {
        let Some(filter) = filter_geometry else {
            return tiles;
        };
        if tiles.len() <= 1 {
            return tiles;
        }

        let before = tiles.len();
        let kept: Vec<Tile> = tiles
            .into_iter()
            .filter(|tile| {
                self.geometry
                    .intersects(&Geometry::Polygon(tile.bbox.to_polygon()), filter)
            })
            .collect();

        if kept.len() < before {
            log::info!(
                "Skipping {} of {before} tiles that miss the selected geometry",
                before - kept.len()
            );
        }

        kept
    }

    /// Waits out the pause before tile `next`, returning `true` if
    /// cancelled meanwhile.
    async fn pace(&self, next: usize, total: usize) -> bool {
        let mut remaining = self.pacing.pause;
        while !remaining.is_zero() {
            if self.cancel.is_cancelled() {
                return true;
            }
            self.progress.set_message(format!(
                "Waiting {}s before tile {}/{total}...",
                remaining.as_secs_f64().ceil(),
                next + 1
            ));
            let step = remaining.min(self.pacing.tick);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::Mutex,
    };

    use async_trait::async_trait;
    use geo::polygon;
    use parcel_wfs_geometry::PlanarGeometryOps;
    use parcel_wfs_parcel_models::{
        AttributeValue, Attributes, BBox, FieldDef, FieldType, GeometryKind,
    };
    use parcel_wfs_wfs::{FetchError, TileBatch};

    use super::*;
    use crate::interaction::CancelFlag;

    type Script = Box<dyn Fn(&Tile) -> Result<TileBatch, FetchError> + Send + Sync>;

    struct ScriptedFetcher {
        script: Script,
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedFetcher {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TileFetcher for ScriptedFetcher {
        async fn fetch(&self, tile: &Tile) -> Result<TileBatch, FetchError> {
            self.calls.lock().unwrap().push(tile.index);
            (self.script)(tile)
        }
    }

    struct ScriptedPrompter {
        answers: Mutex<VecDeque<bool>>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompter {
        fn new(answers: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                asked: Mutex::new(Vec::new()),
            })
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask_yes_no(&self, title: &str, _message: &str) -> bool {
            self.asked.lock().unwrap().push(title.to_string());
            self.answers.lock().unwrap().pop_front().unwrap_or(false)
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        reports: Mutex<Vec<TileReport>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn set_total(&self, _total: u64) {}
        fn set_position(&self, _pos: u64) {}
        fn set_message(&self, _msg: String) {}
        fn finish_and_clear(&self) {}
        fn report_tile(&self, report: &TileReport) {
            self.reports.lock().unwrap().push(*report);
        }
    }

    fn row_of_tiles(n: usize) -> Vec<Tile> {
        (0..n)
            .map(|i| {
                let lon = 9.0 + 0.01 * i as f64;
                Tile {
                    index: i,
                    row: 0,
                    col: i,
                    bbox: BBox::new(45.0, lon, 45.01, lon + 0.01),
                }
            })
            .collect()
    }

    fn one_feature(tile: &Tile) -> TileBatch {
        let attributes: Attributes =
            [("gml_id", AttributeValue::from(format!("f{}", tile.index)))]
                .into_iter()
                .collect();
        TileBatch {
            features: vec![FeatureRecord::new(
                Some(Geometry::Polygon(tile.bbox.to_polygon())),
                attributes,
            )],
            schema: Some(SchemaInfo {
                fields: vec![FieldDef::new("gml_id", FieldType::Text)],
                geometry_kind: GeometryKind::Polygon,
                coordinate_frame: "EPSG:6706".to_string(),
            }),
        }
    }

    fn orchestrator(
        fetcher: Arc<ScriptedFetcher>,
        prompter: Arc<ScriptedPrompter>,
        cancel: CancelFlag,
        pause_secs: u64,
    ) -> DownloadOrchestrator {
        DownloadOrchestrator::new(
            fetcher,
            Arc::new(PlanarGeometryOps::new()),
            prompter,
            Arc::new(cancel),
            PacingPolicy::from_secs(pause_secs),
        )
    }

    #[test]
    fn formats_time_estimates() {
        assert_eq!(format_duration(45), "45 sec");
        assert_eq!(format_duration(125), "2 min 5 sec");
    }

    #[test]
    fn confirmation_mentions_skipped_tiles() {
        let stats = DownloadStats {
            total_tiles: 12,
            skipped_tiles: 4,
            ..DownloadStats::default()
        };
        let message = confirmation_message(&stats, &PacingPolicy::from_secs(5));
        assert!(message.contains("requires 12 tiles, but only 8 intersect"));
        assert!(message.contains("(4 skipped)"));
        assert!(message.contains("~40 sec"));
    }

    #[tokio::test(start_paused = true)]
    async fn single_tile_needs_no_confirmation() {
        let fetcher = ScriptedFetcher::new(Box::new(|t| Ok(one_feature(t))));
        let prompter = ScriptedPrompter::new(&[]);
        let outcome = orchestrator(fetcher.clone(), prompter.clone(), CancelFlag::new(), 5)
            .run(row_of_tiles(1), None)
            .await;

        assert!(prompter.asked().is_empty());
        let DownloadOutcome::Completed(result) = outcome else {
            panic!("expected Completed");
        };
        assert_eq!(result.features.len(), 1);
        assert_eq!(fetcher.calls(), [0]);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_confirmation_fetches_nothing() {
        let fetcher = ScriptedFetcher::new(Box::new(|t| Ok(one_feature(t))));
        let prompter = ScriptedPrompter::new(&[false]);
        let outcome = orchestrator(fetcher.clone(), prompter.clone(), CancelFlag::new(), 5)
            .run(row_of_tiles(3), None)
            .await;

        assert!(matches!(outcome, DownloadOutcome::Declined { .. }));
        assert_eq!(prompter.asked(), ["Confirm download"]);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn skips_tiles_missing_the_filter_geometry() {
        let fetcher = ScriptedFetcher::new(Box::new(|t| Ok(one_feature(t))));
        let prompter = ScriptedPrompter::new(&[true]);
        // Covers the first two tiles of the row only.
        let filter = Geometry::Polygon(polygon![
            (x: 9.001, y: 45.001), (x: 9.015, y: 45.001), (x: 9.015, y: 45.005), (x: 9.001, y: 45.005)
        ]);

        let outcome = orchestrator(fetcher.clone(), prompter, CancelFlag::new(), 5)
            .run(row_of_tiles(5), Some(&filter))
            .await;

        assert_eq!(fetcher.calls(), [0, 1]);
        assert_eq!(outcome.stats().skipped_tiles, 3);
        assert_eq!(outcome.stats().total_tiles, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn single_tile_is_never_skipped() {
        let fetcher = ScriptedFetcher::new(Box::new(|t| Ok(one_feature(t))));
        let far_away = Geometry::Polygon(polygon![
            (x: 12.0, y: 41.0), (x: 12.1, y: 41.0), (x: 12.1, y: 41.1), (x: 12.0, y: 41.1)
        ]);
        let outcome = orchestrator(fetcher.clone(), ScriptedPrompter::new(&[]), CancelFlag::new(), 5)
            .run(row_of_tiles(1), Some(&far_away))
            .await;

        assert_eq!(fetcher.calls(), [0]);
        assert_eq!(outcome.stats().skipped_tiles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tiles_are_counted_and_the_run_continues() {
        let fetcher = ScriptedFetcher::new(Box::new(|t| {
            if t.index == 1 {
                Err(FetchError::Service {
                    message: "boom".to_string(),
                })
            } else {
                Ok(one_feature(t))
            }
        }));
        let progress = Arc::new(RecordingProgress::default());
        let outcome = orchestrator(fetcher.clone(), ScriptedPrompter::new(&[true]), CancelFlag::new(), 5)
            .with_progress(progress.clone())
            .run(row_of_tiles(3), None)
            .await;

        assert_eq!(fetcher.calls(), [0, 1, 2]);
        let DownloadOutcome::Completed(result) = outcome else {
            panic!("expected Completed");
        };
        assert_eq!(result.features.len(), 2);
        assert_eq!(result.stats.failed_tiles, 1);
        assert_eq!(result.stats.succeeded_tiles(), 2);

        let reports = progress.reports.lock().unwrap().clone();
        assert_eq!(
            reports,
            [
                TileReport { index: 0, total: 3, aggregated: 1, errors: 0 },
                TileReport { index: 1, total: 3, aggregated: 1, errors: 1 },
                TileReport { index: 2, total: 3, aggregated: 2, errors: 1 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn all_tiles_failing_is_no_results() {
        let fetcher = ScriptedFetcher::new(Box::new(|_| {
            Err(FetchError::Parse {
                message: "bad".to_string(),
            })
        }));
        let outcome = orchestrator(fetcher, ScriptedPrompter::new(&[true]), CancelFlag::new(), 5)
            .run(row_of_tiles(2), None)
            .await;

        let DownloadOutcome::NoResults { stats } = outcome else {
            panic!("expected NoResults");
        };
        assert_eq!(stats.failed_tiles, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_tiles_are_no_results() {
        let fetcher = ScriptedFetcher::new(Box::new(|_| Ok(TileBatch::empty())));
        let outcome = orchestrator(fetcher, ScriptedPrompter::new(&[]), CancelFlag::new(), 5)
            .run(row_of_tiles(1), None)
            .await;
        assert!(matches!(outcome, DownloadOutcome::NoResults { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_tiles_but_not_after_the_last() {
        let fetcher = ScriptedFetcher::new(Box::new(|t| Ok(one_feature(t))));
        let start = tokio::time::Instant::now();
        orchestrator(fetcher, ScriptedPrompter::new(&[true]), CancelFlag::new(), 5)
            .run(row_of_tiles(4), None)
            .await;
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_run_offers_partial_results() {
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let fetcher = ScriptedFetcher::new(Box::new(move |t| {
            if t.index == 1 {
                trigger.cancel();
            }
            Ok(one_feature(t))
        }));
        let prompter = ScriptedPrompter::new(&[true, true]);

        let outcome = orchestrator(fetcher.clone(), prompter.clone(), cancel, 5)
            .run(row_of_tiles(5), None)
            .await;

        assert_eq!(fetcher.calls(), [0, 1]);
        assert_eq!(prompter.asked(), ["Confirm download", "Download interrupted"]);
        let DownloadOutcome::Completed(result) = outcome else {
            panic!("expected Completed");
        };
        assert_eq!(result.features.len(), 2);
        assert!(result.stats.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn declining_partial_results_discards_them() {
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let fetcher = ScriptedFetcher::new(Box::new(move |t| {
            if t.index == 1 {
                trigger.cancel();
            }
            Ok(one_feature(t))
        }));

        let outcome = orchestrator(fetcher, ScriptedPrompter::new(&[true, false]), cancel, 5)
            .run(row_of_tiles(5), None)
            .await;

        let DownloadOutcome::PartialDiscarded { stats } = outcome else {
            panic!("expected PartialDiscarded");
        };
        assert!(stats.cancelled);
        assert_eq!(stats.attempted_tiles, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_pacing_is_seen_at_the_next_tick() {
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let fetcher = ScriptedFetcher::new(Box::new(|t| Ok(one_feature(t))));
        let orchestrator = orchestrator(fetcher.clone(), ScriptedPrompter::new(&[true, true]), cancel, 5);

        let canceller = async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        };
        let start = tokio::time::Instant::now();
        let (outcome, ()) = tokio::join!(orchestrator.run(row_of_tiles(3), None), canceller);

        assert_eq!(fetcher.calls(), [0]);
        assert!(outcome.stats().cancelled);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}
