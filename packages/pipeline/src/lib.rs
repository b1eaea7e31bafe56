#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end parcel download sessions.
//!
//! A [`Session`] resolves an area selection, tiles its bounding box,
//! downloads the tiles one at a time, deduplicates the features, narrows
//! them back to the selection, and writes them to a new or existing
//! result collection on disk.

pub mod config;
pub mod lookup;

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use geo::Geometry;
use parcel_wfs_dedup::dedupe;
use parcel_wfs_download::{
    DownloadOrchestrator, DownloadOutcome, DownloadStats, PacingPolicy,
    interaction::{CancelSignal, Prompter},
    progress::{ProgressCallback, null_progress},
};
use parcel_wfs_filter::{filter_by_containment, filter_by_intersection};
use parcel_wfs_geometry::{
    GeometryError, GeometryOps,
    selection::{AreaOfInterest, AreaSelectionStrategy},
};
use parcel_wfs_grid::{GridError, compute_grid, estimate_area_km2, grid_shape};
use parcel_wfs_parcel_models::config::Config;
use parcel_wfs_sink::{Materialized, ResultSink, SinkError, SinkMode, SinkReport, store};
use parcel_wfs_wfs::{FetchError, TileFetcher};
use thiserror::Error;

pub use crate::config::ConfigError;

/// Errors that end a session early.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The selection could not be turned into an area of interest.
    #[error("Selection error: {0}")]
    Geometry(#[from] GeometryError),

    /// The area could not be tiled.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// A single request failed outside the tiled download.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Writing results failed or was refused.
    #[error("Output error: {0}")]
    Sink(#[from] SinkError),

    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Where a session writes its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Create a new collection file inside `dir`.
    Create {
        /// Output directory.
        dir: PathBuf,
    },
    /// Append to the collection file at `path`.
    Append {
        /// Existing collection file.
        path: PathBuf,
    },
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Results were written.
    Written,
    /// The multi-tile confirmation was declined.
    Declined,
    /// Nothing was found, or nothing survived the filters.
    NoResults,
    /// The run was cancelled and the partial results discarded.
    PartialDiscarded,
}

/// Counters of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Base name of the selection.
    pub label: String,
    /// How the session ended.
    pub status: SessionStatus,
    /// Tile counters.
    pub download: DownloadStats,
    /// Features received from the service.
    pub loaded_features: usize,
    /// Identity field used for deduplication.
    pub identity_field: Option<String>,
    /// Features removed as identity duplicates.
    pub duplicates_removed: usize,
    /// Features flagged as geometry duplicates.
    pub geometry_duplicates: usize,
    /// Number of geometry duplicate groups.
    pub duplicate_groups: usize,
    /// Features removed by the intersection filter.
    pub excluded_by_geometry: usize,
    /// Features removed by the point filter.
    pub excluded_by_points: usize,
    /// Write counters, when results were written.
    pub sink: Option<SinkReport>,
    /// File written, when results were written.
    pub output_path: Option<PathBuf>,
    /// Wall-clock duration in seconds.
    pub elapsed_secs: f64,
}

impl SessionReport {
    fn new(label: String, download: DownloadStats) -> Self {
        Self {
            label,
            status: SessionStatus::NoResults,
            download,
            loaded_features: 0,
            identity_field: None,
            duplicates_removed: 0,
            geometry_duplicates: 0,
            duplicate_groups: 0,
            excluded_by_geometry: 0,
            excluded_by_points: 0,
            sink: None,
            output_path: None,
            elapsed_secs: 0.0,
        }
    }

    /// Multi-line human readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let d = &self.download;

        let _ = writeln!(out, "{}", self.label);
        match self.status {
            SessionStatus::Declined => {
                let _ = writeln!(out, "Download declined ({} tiles planned)", d.planned_tiles());
                return out;
            }
            SessionStatus::PartialDiscarded => {
                let _ = writeln!(
                    out,
                    "Download cancelled after {}/{} tiles; partial results discarded",
                    d.attempted_tiles,
                    d.planned_tiles()
                );
                return out;
            }
            SessionStatus::NoResults | SessionStatus::Written => {}
        }

        let _ = writeln!(out, "Features loaded:        {}", self.loaded_features);
        let _ = writeln!(
            out,
            "Tiles downloaded:       {}/{}",
            d.succeeded_tiles(),
            d.total_tiles
        );
        if d.skipped_tiles > 0 {
            let _ = writeln!(out, "Tiles skipped:          {}", d.skipped_tiles);
        }
        if d.failed_tiles > 0 {
            let _ = writeln!(out, "Tiles failed:           {}", d.failed_tiles);
        }
        if d.cancelled {
            let _ = writeln!(out, "Download cancelled, partial results kept");
        }
        if self.duplicates_removed > 0 {
            let _ = writeln!(
                out,
                "Duplicates removed:     {} (field {})",
                self.duplicates_removed,
                self.identity_field.as_deref().unwrap_or("?")
            );
        }
        if self.geometry_duplicates > 0 {
            let _ = writeln!(
                out,
                "Geometry duplicates:    {} in {} groups",
                self.geometry_duplicates, self.duplicate_groups
            );
        }
        if self.excluded_by_geometry > 0 {
            let _ = writeln!(out, "Outside the selection:  {}", self.excluded_by_geometry);
        }
        if self.excluded_by_points > 0 {
            let _ = writeln!(out, "Without a point:        {}", self.excluded_by_points);
        }

        match (&self.sink, &self.output_path) {
            (Some(sink), Some(path)) => {
                if sink.skipped_existing > 0 {
                    let _ = writeln!(out, "Already in target:      {}", sink.skipped_existing);
                }
                if !sink.dropped_fields.is_empty() {
                    let _ = writeln!(
                        out,
                        "Fields not written:     {}",
                        sink.dropped_fields.join(", ")
                    );
                }
                let _ = writeln!(
                    out,
                    "Written:                {} features to '{}' ({})",
                    sink.added,
                    sink.collection_name,
                    path.display()
                );
            }
            _ => {
                let _ = writeln!(out, "No parcels found in the selected area");
            }
        }
        let _ = writeln!(out, "Elapsed:                {:.1}s", self.elapsed_secs);

        out
    }
}

/// Moves an area of interest from `from` to the service frame `to`.
fn to_service_frame(
    aoi: AreaOfInterest,
    ops: &dyn GeometryOps,
    from: &str,
    to: &str,
) -> Result<AreaOfInterest, GeometryError> {
    if from.eq_ignore_ascii_case(to) {
        return Ok(aoi);
    }

    log::info!("Reprojecting selection from {from} to {to}");
    let filter_geometry = aoi
        .filter_geometry
        .map(|g| ops.reproject(g, from, to))
        .transpose()?;
    let containment_points = aoi
        .containment_points
        .map(|points| {
            points
                .into_iter()
                .map(|p| match ops.reproject(Geometry::Point(p), from, to)? {
                    Geometry::Point(p) => Ok(p),
                    _ => Err(GeometryError::UnsupportedType {
                        operation: "reprojection",
                        expected: "Point",
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    let extent = ops.reproject(Geometry::Polygon(aoi.bbox.to_polygon()), from, to)?;

    Ok(AreaOfInterest {
        bbox: ops.bbox(&extent).ok_or(GeometryError::Empty)?,
        filter_geometry,
        containment_points,
        label: aoi.label,
    })
}

/// One configured download session.
pub struct Session {
    config: Config,
    fetcher: Arc<dyn TileFetcher>,
    geometry: Arc<dyn GeometryOps>,
    prompter: Arc<dyn Prompter>,
    cancel: Arc<dyn CancelSignal>,
    progress: Arc<dyn ProgressCallback>,
    input_frame: Option<String>,
}

impl Session {
    /// Creates a session with silent progress whose selections are given
    /// in the service frame.
    #[must_use]
    pub fn new(
        config: Config,
        fetcher: Arc<dyn TileFetcher>,
        geometry: Arc<dyn GeometryOps>,
        prompter: Arc<dyn Prompter>,
        cancel: Arc<dyn CancelSignal>,
    ) -> Self {
        Self {
            config,
            fetcher,
            geometry,
            prompter,
            cancel,
            progress: null_progress(),
            input_frame: None,
        }
    }

    /// Reports tile progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Interprets selections as given in `frame`.
    #[must_use]
    pub fn with_input_frame(mut self, frame: impl Into<String>) -> Self {
        self.input_frame = Some(frame.into());
        self
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the whole session for `selection`, writing to `target`.
    ///
    /// Declined, empty, and discarded downloads are reported through
    /// [`SessionReport::status`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the selection is invalid, the area
    /// cannot be tiled, or the results cannot be written.
    pub async fn run(
        &self,
        selection: &dyn AreaSelectionStrategy,
        target: &OutputTarget,
    ) -> Result<SessionReport, PipelineError> {
        let start = Instant::now();
        let ops = self.geometry.as_ref();
        let service_frame = &self.config.service.srs_name;

        let aoi = selection.resolve(ops)?;
        let aoi = match &self.input_frame {
            Some(frame) => to_service_frame(aoi, ops, frame, service_frame)?,
            None => aoi,
        };

        let max_tile = self.config.download.max_tile_km2;
        let tiles = compute_grid(&aoi.bbox, max_tile)?;
        let area = estimate_area_km2(&aoi.bbox);
        let shape = grid_shape(area, max_tile);
        log::info!(
            "Estimated area ~{area:.2} km², limit {max_tile} km² per request: {} x {} tiles",
            shape.rows,
            shape.cols
        );

        let orchestrator = DownloadOrchestrator::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.geometry),
            Arc::clone(&self.prompter),
            Arc::clone(&self.cancel),
            PacingPolicy::from_secs(self.config.download.pacing_secs),
        )
        .with_progress(Arc::clone(&self.progress));

        let outcome = orchestrator
            .run(tiles, aoi.filter_geometry.as_ref())
            .await;
        let mut report = SessionReport::new(aoi.label.clone(), *outcome.stats());

        let aggregate = match outcome {
            DownloadOutcome::Completed(aggregate) => aggregate,
            DownloadOutcome::Declined { .. } => {
                report.status = SessionStatus::Declined;
                return Ok(self.finish(report, start));
            }
            DownloadOutcome::PartialDiscarded { .. } => {
                report.status = SessionStatus::PartialDiscarded;
                return Ok(self.finish(report, start));
            }
            DownloadOutcome::NoResults { .. } => return Ok(self.finish(report, start)),
        };
        self.progress.finish_and_clear();

        report.loaded_features = aggregate.features.len();
        let schema = aggregate.schema;
        let dedup = dedupe(aggregate.features, &schema, &self.config.dedup);
        report.identity_field.clone_from(&dedup.identity_field);
        report.duplicates_removed = dedup.duplicates_removed;

        let (mut features, mut tags) = (dedup.survivors, dedup.outcome);
        if let Some(filter) = &aoi.filter_geometry {
            let result = filter_by_intersection(features, &tags, filter, ops);
            report.excluded_by_geometry = result.excluded;
            (features, tags) = (result.features, result.outcome);
        }
        if let Some(points) = &aoi.containment_points {
            let result = filter_by_containment(features, &tags, points, ops);
            report.excluded_by_points = result.excluded;
            (features, tags) = (result.features, result.outcome);
        }

        report.geometry_duplicates = tags.duplicate_count();
        report.duplicate_groups = tags.group_count();

        if features.is_empty() {
            log::warn!("No parcels left after filtering");
            return Ok(self.finish(report, start));
        }

        let sink = ResultSink::new(&self.config.output, self.prompter.as_ref());
        let identity_field = dedup.identity_field.as_deref();

        let create_in = |dir: &Path| -> Result<(SinkReport, PathBuf), PipelineError> {
            let mode = SinkMode::Create {
                base_name: &aoi.label,
            };
            match sink.materialize(&features, &schema, &tags, mode)? {
                Materialized::Created { collection, report } => {
                    let path = store::collection_path(dir, &collection.name);
                    store::save(&collection, &path)?;
                    Ok((report, path))
                }
                Materialized::Appended(_) => Err(SinkError::Inconsistent {
                    message: "create mode returned no collection".to_string(),
                }
                .into()),
            }
        };

        let (sink_report, path) = match target {
            OutputTarget::Create { dir } => create_in(dir)?,
            OutputTarget::Append { path } if !store::exists(path) => {
                log::warn!(
                    "Append target {} no longer exists; creating a new collection",
                    path.display()
                );
                create_in(path.parent().unwrap_or_else(|| Path::new(".")))?
            }
            OutputTarget::Append { path } => {
                let mut collection = store::load(path)?;
                let mode = SinkMode::Append {
                    target: &mut collection,
                    identity_field,
                };
                let written = sink.materialize(&features, &schema, &tags, mode)?;
                let sink_report = written.report().clone();
                store::save(&collection, path)?;
                (sink_report, path.clone())
            }
        };

        report.status = SessionStatus::Written;
        report.sink = Some(sink_report);
        report.output_path = Some(path);
        Ok(self.finish(report, start))
    }

    fn finish(&self, mut report: SessionReport, start: Instant) -> SessionReport {
        self.progress.finish_and_clear();
        report.elapsed_secs = start.elapsed().as_secs_f64();
        log::info!("Session finished:\n{}", report.summary());
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use geo::{Intersects, Polygon, line_string, polygon};
    use parcel_wfs_download::interaction::{CancelFlag, FixedAnswer};
    use parcel_wfs_geometry::{PlanarGeometryOps, selection::AreaSelection};
    use parcel_wfs_parcel_models::{
        AttributeValue, Attributes, FeatureRecord, FieldDef, FieldType, GeometryKind, SchemaInfo,
        Tile,
    };
    use parcel_wfs_wfs::TileBatch;

    use super::*;

    /// Serves a fixed parcel set, returning every parcel touching the
    /// requested tile like the real service does.
    struct FakeService {
        parcels: Vec<FeatureRecord>,
        requests: Mutex<usize>,
    }

    impl FakeService {
        fn new(parcels: Vec<FeatureRecord>) -> Self {
            Self {
                parcels,
                requests: Mutex::new(0),
            }
        }

        fn requests(&self) -> usize {
            *self.requests.lock().unwrap()
        }
    }

    #[async_trait]
    impl TileFetcher for FakeService {
        async fn fetch(&self, tile: &Tile) -> Result<TileBatch, FetchError> {
            *self.requests.lock().unwrap() += 1;
            let area = tile.bbox.to_polygon();
            let features: Vec<FeatureRecord> = self
                .parcels
                .iter()
                .filter(|p| p.geometry.as_ref().is_some_and(|g| g.intersects(&area)))
                .cloned()
                .collect();
            if features.is_empty() {
                return Ok(TileBatch::empty());
            }
            Ok(TileBatch {
                features,
                schema: Some(SchemaInfo {
                    fields: vec![
                        FieldDef::new("gml_id", FieldType::Text),
                        FieldDef::new("NATIONALCADASTRALREFERENCE", FieldType::Text),
                    ],
                    geometry_kind: GeometryKind::Polygon,
                    coordinate_frame: "EPSG:6706".to_string(),
                }),
            })
        }
    }

    fn square(lon: f64, lat: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: lon, y: lat), (x: lon + size, y: lat), (x: lon + size, y: lat + size), (x: lon, y: lat + size)
        ]
    }

    fn parcel(id: &str, lon: f64, lat: f64) -> FeatureRecord {
        let attributes: Attributes = [
            ("gml_id", AttributeValue::from(id)),
            (
                "NATIONALCADASTRALREFERENCE",
                AttributeValue::from(format!("G273_0001A0.{id}")),
            ),
        ]
        .into_iter()
        .collect();
        FeatureRecord::new(
            Some(Geometry::Polygon(square(lon, lat, 0.001))),
            attributes,
        )
    }

    fn parcels() -> Vec<FeatureRecord> {
        vec![
            parcel("1", 9.0001, 45.0001),
            parcel("2", 9.0101, 45.0001),
            // Same shape as 2 under another id.
            parcel("3", 9.0101, 45.0001),
            parcel("4", 9.0201, 45.0101),
        ]
    }

    fn session(service: Arc<FakeService>, answer: bool) -> Session {
        Session::new(
            Config::default(),
            service,
            Arc::new(PlanarGeometryOps::new()),
            Arc::new(FixedAnswer(answer)),
            Arc::new(CancelFlag::new()),
        )
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("parcel_wfs_pipeline_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn small_bbox() -> AreaSelection {
        AreaSelection::BBoxDraw {
            corner_a: (45.0, 9.0),
            corner_b: (45.012, 9.012),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bbox_session_creates_a_tagged_collection() {
        let dir = temp_dir("create");
        let service = Arc::new(FakeService::new(parcels()));
        let report = session(Arc::clone(&service), true)
            .run(&small_bbox(), &OutputTarget::Create { dir: dir.clone() })
            .await
            .unwrap();

        assert_eq!(report.status, SessionStatus::Written);
        assert_eq!(service.requests(), 1);
        assert_eq!(report.loaded_features, 3);
        assert_eq!(report.geometry_duplicates, 2);
        assert_eq!(report.duplicate_groups, 1);

        let path = report.output_path.unwrap();
        assert!(path.starts_with(&dir));
        let collection = store::load(&path).unwrap();
        assert!(collection.name.starts_with("Parcels (BBox)_"));
        assert_eq!(collection.records.len(), 3);
        assert_eq!(
            collection.records[1].attribute("duplicate_group_id"),
            &AttributeValue::Integer(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_append_never_inserts_a_parcel_twice() {
        let dir = temp_dir("append");
        let service = Arc::new(FakeService::new(parcels()));
        let first = session(Arc::clone(&service), true)
            .run(&small_bbox(), &OutputTarget::Create { dir })
            .await
            .unwrap();
        let path = first.output_path.unwrap();

        let second = session(Arc::clone(&service), true)
            .run(&small_bbox(), &OutputTarget::Append { path: path.clone() })
            .await
            .unwrap();

        let sink = second.sink.unwrap();
        assert_eq!(sink.added, 0);
        assert_eq!(sink.skipped_existing, 3);
        assert_eq!(store::load(&path).unwrap().records.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_append_target_falls_back_to_create() {
        let dir = temp_dir("vanished");
        let missing = dir.join("gone.geojson");
        let service = Arc::new(FakeService::new(parcels()));

        let report = session(service, true)
            .run(&small_bbox(), &OutputTarget::Append { path: missing.clone() })
            .await
            .unwrap();

        let path = report.output_path.unwrap();
        assert_ne!(path, missing);
        assert!(path.starts_with(&dir));
        assert!(store::exists(&path));
    }

    #[tokio::test(start_paused = true)]
    async fn declined_multi_tile_download_writes_nothing() {
        let dir = temp_dir("declined");
        let service = Arc::new(FakeService::new(parcels()));
        let selection = AreaSelection::BBoxDraw {
            corner_a: (45.0, 9.0),
            corner_b: (45.03, 9.03),
        };

        let report = session(Arc::clone(&service), false)
            .run(&selection, &OutputTarget::Create { dir: dir.clone() })
            .await
            .unwrap();

        assert_eq!(report.status, SessionStatus::Declined);
        assert!(report.download.total_tiles > 1);
        assert_eq!(service.requests(), 0);
        assert!(!dir.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn line_selection_keeps_only_parcels_near_the_line() {
        let dir = temp_dir("line");
        let service = Arc::new(FakeService::new(parcels()));
        // Crosses the southern row, then turns north 300 m east of
        // parcel 4, which lies inside the bbox but outside the buffer.
        let selection = AreaSelection::LinePick {
            lines: vec![Geometry::LineString(line_string![
                (x: 9.0, y: 45.0005),
                (x: 9.025, y: 45.0005),
                (x: 9.025, y: 45.02),
            ])],
            buffer_m: 10.0,
        };

        let report = session(service, true)
            .run(&selection, &OutputTarget::Create { dir })
            .await
            .unwrap();

        assert_eq!(report.download.total_tiles, 2);
        assert_eq!(report.excluded_by_geometry, 1);

        let collection = store::load(&report.output_path.unwrap()).unwrap();
        let ids: Vec<String> = collection
            .records
            .iter()
            .map(|r| r.attribute("gml_id").to_string())
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn foreign_input_frame_is_rejected_by_planar_ops() {
        let service = Arc::new(FakeService::new(parcels()));
        let result = session(service, true)
            .with_input_frame("EPSG:3857")
            .run(
                &small_bbox(),
                &OutputTarget::Create {
                    dir: temp_dir("frame"),
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::Geometry(GeometryError::UnsupportedFrame { .. }))
        ));
    }

    #[test]
    fn summary_mentions_written_collection() {
        let mut report = SessionReport::new("Parcels (BBox)".to_string(), DownloadStats {
            total_tiles: 4,
            skipped_tiles: 1,
            attempted_tiles: 3,
            failed_tiles: 1,
            cancelled: false,
        });
        report.status = SessionStatus::Written;
        report.loaded_features = 10;
        report.sink = Some(SinkReport {
            collection_name: "Parcels (BBox)_20260101000000".to_string(),
            added: 8,
            skipped_existing: 2,
            ..SinkReport::default()
        });
        report.output_path = Some(PathBuf::from("out/p.geojson"));

        let summary = report.summary();
        assert!(summary.contains("Tiles downloaded:       2/4"));
        assert!(summary.contains("Tiles skipped:          1"));
        assert!(summary.contains("Already in target:      2"));
        assert!(summary.contains("8 features to 'Parcels (BBox)_20260101000000'"));
    }
}
