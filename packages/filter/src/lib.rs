#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial filters applied after deduplication.
//!
//! Tiles are rectangles, so a download returns every parcel touching the
//! tile even when the selection was a line buffer or a polygon. These
//! filters narrow the result back to the selection. Duplicate tags follow
//! their features: survivors keep their tag at their new position, and
//! group ids are left unchanged.

use geo::{Geometry, Point};
use parcel_wfs_geometry::GeometryOps;
use parcel_wfs_parcel_models::{BBox, DedupOutcome, DuplicateTag, FeatureRecord};
use rstar::{AABB, RTree};

/// Features and tags surviving a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    /// Surviving features, in their original relative order.
    pub features: Vec<FeatureRecord>,
    /// Tags aligned with `features`.
    pub outcome: DedupOutcome,
    /// Number of features removed.
    pub excluded: usize,
}

fn retain_tagged(
    features: Vec<FeatureRecord>,
    outcome: &DedupOutcome,
    mut keep: impl FnMut(&Geometry<f64>) -> bool,
) -> FilterResult {
    let before = features.len();
    let (features, tags): (Vec<FeatureRecord>, Vec<DuplicateTag>) = features
        .into_iter()
        .enumerate()
        .filter(|(_, f)| f.usable_geometry().is_some_and(&mut keep))
        .map(|(i, f)| (f, outcome.tag(i)))
        .unzip();

    FilterResult {
        excluded: before - features.len(),
        features,
        outcome: DedupOutcome::new(tags),
    }
}

/// Keeps features whose geometry is present, non-empty, and intersects
/// `filter_geometry`.
#[must_use]
pub fn filter_by_intersection(
    features: Vec<FeatureRecord>,
    outcome: &DedupOutcome,
    filter_geometry: &Geometry<f64>,
    ops: &dyn GeometryOps,
) -> FilterResult {
    let result = retain_tagged(features, outcome, |g| ops.intersects(g, filter_geometry));
    log::info!(
        "Intersection filter: kept {}, excluded {}",
        result.features.len(),
        result.excluded
    );
    result
}

/// Keeps features whose geometry intersects at least one of `points`.
///
/// Points are indexed in an R-tree so each feature only tests the points
/// inside its bounding box.
#[must_use]
pub fn filter_by_containment(
    features: Vec<FeatureRecord>,
    outcome: &DedupOutcome,
    points: &[Point<f64>],
    ops: &dyn GeometryOps,
) -> FilterResult {
    let index: RTree<[f64; 2]> = RTree::bulk_load(points.iter().map(|p| [p.x(), p.y()]).collect());

    let result = retain_tagged(features, outcome, |g| {
        let Some(bbox) = BBox::of_geometry(g) else {
            return false;
        };
        let envelope = AABB::from_corners(
            [bbox.min_lon, bbox.min_lat],
            [bbox.max_lon, bbox.max_lat],
        );
        index
            .locate_in_envelope_intersecting(&envelope)
            .any(|p| ops.intersects(g, &Geometry::Point(Point::new(p[0], p[1]))))
    });

    log::info!(
        "Point filter ({} points): kept {}, excluded {}",
        points.len(),
        result.features.len(),
        result.excluded
    );
    result
}
