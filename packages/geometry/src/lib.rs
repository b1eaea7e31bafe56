#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry operations consumed by the download pipeline.
//!
//! The pipeline never does geometry math itself; it goes through the
//! [`GeometryOps`] trait (buffering, dissolve, intersection tests,
//! bounding boxes, frame conversion). [`PlanarGeometryOps`] is the
//! `geo`-backed implementation used by the CLI. The [`selection`] module
//! turns a user's area selection into a bounding box plus optional filter
//! geometry.

pub mod selection;

use geo::{
    BooleanOps, Buffer, Coord, Geometry, Intersects, MapCoords, MultiPolygon, Polygon,
};
use parcel_wfs_parcel_models::BBox;
use thiserror::Error;

/// Metres per degree of latitude, matching the tiling approximation.
const METRES_PER_DEGREE: f64 = 111_000.0;

/// Errors from geometry operations and area selection.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// The geometry is empty or has no extent.
    #[error("Empty geometry")]
    Empty,

    /// The geometry type is not accepted by the operation.
    #[error("Unsupported geometry type for {operation}: expected {expected}")]
    UnsupportedType {
        /// Operation that rejected the geometry.
        operation: &'static str,
        /// Accepted geometry types.
        expected: &'static str,
    },

    /// Buffer distance outside the accepted range.
    #[error("Buffer distance {distance_m} m is outside 0-{max_m} m")]
    InvalidBufferDistance {
        /// Requested distance.
        distance_m: f64,
        /// Largest accepted distance.
        max_m: f64,
    },

    /// The geometry's coordinate frame cannot be converted to the
    /// service frame.
    #[error("Cannot convert from {from} to {to}")]
    UnsupportedFrame {
        /// Source frame.
        from: String,
        /// Target frame.
        to: String,
    },
}

/// Geometry capabilities consumed by the pipeline.
pub trait GeometryOps: Send + Sync {
    /// Expands `geometry` by `distance_m` metres.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the geometry cannot be buffered.
    fn buffer(&self, geometry: &Geometry<f64>, distance_m: f64)
    -> Result<Geometry<f64>, GeometryError>;

    /// Unions polygonal geometries into one.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the input is empty or not polygonal.
    fn dissolve(&self, geometries: &[Geometry<f64>]) -> Result<Geometry<f64>, GeometryError>;

    /// Returns `true` if the two geometries share at least one point.
    fn intersects(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> bool;

    /// Bounding box of `geometry`, `None` when empty.
    fn bbox(&self, geometry: &Geometry<f64>) -> Option<BBox>;

    /// Converts `geometry` from `from_frame` to `to_frame`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnsupportedFrame`] if the conversion is
    /// not available.
    fn reproject(
        &self,
        geometry: Geometry<f64>,
        from_frame: &str,
        to_frame: &str,
    ) -> Result<Geometry<f64>, GeometryError>;
}

/// `geo`-backed [`GeometryOps`] working directly on geographic
/// coordinates.
///
/// Metric buffers are computed in a local equirectangular frame centred
/// on the geometry, which is accurate enough for the sub-kilometre
/// distances used by line and point selections. Reprojection is limited
/// to identical frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarGeometryOps;

impl PlanarGeometryOps {
    /// Creates the planar implementation.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Local metric frame around an origin, in metres east/north.
struct LocalFrame {
    origin: Coord<f64>,
    metres_per_degree_lon: f64,
}

impl LocalFrame {
    fn around(bbox: &BBox) -> Self {
        Self {
            origin: Coord {
                x: f64::midpoint(bbox.min_lon, bbox.max_lon),
                y: bbox.mean_lat(),
            },
            metres_per_degree_lon: METRES_PER_DEGREE * bbox.mean_lat().to_radians().cos(),
        }
    }

    fn to_metres(&self, geometry: &Geometry<f64>) -> Geometry<f64> {
        geometry.map_coords(|c| Coord {
            x: (c.x - self.origin.x) * self.metres_per_degree_lon,
            y: (c.y - self.origin.y) * METRES_PER_DEGREE,
        })
    }

    fn to_degrees(&self, polygons: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        polygons.map_coords(|c| Coord {
            x: c.x / self.metres_per_degree_lon + self.origin.x,
            y: c.y / METRES_PER_DEGREE + self.origin.y,
        })
    }
}

fn into_multi_polygon(geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>, GeometryError> {
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Ok(mp.clone()),
        Geometry::Rect(r) => Ok(MultiPolygon(vec![r.to_polygon()])),
        _ => Err(GeometryError::UnsupportedType {
            operation: "dissolve",
            expected: "Polygon or MultiPolygon",
        }),
    }
}

/// Collapses a single-member multipolygon into a plain polygon.
fn simplify_multi(mp: MultiPolygon<f64>) -> Geometry<f64> {
    match <[Polygon<f64>; 1]>::try_from(mp.0) {
        Ok([polygon]) => Geometry::Polygon(polygon),
        Err(polygons) => Geometry::MultiPolygon(MultiPolygon(polygons)),
    }
}

impl GeometryOps for PlanarGeometryOps {
    fn buffer(
        &self,
        geometry: &Geometry<f64>,
        distance_m: f64,
    ) -> Result<Geometry<f64>, GeometryError> {
        let bbox = self.bbox(geometry).ok_or(GeometryError::Empty)?;
        if distance_m == 0.0 {
            return Ok(geometry.clone());
        }

        let frame = LocalFrame::around(&bbox);
        let buffered = frame.to_metres(geometry).buffer(distance_m);
        if buffered.0.is_empty() {
            return Err(GeometryError::Empty);
        }

        Ok(simplify_multi(frame.to_degrees(&buffered)))
    }

    fn dissolve(&self, geometries: &[Geometry<f64>]) -> Result<Geometry<f64>, GeometryError> {
        let mut parts = geometries.iter().map(into_multi_polygon);
        let first = parts.next().ok_or(GeometryError::Empty)??;
        let merged = parts.try_fold(first, |acc, next| Ok::<_, GeometryError>(acc.union(&next?)))?;
        Ok(simplify_multi(merged))
    }

    fn intersects(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
        a.intersects(b)
    }

    fn bbox(&self, geometry: &Geometry<f64>) -> Option<BBox> {
        BBox::of_geometry(geometry)
    }

    fn reproject(
        &self,
        geometry: Geometry<f64>,
        from_frame: &str,
        to_frame: &str,
    ) -> Result<Geometry<f64>, GeometryError> {
        if from_frame.eq_ignore_ascii_case(to_frame) {
            Ok(geometry)
        } else {
            Err(GeometryError::UnsupportedFrame {
                from: from_frame.to_string(),
                to: to_frame.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Contains, line_string, point, polygon};

    #[test]
    fn point_buffer_covers_expected_radius() {
        let ops = PlanarGeometryOps::new();
        let centre = Geometry::Point(point! { x: 12.5, y: 41.9 });
        let buffered = ops.buffer(&centre, 50.0).unwrap();
        let bbox = ops.bbox(&buffered).unwrap();

        // 50 m is ~0.00045 degrees of latitude.
        let half_height = bbox.delta_lat() / 2.0;
        assert!((half_height - 50.0 / METRES_PER_DEGREE).abs() < 2e-5);
        assert!(buffered.contains(&point! { x: 12.5, y: 41.9 }));
        assert!(!ops.intersects(&buffered, &Geometry::Point(point! { x: 12.51, y: 41.9 })));
    }

    #[test]
    fn zero_buffer_returns_the_input() {
        let ops = PlanarGeometryOps::new();
        let line = Geometry::LineString(line_string![(x: 9.0, y: 45.0), (x: 9.01, y: 45.0)]);
        assert_eq!(ops.buffer(&line, 0.0).unwrap(), line);
    }

    #[test]
    fn line_buffer_is_polygonal() {
        let ops = PlanarGeometryOps::new();
        let line = Geometry::LineString(line_string![(x: 9.0, y: 45.0), (x: 9.01, y: 45.0)]);
        let buffered = ops.buffer(&line, 20.0).unwrap();
        assert!(matches!(buffered, Geometry::Polygon(_)));
        let bbox = ops.bbox(&buffered).unwrap();
        assert!(bbox.min_lon < 9.0 && bbox.max_lon > 9.01);
    }

    #[test]
    fn dissolve_merges_overlapping_polygons() {
        let ops = PlanarGeometryOps::new();
        let a = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)
        ]);
        let b = Geometry::Polygon(polygon![
            (x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)
        ]);
        let c = Geometry::Polygon(polygon![
            (x: 10.0, y: 10.0), (x: 11.0, y: 10.0), (x: 11.0, y: 11.0), (x: 10.0, y: 11.0)
        ]);

        let merged = ops.dissolve(&[a.clone(), b]).unwrap();
        assert!(matches!(merged, Geometry::Polygon(_)));

        let disjoint = ops.dissolve(&[a, c]).unwrap();
        match disjoint {
            Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 2),
            other => panic!("expected MultiPolygon, got {other:?}"),
        }
    }

    #[test]
    fn dissolve_rejects_empty_and_non_polygonal_input() {
        let ops = PlanarGeometryOps::new();
        assert_eq!(ops.dissolve(&[]), Err(GeometryError::Empty));
        assert!(matches!(
            ops.dissolve(&[Geometry::Point(point! { x: 0.0, y: 0.0 })]),
            Err(GeometryError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn reproject_only_accepts_identical_frames() {
        let ops = PlanarGeometryOps::new();
        let g = Geometry::Point(point! { x: 1.0, y: 2.0 });
        assert_eq!(
            ops.reproject(g.clone(), "EPSG:6706", "epsg:6706"),
            Ok(g.clone())
        );
        assert!(matches!(
            ops.reproject(g, "EPSG:3857", "EPSG:6706"),
            Err(GeometryError::UnsupportedFrame { .. })
        ));
    }
}
