//! Area-of-interest selection modes.
//!
//! Every interactive mode reduces to the same thing: a bounding box to
//! tile, an optional geometry to filter features (and skip tiles) with,
//! and for point selections an optional set of points each result must
//! contain.

use geo::{Geometry, Point};
use parcel_wfs_parcel_models::BBox;

use crate::{GeometryError, GeometryOps};

/// Largest accepted buffer distance for line and point selections.
pub const MAX_BUFFER_M: f64 = 100.0;

/// Resolved area of interest of one download session.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    /// Extent to tile.
    pub bbox: BBox,
    /// Geometry results must intersect.
    pub filter_geometry: Option<Geometry<f64>>,
    /// Points results must contain, one or more per result.
    pub containment_points: Option<Vec<Point<f64>>>,
    /// Base name of the created result collection.
    pub label: String,
}

/// Turns a user selection into an [`AreaOfInterest`].
pub trait AreaSelectionStrategy {
    /// Resolves the selection using `ops` for geometry work.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the selection is empty, has the wrong
    /// geometry type, or uses an out-of-range buffer distance.
    fn resolve(&self, ops: &dyn GeometryOps) -> Result<AreaOfInterest, GeometryError>;

    /// Base name for collections created from this selection.
    fn label(&self) -> String;
}

/// The four ways of choosing where to download.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaSelection {
    /// Rectangle dragged between two `(lat, lon)` corners.
    BBoxDraw {
        /// First corner.
        corner_a: (f64, f64),
        /// Opposite corner.
        corner_b: (f64, f64),
    },
    /// Existing polygons; their union is the filter geometry.
    PolygonPick {
        /// Selected polygons.
        polygons: Vec<Geometry<f64>>,
    },
    /// Existing lines buffered by a distance.
    LinePick {
        /// Selected lines.
        lines: Vec<Geometry<f64>>,
        /// Buffer distance in metres.
        buffer_m: f64,
    },
    /// Scattered points buffered by a distance.
    PointSet {
        /// Selected points.
        points: Vec<Point<f64>>,
        /// Buffer distance in metres.
        buffer_m: f64,
        /// Keep only parcels containing at least one of the points.
        per_point: bool,
    },
}

fn validate_buffer(distance_m: f64) -> Result<(), GeometryError> {
    if (0.0..=MAX_BUFFER_M).contains(&distance_m) {
        Ok(())
    } else {
        Err(GeometryError::InvalidBufferDistance {
            distance_m,
            max_m: MAX_BUFFER_M,
        })
    }
}

fn require_kind(
    geometries: &[Geometry<f64>],
    operation: &'static str,
    expected: &'static str,
    accept: fn(&Geometry<f64>) -> bool,
) -> Result<(), GeometryError> {
    if geometries.is_empty() {
        return Err(GeometryError::Empty);
    }
    if geometries.iter().all(accept) {
        Ok(())
    } else {
        Err(GeometryError::UnsupportedType {
            operation,
            expected,
        })
    }
}

/// Buffers every geometry and dissolves the results.
fn buffer_and_dissolve(
    ops: &dyn GeometryOps,
    geometries: &[Geometry<f64>],
    buffer_m: f64,
) -> Result<Geometry<f64>, GeometryError> {
    let buffers = geometries
        .iter()
        .map(|g| ops.buffer(g, buffer_m))
        .collect::<Result<Vec<_>, _>>()?;

    if buffer_m == 0.0 {
        // Unbuffered lines and points cannot be dissolved; keep them as a
        // collection.
        return Ok(match <[Geometry<f64>; 1]>::try_from(buffers) {
            Ok([single]) => single,
            Err(many) => Geometry::GeometryCollection(geo::GeometryCollection(many)),
        });
    }

    ops.dissolve(&buffers)
}

fn bbox_of(ops: &dyn GeometryOps, geometry: &Geometry<f64>) -> Result<BBox, GeometryError> {
    ops.bbox(geometry).ok_or(GeometryError::Empty)
}

impl AreaSelectionStrategy for AreaSelection {
    fn resolve(&self, ops: &dyn GeometryOps) -> Result<AreaOfInterest, GeometryError> {
        let aoi = match self {
            Self::BBoxDraw { corner_a, corner_b } => {
                let bbox = BBox::from_corners(*corner_a, *corner_b);
                if !bbox.is_valid() {
                    return Err(GeometryError::Empty);
                }
                AreaOfInterest {
                    bbox,
                    filter_geometry: None,
                    containment_points: None,
                    label: self.label(),
                }
            }
            Self::PolygonPick { polygons } => {
                require_kind(polygons, "polygon selection", "Polygon or MultiPolygon", |g| {
                    matches!(g, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
                })?;
                let filter = ops.dissolve(polygons)?;
                AreaOfInterest {
                    bbox: bbox_of(ops, &filter)?,
                    filter_geometry: Some(filter),
                    containment_points: None,
                    label: self.label(),
                }
            }
            Self::LinePick { lines, buffer_m } => {
                validate_buffer(*buffer_m)?;
                require_kind(lines, "line selection", "LineString or MultiLineString", |g| {
                    matches!(g, Geometry::LineString(_) | Geometry::MultiLineString(_))
                })?;
                let filter = buffer_and_dissolve(ops, lines, *buffer_m)?;
                AreaOfInterest {
                    bbox: bbox_of(ops, &filter)?,
                    filter_geometry: Some(filter),
                    containment_points: None,
                    label: self.label(),
                }
            }
            Self::PointSet {
                points,
                buffer_m,
                per_point,
            } => {
                validate_buffer(*buffer_m)?;
                let geometries: Vec<Geometry<f64>> =
                    points.iter().copied().map(Geometry::Point).collect();
                require_kind(&geometries, "point selection", "Point", |_| true)?;
                let filter = buffer_and_dissolve(ops, &geometries, *buffer_m)?;
                AreaOfInterest {
                    bbox: bbox_of(ops, &filter)?,
                    filter_geometry: Some(filter),
                    containment_points: per_point.then(|| points.clone()),
                    label: self.label(),
                }
            }
        };

        log::info!(
            "Area of interest ({}): bbox {}",
            aoi.label,
            aoi.bbox
        );

        Ok(aoi)
    }

    fn label(&self) -> String {
        match self {
            Self::BBoxDraw { .. } => "Parcels (BBox)".to_string(),
            Self::PolygonPick { .. } => "Parcels (Polygon)".to_string(),
            Self::LinePick { buffer_m, .. } => format!("Parcels (Line buffer {buffer_m} m)"),
            Self::PointSet { buffer_m, .. } => format!("Parcels (Points buffer {buffer_m} m)"),
        }
    }
}
