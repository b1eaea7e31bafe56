#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request tiling for area-limited feature services.
//!
//! The remote service rejects or truncates requests covering too large an
//! area, so an area of interest is split into a near-square grid of
//! equal-angular-size cells whose estimated area stays under a ceiling.
//!
//! Areas are estimated with an equirectangular approximation (111 km per
//! degree, longitude scaled by the cosine of the mean latitude). It is
//! adequate for small to moderate areas at non-polar latitudes and is kept
//! as-is: changing it would change tile counts.

use parcel_wfs_parcel_models::{BBox, Tile};
use thiserror::Error;

/// Kilometres per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.0;

/// Errors that can occur while computing a tile grid.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    /// The bounding box has non-finite or inverted edges.
    #[error("Invalid bounding box: {bbox:?}")]
    InvalidBBox {
        /// The offending box.
        bbox: BBox,
    },

    /// The area ceiling is not a positive finite number.
    #[error("Invalid maximum tile area: {max_cell_area} km²")]
    InvalidCeiling {
        /// The offending ceiling.
        max_cell_area: f64,
    },
}

/// Estimated area of `bbox` in km².
#[must_use]
pub fn estimate_area_km2(bbox: &BBox) -> f64 {
    let km_per_lon = KM_PER_DEGREE * bbox.mean_lat().to_radians().cos();
    (bbox.delta_lat() * KM_PER_DEGREE) * (bbox.delta_lon() * km_per_lon)
}

/// Dimensions of a tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    /// Number of rows (latitude bands).
    pub rows: usize,
    /// Number of columns (longitude bands).
    pub cols: usize,
}

impl GridShape {
    /// Total number of cells.
    #[must_use]
    pub const fn cells(&self) -> usize {
        self.rows * self.cols
    }
}

/// Chooses the grid shape for an area of `area_km2` under a ceiling of
/// `max_cell_area` km² per cell.
///
/// Returns a single cell when the area fits, otherwise the near-square
/// grid `cols = ceil(sqrt(n))`, `rows = ceil(n / cols)` where
/// `n = ceil(area / ceiling)`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn grid_shape(area_km2: f64, max_cell_area: f64) -> GridShape {
    if area_km2 <= max_cell_area {
        return GridShape { rows: 1, cols: 1 };
    }

    let cells_needed = (area_km2 / max_cell_area).ceil() as usize;
    let cols = (cells_needed as f64).sqrt().ceil() as usize;
    let rows = cells_needed.div_ceil(cols);

    GridShape { rows, cols }
}

/// Splits `bbox` into tiles whose estimated area does not exceed
/// `max_cell_area` km².
///
/// Tiles are returned in row-major order starting from the south-west
/// corner. Edges are computed from the parent box so that adjacent tiles
/// share edges exactly and the last row and column end on the parent's
/// maximum edges.
///
/// # Errors
///
/// Returns [`GridError`] if the box is invalid or the ceiling is not a
/// positive finite number.
#[allow(clippy::cast_precision_loss)]
pub fn compute_grid(bbox: &BBox, max_cell_area: f64) -> Result<Vec<Tile>, GridError> {
    if !bbox.is_valid() {
        return Err(GridError::InvalidBBox { bbox: *bbox });
    }
    if !(max_cell_area.is_finite() && max_cell_area > 0.0) {
        return Err(GridError::InvalidCeiling { max_cell_area });
    }

    let area = estimate_area_km2(bbox);
    let shape = grid_shape(area, max_cell_area);

    if shape.cells() == 1 {
        log::debug!("Area ~{area:.2} km² fits in a single tile");
        return Ok(vec![Tile {
            index: 0,
            row: 0,
            col: 0,
            bbox: *bbox,
        }]);
    }

    let step_lat = bbox.delta_lat() / shape.rows as f64;
    let step_lon = bbox.delta_lon() / shape.cols as f64;

    let lat_edge = |i: usize| {
        if i == shape.rows {
            bbox.max_lat
        } else {
            step_lat.mul_add(i as f64, bbox.min_lat)
        }
    };
    let lon_edge = |i: usize| {
        if i == shape.cols {
            bbox.max_lon
        } else {
            step_lon.mul_add(i as f64, bbox.min_lon)
        }
    };

    let mut tiles = Vec::with_capacity(shape.cells());
    for row in 0..shape.rows {
        for col in 0..shape.cols {
            tiles.push(Tile {
                index: tiles.len(),
                row,
                col,
                bbox: BBox::new(lat_edge(row), lon_edge(col), lat_edge(row + 1), lon_edge(col + 1)),
            });
        }
    }

    log::info!("Tiling: total area ~{area:.1} km²");
    log::info!(
        "Tiling: grid {} rows x {} cols = {} tiles",
        shape.rows,
        shape.cols,
        tiles.len()
    );
    log::info!("Tiling: ~{:.2} km² per tile", area / tiles.len() as f64);

    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A box at the equator with the requested area, 1 degree tall.
    fn equatorial_box(area_km2: f64) -> BBox {
        let height_deg = 1.0;
        let width_deg = area_km2 / (KM_PER_DEGREE * KM_PER_DEGREE);
        BBox::new(-height_deg / 2.0, 0.0, height_deg / 2.0, width_deg)
    }

    #[test]
    fn estimates_area_with_cosine_scaling() {
        let bbox = BBox::new(59.5, 10.0, 60.5, 11.0);
        let expected = 111.0 * 111.0 * 60f64.to_radians().cos();
        assert!((estimate_area_km2(&bbox) - expected).abs() < 1e-6);
    }

    #[test]
    fn small_bbox_is_a_single_tile() {
        let bbox = BBox::new(45.0, 9.0, 45.01, 9.01);
        let tiles = compute_grid(&bbox, 4.0).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].bbox, bbox);
    }

    #[test]
    fn ten_km2_under_four_km2_ceiling_gives_two_by_two() {
        assert_eq!(grid_shape(10.0, 4.0), GridShape { rows: 2, cols: 2 });
        let tiles = compute_grid(&equatorial_box(10.0), 4.0).unwrap();
        assert_eq!(tiles.len(), 4);
    }

    #[test]
    fn near_square_shape_for_odd_counts() {
        // 7 cells -> 3 cols, 3 rows
        assert_eq!(grid_shape(6.5, 1.0), GridShape { rows: 3, cols: 3 });
        // 5 cells -> 3 cols, 2 rows
        assert_eq!(grid_shape(4.2, 1.0), GridShape { rows: 2, cols: 3 });
    }

    #[test]
    fn tiles_stay_under_ceiling() {
        let bbox = BBox::new(41.80, 12.40, 41.95, 12.60);
        let ceiling = 4.0;
        let tiles = compute_grid(&bbox, ceiling).unwrap();
        assert!(tiles.len() > 1);
        for tile in &tiles {
            assert!(
                estimate_area_km2(&tile.bbox) <= ceiling + 1e-9,
                "tile {} too large",
                tile.index
            );
        }
    }

    #[test]
    fn tiles_partition_the_parent_exactly() {
        let bbox = BBox::new(45.0, 9.0, 45.2, 9.3);
        let tiles = compute_grid(&bbox, 2.0).unwrap();
        let shape_cols = tiles.iter().map(|t| t.col).max().unwrap() + 1;

        // Row-major order with contiguous indices.
        for (i, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.index, i);
            assert_eq!(tile.row * shape_cols + tile.col, i);
        }

        // Union extent equals the parent.
        let min_lat = tiles.iter().map(|t| t.bbox.min_lat).fold(f64::MAX, f64::min);
        let max_lat = tiles.iter().map(|t| t.bbox.max_lat).fold(f64::MIN, f64::max);
        let min_lon = tiles.iter().map(|t| t.bbox.min_lon).fold(f64::MAX, f64::min);
        let max_lon = tiles.iter().map(|t| t.bbox.max_lon).fold(f64::MIN, f64::max);
        assert_eq!(BBox::new(min_lat, min_lon, max_lat, max_lon), bbox);

        // Neighbours share edges exactly, so cells never overlap.
        for a in &tiles {
            for b in &tiles {
                if a.row == b.row && b.col == a.col + 1 {
                    assert_eq!(a.bbox.max_lon.to_bits(), b.bbox.min_lon.to_bits());
                }
                if a.col == b.col && b.row == a.row + 1 {
                    assert_eq!(a.bbox.max_lat.to_bits(), b.bbox.min_lat.to_bits());
                }
            }
        }

        // Summed angular area equals the parent's.
        let summed: f64 = tiles
            .iter()
            .map(|t| t.bbox.delta_lat() * t.bbox.delta_lon())
            .sum();
        assert!((summed - bbox.delta_lat() * bbox.delta_lon()).abs() < 1e-12);
    }

    #[test]
    fn grid_is_deterministic() {
        let bbox = BBox::new(45.0, 9.0, 45.2, 9.3);
        assert_eq!(compute_grid(&bbox, 2.0), compute_grid(&bbox, 2.0));
    }

    #[test]
    fn rejects_inverted_bbox() {
        let bbox = BBox::new(45.2, 9.0, 45.0, 9.3);
        assert_eq!(
            compute_grid(&bbox, 4.0),
            Err(GridError::InvalidBBox { bbox })
        );
    }

    #[test]
    fn rejects_non_positive_ceiling() {
        let bbox = BBox::new(45.0, 9.0, 45.2, 9.3);
        assert!(matches!(
            compute_grid(&bbox, 0.0),
            Err(GridError::InvalidCeiling { .. })
        ));
    }
}
