//! Reading selections from the command line and from `GeoJSON` files.

use std::path::Path;

use geo::{Geometry, Point};
use geojson::GeoJson;

/// Parses `"lat,lon"`.
///
/// # Errors
///
/// Returns a message if the value is not two comma-separated numbers.
pub fn parse_lat_lon(value: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{s}': {e}"))
    };
    Ok((parse(lat)?, parse(lon)?))
}

/// Reads every geometry of a `GeoJSON` file, whatever its top-level type.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid `GeoJSON`.
pub fn read_geometries(path: &Path) -> Result<Vec<Geometry<f64>>, Box<dyn std::error::Error>> {
    let geojson: GeoJson = std::fs::read_to_string(path)?.parse()?;
    let collection: geo::GeometryCollection<f64> = geojson::quick_collection(&geojson)?;
    log::debug!("Read {} geometries from {}", collection.0.len(), path.display());
    Ok(collection.0)
}

/// Extracts points, flattening multi-points and ignoring other types.
#[must_use]
pub fn points_of(geometries: Vec<Geometry<f64>>) -> Vec<Point<f64>> {
    geometries
        .into_iter()
        .flat_map(|g| match g {
            Geometry::Point(p) => vec![p],
            Geometry::MultiPoint(mp) => mp.0,
            _ => Vec::new(),
        })
        .collect()
}
