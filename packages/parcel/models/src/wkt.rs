//! Canonical WKT rendering at a fixed decimal precision.
//!
//! Two geometries that render to the same string are considered
//! coincident by the geometry deduplication phase, so the output must be
//! stable: numbers are rounded to `precision` decimals, trailing zeros are
//! stripped and negative zero is normalized.

use std::fmt::Write as _;

use geo::{Coord, Geometry, LineString, Polygon};

/// Renders `geometry` as WKT with coordinates rounded to `precision`
/// decimal places.
#[must_use]
pub fn canonical_wkt(geometry: &Geometry<f64>, precision: usize) -> String {
    let mut out = String::new();
    write_geometry(&mut out, geometry, precision);
    out
}

fn write_geometry(out: &mut String, geometry: &Geometry<f64>, precision: usize) {
    match geometry {
        Geometry::Point(p) => {
            out.push_str("Point (");
            write_coord(out, p.0, precision);
            out.push(')');
        }
        Geometry::Line(line) => {
            out.push_str("LineString (");
            write_coord(out, line.start, precision);
            out.push_str(", ");
            write_coord(out, line.end, precision);
            out.push(')');
        }
        Geometry::LineString(ls) => {
            out.push_str("LineString ");
            write_ring(out, ls, precision);
        }
        Geometry::Polygon(p) => {
            out.push_str("Polygon ");
            write_polygon(out, p, precision);
        }
        Geometry::Rect(r) => write_geometry(out, &Geometry::Polygon(r.to_polygon()), precision),
        Geometry::Triangle(t) => {
            write_geometry(out, &Geometry::Polygon(t.to_polygon()), precision);
        }
        Geometry::MultiPoint(mp) => {
            out.push_str("MultiPoint (");
            for (i, p) in mp.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('(');
                write_coord(out, p.0, precision);
                out.push(')');
            }
            out.push(')');
        }
        Geometry::MultiLineString(mls) => {
            out.push_str("MultiLineString (");
            for (i, ls) in mls.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_ring(out, ls, precision);
            }
            out.push(')');
        }
        Geometry::MultiPolygon(mp) => {
            out.push_str("MultiPolygon (");
            for (i, p) in mp.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_polygon(out, p, precision);
            }
            out.push(')');
        }
        Geometry::GeometryCollection(gc) => {
            out.push_str("GeometryCollection (");
            for (i, g) in gc.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_geometry(out, g, precision);
            }
            out.push(')');
        }
    }
}

fn write_polygon(out: &mut String, polygon: &Polygon<f64>, precision: usize) {
    out.push('(');
    write_ring(out, polygon.exterior(), precision);
    for interior in polygon.interiors() {
        out.push_str(", ");
        write_ring(out, interior, precision);
    }
    out.push(')');
}

fn write_ring(out: &mut String, ring: &LineString<f64>, precision: usize) {
    out.push('(');
    for (i, c) in ring.0.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coord(out, *c, precision);
    }
    out.push(')');
}

fn write_coord(out: &mut String, coord: Coord<f64>, precision: usize) {
    out.push_str(&format_number(coord.x, precision));
    out.push(' ');
    out.push_str(&format_number(coord.y, precision));
}

/// Formats `value` with at most `precision` decimals.
#[must_use]
pub fn format_number(value: f64, precision: usize) -> String {
    let mut s = String::new();
    let _ = write!(s, "{value:.precision$}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.');
        s.truncate(trimmed.len());
    }
    if s == "-0" {
        s.remove(0);
    }
    s
}
