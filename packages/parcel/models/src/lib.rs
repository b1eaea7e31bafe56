#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for tiled parcel downloads.
//!
//! Defines the geographic [`BBox`] and grid [`Tile`], the
//! [`FeatureRecord`] produced by parsing a WFS response together with its
//! [`SchemaInfo`], the per-feature duplicate tags produced by geometry
//! deduplication, and the TOML configuration schema shared by every stage
//! of the download pipeline.

pub mod config;
pub mod wkt;

use std::{collections::BTreeSet, fmt};

use geo::{BoundingRect, Geometry, Polygon, Rect, coord};
use serde::{Deserialize, Serialize};

/// A bounding box in the service's geographic frame (decimal degrees).
///
/// Latitude is the `y` axis and longitude the `x` axis when converted to
/// `geo` types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl BBox {
    /// Creates a bounding box from its four edges, in the
    /// `(min_lat, min_lon, max_lat, max_lon)` order the WFS `bbox`
    /// parameter uses.
    #[must_use]
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Builds the box spanned by two arbitrary corners given as
    /// `(lat, lon)` pairs, ordering each axis.
    #[must_use]
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self::new(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
    }

    /// Converts a `geo` rectangle (x = longitude, y = latitude).
    #[must_use]
    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self::new(rect.min().y, rect.min().x, rect.max().y, rect.max().x)
    }

    /// Returns the bounding box of a geometry, or `None` when the
    /// geometry is empty.
    #[must_use]
    pub fn of_geometry(geometry: &Geometry<f64>) -> Option<Self> {
        geometry.bounding_rect().map(Self::from_rect)
    }

    /// Returns `true` when every edge is finite and `min <= max` holds on
    /// both axes.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.min_lon, self.max_lat, self.max_lon]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
    }

    /// Latitude span in degrees.
    #[must_use]
    pub fn delta_lat(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude span in degrees.
    #[must_use]
    pub fn delta_lon(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Mean latitude, used by the equirectangular area estimate.
    #[must_use]
    pub fn mean_lat(&self) -> f64 {
        f64::midpoint(self.min_lat, self.max_lat)
    }

    /// The box as a `geo` rectangle.
    #[must_use]
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_lon, y: self.min_lat },
            coord! { x: self.max_lon, y: self.max_lat },
        )
    }

    /// The box as a closed polygon, suitable for intersection tests.
    #[must_use]
    pub fn to_polygon(&self) -> Polygon<f64> {
        self.to_rect().to_polygon()
    }

    /// Expands the box by `margin` degrees on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self::new(
            self.min_lat - margin,
            self.min_lon - margin,
            self.max_lat + margin,
            self.max_lon + margin,
        )
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.7},{:.7},{:.7},{:.7}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

/// One cell of a grid partition of a parent [`BBox`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Position in row-major order within the full grid.
    pub index: usize,
    /// Zero-based grid row (south to north).
    pub row: usize,
    /// Zero-based grid column (west to east).
    pub col: usize,
    /// Extent of the cell.
    pub bbox: BBox,
}

/// Value of a single feature attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Missing value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Real(f64),
    /// Text value.
    Text(String),
}

impl AttributeValue {
    /// Converts a JSON scalar. Arrays and objects are kept as their JSON
    /// text.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Real))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Converts back to a JSON scalar.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Real(r) => serde_json::Number::from_f64(*r)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Key used for identity comparisons. `Null` maps to `None`, which is
    /// itself a valid key: two null identities are considered equal.
    ///
    /// Values are compared by their text form, so `Integer(5)` and
    /// `Text("5")` are the same identity. A `Text` append target stores
    /// incoming integers as text, and existing records must still match
    /// the features that produced them.
    #[must_use]
    pub fn identity_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Returns the text content when this is a non-empty `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// The [`FieldType`] this value naturally belongs to, if any.
    #[must_use]
    pub const fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(FieldType::Boolean),
            Self::Integer(_) => Some(FieldType::Integer),
            Self::Real(_) => Some(FieldType::Real),
            Self::Text(_) => Some(FieldType::Text),
        }
    }

    /// Returns `true` for [`AttributeValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered attribute mapping of one feature.
///
/// Keeps insertion order so that records written out preserve the field
/// order of the source schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, AttributeValue)>);

impl Attributes {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets `name` to `value`, replacing any previous value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    /// Looks up a value by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, AttributeValue)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// A single feature returned by the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    /// Feature geometry in the service frame. `None` when the response
    /// carried no geometry for this feature.
    pub geometry: Option<Geometry<f64>>,
    /// Attribute values keyed by schema field name.
    pub attributes: Attributes,
}

impl FeatureRecord {
    /// Creates a record from a geometry and attributes.
    #[must_use]
    pub const fn new(geometry: Option<Geometry<f64>>, attributes: Attributes) -> Self {
        Self {
            geometry,
            attributes,
        }
    }

    /// Returns the geometry when present and non-empty.
    #[must_use]
    pub fn usable_geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry
            .as_ref()
            .filter(|g| g.bounding_rect().is_some())
    }

    /// Attribute value for `name`, or [`AttributeValue::Null`] when absent.
    #[must_use]
    pub fn attribute(&self, name: &str) -> &AttributeValue {
        self.attributes.get(name).unwrap_or(&AttributeValue::Null)
    }
}

/// Type of a schema field.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Real,
    /// Boolean.
    Boolean,
}

/// Definition of one schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name as reported by the service.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDef {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Geometry type of a feature collection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum GeometryKind {
    /// `Point`.
    Point,
    /// `LineString`.
    LineString,
    /// `Polygon`.
    Polygon,
    /// `MultiPoint`.
    MultiPoint,
    /// `MultiLineString`.
    MultiLineString,
    /// `MultiPolygon`.
    MultiPolygon,
    /// Mixed or unknown geometry type.
    Unknown,
}

impl GeometryKind {
    /// Classifies a geometry.
    #[must_use]
    pub const fn of(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) => Self::Point,
            Geometry::LineString(_) | Geometry::Line(_) => Self::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => Self::Polygon,
            Geometry::MultiPoint(_) => Self::MultiPoint,
            Geometry::MultiLineString(_) => Self::MultiLineString,
            Geometry::MultiPolygon(_) => Self::MultiPolygon,
            Geometry::GeometryCollection(_) => Self::Unknown,
        }
    }
}

/// Field layout, geometry type, and coordinate frame of one download
/// session.
///
/// Captured from the first successfully parsed tile and assumed uniform
/// across all tiles of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    /// Field definitions in source order.
    pub fields: Vec<FieldDef>,
    /// Geometry type of the features.
    pub geometry_kind: GeometryKind,
    /// Coordinate frame identifier (e.g. `"EPSG:6706"`).
    pub coordinate_frame: String,
}

impl SchemaInfo {
    /// Position of the field named exactly `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolves `name` to the schema's own spelling: exact match first,
    /// then ASCII case-insensitive.
    #[must_use]
    pub fn resolve_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
    }

    /// Returns `true` if the schema has a field resolvable as `name`.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.resolve_field(name).is_some()
    }
}

/// Geometry-coincidence tag for one surviving feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateTag {
    /// `true` when at least one other survivor has the same canonical
    /// geometry.
    pub is_geometry_duplicate: bool,
    /// 1-based group shared by all members of a duplicate group.
    pub group_id: Option<u32>,
}

impl DuplicateTag {
    /// Tag of a feature whose geometry is unique.
    pub const UNIQUE: Self = Self {
        is_geometry_duplicate: false,
        group_id: None,
    };

    /// Tag of a member of duplicate group `group_id`.
    #[must_use]
    pub const fn duplicate(group_id: u32) -> Self {
        Self {
            is_geometry_duplicate: true,
            group_id: Some(group_id),
        }
    }
}

/// Duplicate tags indexed by feature position in the survivor list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    tags: Vec<DuplicateTag>,
}

impl DedupOutcome {
    /// Wraps tags aligned with a survivor list.
    #[must_use]
    pub const fn new(tags: Vec<DuplicateTag>) -> Self {
        Self { tags }
    }

    /// An outcome tagging `len` features as unique.
    #[must_use]
    pub fn all_unique(len: usize) -> Self {
        Self::new(vec![DuplicateTag::UNIQUE; len])
    }

    /// Tag of the feature at `index`. Indices without a tag are unique.
    #[must_use]
    pub fn tag(&self, index: usize) -> DuplicateTag {
        self.tags.get(index).copied().unwrap_or(DuplicateTag::UNIQUE)
    }

    /// All tags in survivor order.
    #[must_use]
    pub fn tags(&self) -> &[DuplicateTag] {
        &self.tags
    }

    /// Number of tagged features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` when no features are tagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of features flagged as geometry duplicates.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.tags.iter().filter(|t| t.is_geometry_duplicate).count()
    }

    /// Number of distinct duplicate groups among the tagged features.
    ///
    /// Filters keep group ids unchanged, so ids may have gaps.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.tags
            .iter()
            .filter_map(|t| t.group_id)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

impl FromIterator<DuplicateTag> for DedupOutcome {
    fn from_iter<I: IntoIterator<Item = DuplicateTag>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
