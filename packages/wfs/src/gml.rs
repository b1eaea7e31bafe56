//! WFS 2.0 / GML 3.2 `FeatureCollection` parsing.
//!
//! The document is read into a small element tree first, then each
//! `wfs:member` (or `gml:featureMember`) is turned into a
//! [`FeatureRecord`]:
//!
//! - the `gml:id` attribute becomes the `gml_id` field;
//! - simple properties become text fields named by their local name;
//! - nested simple properties are flattened to `<property>_<leaf>`
//!   (`inspireId/Identifier/localId` becomes `inspireId_localId`);
//! - the first geometry-valued property is the feature geometry, later
//!   ones are dropped.
//!
//! Every field is typed as text: GML carries no types without a separate
//! `DescribeFeatureType` request, and reference codes must keep leading
//! zeros.

use std::borrow::Cow;

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use parcel_wfs_parcel_models::{
    AttributeValue, Attributes, FeatureRecord, FieldDef, FieldType, GeometryKind, SchemaInfo,
    config::AxisOrder,
};
use quick_xml::{Reader, events::Event};

use crate::{FetchError, TileBatch};

/// Local names of GML geometry elements.
const GEOMETRY_ELEMENTS: &[&str] = &[
    "Point",
    "LineString",
    "Curve",
    "Polygon",
    "Surface",
    "MultiPoint",
    "MultiCurve",
    "MultiLineString",
    "MultiSurface",
    "MultiPolygon",
];

/// Minimal element tree node. Names are local names without prefixes.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn children_named<'a>(&'a self, names: &'a [&str]) -> impl Iterator<Item = &'a Self> {
        self.children
            .iter()
            .filter(move |c| names.contains(&c.name.as_str()))
    }

    fn is_geometry(&self) -> bool {
        GEOMETRY_ELEMENTS.contains(&self.name.as_str())
    }
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

fn open_element(start: &quick_xml::events::BytesStart<'_>) -> Result<Element, FetchError> {
    let mut element = Element {
        name: local_name(start.name().as_ref()),
        ..Element::default()
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| FetchError::parse(format!("Invalid attribute: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| FetchError::parse(format!("Invalid attribute value: {e}")))?;
        element
            .attributes
            .push((local_name(attr.key.as_ref()), value.into_owned()));
    }

    Ok(element)
}

fn read_tree(body: &str) -> Result<Element, FetchError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FetchError::parse(format!(
                "XML error at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::Empty(start) => {
                let element = open_element(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text: Cow<'_, str> = text
                        .unescape()
                        .map_err(|e| FetchError::parse(format!("Invalid text: {e}")))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| FetchError::parse("Unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(FetchError::parse("Unexpected end of document"));
    }

    root.ok_or_else(|| FetchError::parse("Empty document"))
}

/// Parses a `FeatureCollection` document.
///
/// `axis_order` gives the order of the two values of each position;
/// `frame` is recorded as the schema's coordinate frame.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the document is not well-formed, is
/// not a feature collection, or contains invalid coordinates.
pub fn parse_feature_collection(
    body: &str,
    axis_order: AxisOrder,
    frame: &str,
) -> Result<TileBatch, FetchError> {
    let root = read_tree(body)?;
    if root.name != "FeatureCollection" {
        return Err(FetchError::parse(format!(
            "Expected FeatureCollection, got {}",
            root.name
        )));
    }

    if let (Some(matched), Some(returned)) = (
        root.attribute("numberMatched"),
        root.attribute("numberReturned"),
    ) && matched != "unknown"
        && matched != returned
    {
        log::warn!("Service matched {matched} features but returned {returned}");
    }

    let mut features = Vec::new();
    for member in root.children_named(&["member", "featureMember", "featureMembers"]) {
        for feature_element in &member.children {
            features.push(parse_feature(feature_element, axis_order)?);
        }
    }

    if features.is_empty() {
        return Ok(TileBatch::empty());
    }

    let schema = infer_schema(&features, frame);
    Ok(TileBatch {
        features,
        schema: Some(schema),
    })
}

fn infer_schema(features: &[FeatureRecord], frame: &str) -> SchemaInfo {
    let mut fields: Vec<FieldDef> = Vec::new();
    for feature in features {
        for (name, _) in feature.attributes.iter() {
            if !fields.iter().any(|f| f.name == name) {
                fields.push(FieldDef::new(name, FieldType::Text));
            }
        }
    }

    let geometry_kind = features
        .iter()
        .find_map(|f| f.geometry.as_ref())
        .map_or(GeometryKind::Unknown, GeometryKind::of);

    SchemaInfo {
        fields,
        geometry_kind,
        coordinate_frame: frame.to_string(),
    }
}

fn parse_feature(element: &Element, axis_order: AxisOrder) -> Result<FeatureRecord, FetchError> {
    let mut attributes = Attributes::new();
    let mut geometry = None;

    if let Some(id) = element.attribute("id") {
        attributes.insert("gml_id", AttributeValue::from(id));
    }

    for property in &element.children {
        if let Some(geometry_element) = property.children.iter().find(|c| c.is_geometry()) {
            if geometry.is_none() {
                geometry = Some(parse_geometry(geometry_element, axis_order)?);
            }
            continue;
        }

        if property.children.is_empty() {
            attributes.insert(property.name.clone(), simple_value(property));
        } else {
            flatten_into(&mut attributes, &property.name, property);
        }
    }

    Ok(FeatureRecord::new(geometry, attributes))
}

fn simple_value(element: &Element) -> AttributeValue {
    let text = element.text.trim();
    if !text.is_empty() {
        return AttributeValue::from(text);
    }
    if element.attribute("nil") == Some("true") {
        return AttributeValue::Null;
    }
    element
        .attribute("href")
        .map_or(AttributeValue::Null, AttributeValue::from)
}

/// Adds every leaf below `element` as `<prefix>_<leaf>`.
fn flatten_into(attributes: &mut Attributes, prefix: &str, element: &Element) {
    for child in &element.children {
        if child.children.is_empty() {
            attributes.insert(format!("{prefix}_{}", child.name), simple_value(child));
        } else {
            flatten_into(attributes, prefix, child);
        }
    }
}

fn parse_geometry(element: &Element, axis_order: AxisOrder) -> Result<Geometry<f64>, FetchError> {
    let geometry = match element.name.as_str() {
        "Point" => {
            let coords = positions(element, axis_order)?;
            let coord = coords
                .first()
                .ok_or_else(|| FetchError::parse("Point without position"))?;
            Geometry::Point(Point(*coord))
        }
        "LineString" | "Curve" => Geometry::LineString(LineString::new(positions(element, axis_order)?)),
        "Polygon" => Geometry::Polygon(parse_polygon(element, axis_order)?),
        "Surface" => collapse_polygons(surface_polygons(element, axis_order)?),
        "MultiSurface" | "MultiPolygon" => {
            let mut polygons = Vec::new();
            for member in members(element, &["surfaceMember", "surfaceMembers", "polygonMember"]) {
                match parse_geometry(member, axis_order)? {
                    Geometry::Polygon(p) => polygons.push(p),
                    Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
                    other => {
                        return Err(FetchError::parse(format!(
                            "Unexpected surface member {:?}",
                            GeometryKind::of(&other)
                        )));
                    }
                }
            }
            Geometry::MultiPolygon(MultiPolygon(polygons))
        }
        "MultiCurve" | "MultiLineString" => {
            let lines = members(element, &["curveMember", "curveMembers", "lineStringMember"])
                .map(|m| positions(m, axis_order).map(LineString::new))
                .collect::<Result<Vec<_>, _>>()?;
            Geometry::MultiLineString(MultiLineString(lines))
        }
        "MultiPoint" => {
            let points = members(element, &["pointMember", "pointMembers"])
                .map(|m| positions(m, axis_order))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .map(Point)
                .collect();
            Geometry::MultiPoint(MultiPoint(points))
        }
        other => {
            return Err(FetchError::parse(format!("Unsupported geometry {other}")));
        }
    };

    Ok(geometry)
}

/// Geometry elements inside the member properties of a multi-geometry.
fn members<'a>(element: &'a Element, names: &'a [&str]) -> impl Iterator<Item = &'a Element> {
    element
        .children_named(names)
        .flat_map(|member| member.children.iter())
}

fn surface_polygons(element: &Element, axis_order: AxisOrder) -> Result<Vec<Polygon<f64>>, FetchError> {
    element
        .children_named(&["patches"])
        .flat_map(|patches| patches.children_named(&["PolygonPatch"]))
        .map(|patch| parse_polygon(patch, axis_order))
        .collect()
}

fn collapse_polygons(polygons: Vec<Polygon<f64>>) -> Geometry<f64> {
    match <[Polygon<f64>; 1]>::try_from(polygons) {
        Ok([polygon]) => Geometry::Polygon(polygon),
        Err(polygons) => Geometry::MultiPolygon(MultiPolygon(polygons)),
    }
}

fn parse_polygon(element: &Element, axis_order: AxisOrder) -> Result<Polygon<f64>, FetchError> {
    let exterior = element
        .children_named(&["exterior", "outerBoundaryIs"])
        .next()
        .ok_or_else(|| FetchError::parse(format!("{} without exterior ring", element.name)))?;

    let interiors = element
        .children_named(&["interior", "innerBoundaryIs"])
        .map(|ring| positions(ring, axis_order).map(LineString::new))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(
        LineString::new(positions(exterior, axis_order)?),
        interiors,
    ))
}

/// Collects every `pos`/`posList` below `element` in document order.
fn positions(element: &Element, axis_order: AxisOrder) -> Result<Vec<Coord<f64>>, FetchError> {
    let mut coords = Vec::new();
    collect_positions(element, axis_order, 2, &mut coords)?;
    Ok(coords)
}

fn collect_positions(
    element: &Element,
    axis_order: AxisOrder,
    inherited_dimension: usize,
    out: &mut Vec<Coord<f64>>,
) -> Result<(), FetchError> {
    let dimension = match element.attribute("srsDimension") {
        Some(value) => value
            .parse::<usize>()
            .ok()
            .filter(|d| *d >= 2)
            .ok_or_else(|| FetchError::parse(format!("Invalid srsDimension {value}")))?,
        None => inherited_dimension,
    };

    match element.name.as_str() {
        "pos" | "posList" => {
            let values = element
                .text
                .split_whitespace()
                .map(|v| {
                    v.parse::<f64>()
                        .map_err(|_| FetchError::parse(format!("Invalid coordinate {v}")))
                })
                .collect::<Result<Vec<_>, _>>()?;

            if values.len() % dimension != 0 {
                return Err(FetchError::parse(format!(
                    "{} has {} values for dimension {dimension}",
                    element.name,
                    values.len()
                )));
            }

            out.extend(values.chunks_exact(dimension).map(|tuple| match axis_order {
                AxisOrder::LatLon => Coord {
                    x: tuple[1],
                    y: tuple[0],
                },
                AxisOrder::LonLat => Coord {
                    x: tuple[0],
                    y: tuple[1],
                },
            }));
        }
        _ => {
            for child in &element.children {
                collect_positions(child, axis_order, dimension, out)?;
            }
        }
    }

    Ok(())
}
