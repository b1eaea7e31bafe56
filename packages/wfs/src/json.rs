//! `GeoJSON` `FeatureCollection` parsing for services offering
//! `outputFormat=application/json`.
//!
//! Positions are longitude first as `GeoJSON` requires. A feature's `id`
//! member becomes the `gml_id` field so identity deduplication works the
//! same as for GML responses.

use geojson::{GeoJson, feature::Id};
use parcel_wfs_parcel_models::{
    AttributeValue, Attributes, FeatureRecord, FieldDef, FieldType, GeometryKind, SchemaInfo,
};

use crate::{FetchError, TileBatch};

/// Parses a `GeoJSON` `FeatureCollection`.
///
/// Field types come from the first non-null value of each property and
/// default to text.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the body is not a `GeoJSON` feature
/// collection or a geometry cannot be converted.
pub fn parse_feature_collection(body: &str, frame: &str) -> Result<TileBatch, FetchError> {
    let geojson: GeoJson = body
        .parse()
        .map_err(|e| FetchError::parse(format!("Invalid GeoJSON: {e}")))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(FetchError::parse("Expected a GeoJSON FeatureCollection"));
    };

    // Field plus whether its type came from a non-null value.
    let mut fields: Vec<(FieldDef, bool)> = Vec::new();
    let mut features = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let mut attributes = Attributes::new();

        if let Some(id) = &feature.id {
            let value = match id {
                Id::String(s) => AttributeValue::from(s.as_str()),
                Id::Number(n) => AttributeValue::from_json(&serde_json::Value::Number(n.clone())),
            };
            attributes.insert("gml_id", value);
        }

        for (name, value) in feature.properties.iter().flatten() {
            attributes.insert(name.clone(), AttributeValue::from_json(value));
        }

        for (name, value) in attributes.iter() {
            let inferred = value.field_type();
            match fields.iter_mut().find(|(f, _)| f.name == name) {
                Some((field, typed)) => {
                    if !*typed && let Some(field_type) = inferred {
                        field.field_type = field_type;
                        *typed = true;
                    }
                }
                None => fields.push((
                    FieldDef::new(name, inferred.unwrap_or(FieldType::Text)),
                    inferred.is_some(),
                )),
            }
        }

        let geometry = feature
            .geometry
            .map(|g| {
                geo::Geometry::<f64>::try_from(g)
                    .map_err(|e| FetchError::parse(format!("Invalid geometry: {e}")))
            })
            .transpose()?;

        features.push(FeatureRecord::new(geometry, attributes));
    }

    if features.is_empty() {
        return Ok(TileBatch::empty());
    }

    let geometry_kind = features
        .iter()
        .find_map(|f| f.geometry.as_ref())
        .map_or(GeometryKind::Unknown, GeometryKind::of);

    Ok(TileBatch {
        features,
        schema: Some(SchemaInfo {
            fields: fields.into_iter().map(|(f, _)| f).collect(),
            geometry_kind,
            coordinate_frame: frame.to_string(),
        }),
    })
}
