//! `GeoJSON` persistence of result collections.
//!
//! A collection is stored as one `FeatureCollection` whose foreign
//! members carry the collection `name` and its full `schema`, so field
//! order and types survive a round trip even when every value of a field
//! is null.

use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use parcel_wfs_parcel_models::{AttributeValue, Attributes, FeatureRecord, SchemaInfo};

use crate::{ResultCollection, SinkError, coerce};

const NAME_MEMBER: &str = "name";
const SCHEMA_MEMBER: &str = "schema";

/// File path for a collection called `name` inside `dir`.
///
/// Characters other than ASCII alphanumerics, `-` and `_` become `_`.
#[must_use]
pub fn collection_path(dir: &Path, name: &str) -> PathBuf {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{stem}.geojson"))
}

/// Returns `true` if a collection file exists at `path`.
#[must_use]
pub fn exists(path: &Path) -> bool {
    path.is_file()
}

/// Writes `collection` to `path`, replacing any previous file.
///
/// # Errors
///
/// * If the collection is inconsistent
/// * If the file cannot be written
pub fn save(collection: &ResultCollection, path: &Path) -> Result<(), SinkError> {
    collection.validate()?;

    let features = collection
        .records
        .iter()
        .map(|record| {
            let properties: JsonObject = record
                .attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect();
            Feature {
                bbox: None,
                geometry: record
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let mut members = JsonObject::new();
    members.insert(
        NAME_MEMBER.to_string(),
        serde_json::Value::String(collection.name.clone()),
    );
    members.insert(
        SCHEMA_MEMBER.to_string(),
        serde_json::to_value(&collection.schema)?,
    );

    let fc = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(members),
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&fc)?)?;

    log::debug!(
        "Saved {} records of '{}' to {}",
        collection.records.len(),
        collection.name,
        path.display()
    );
    Ok(())
}

/// Reads a collection written by [`save`].
///
/// # Errors
///
/// * If the file cannot be read
/// * If it is not a `GeoJSON` `FeatureCollection` with `name` and
///   `schema` members
/// * If a record does not match the stored schema
pub fn load(path: &Path) -> Result<ResultCollection, SinkError> {
    let text = std::fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse().map_err(|e| SinkError::InvalidFile {
        message: format!("{}: {e}", path.display()),
    })?;
    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(invalid(path, "not a FeatureCollection"));
    };

    let members = fc.foreign_members.unwrap_or_default();
    let name = members
        .get(NAME_MEMBER)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| invalid(path, "missing collection name"))?
        .to_string();
    let schema: SchemaInfo = serde_json::from_value(
        members
            .get(SCHEMA_MEMBER)
            .cloned()
            .ok_or_else(|| invalid(path, "missing collection schema"))?,
    )?;

    let records = fc
        .features
        .into_iter()
        .map(|feature| {
            let geometry = feature
                .geometry
                .map(geo::Geometry::<f64>::try_from)
                .transpose()
                .map_err(|e| invalid(path, &format!("invalid geometry: {e}")))?;
            let properties = feature.properties.unwrap_or_default();
            let attributes: Attributes = schema
                .fields
                .iter()
                .map(|field| {
                    let value = properties
                        .get(&field.name)
                        .map_or(AttributeValue::Null, AttributeValue::from_json);
                    (field.name.clone(), coerce(value, field.field_type))
                })
                .collect();
            Ok(FeatureRecord::new(geometry, attributes))
        })
        .collect::<Result<Vec<_>, SinkError>>()?;

    let collection = ResultCollection {
        name,
        schema,
        records,
    };
    collection.validate()?;
    Ok(collection)
}

fn invalid(path: &Path, message: &str) -> SinkError {
    SinkError::InvalidFile {
        message: format!("{}: {message}", path.display()),
    }
}
