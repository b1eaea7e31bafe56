#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result collections.
//!
//! A download ends in a [`ResultCollection`]: either a new one, named
//! after the selection mode and a timestamp, or an existing one being
//! appended to. Every record carries the source fields, the two
//! geometry-duplicate fields, and optionally the fields decoded from the
//! cadastral reference code.
//!
//! Appending checks the target's schema field by field and asks before
//! writing to a target with a reduced field set. It also skips features
//! whose identity value is already in the target, so repeated sessions
//! over the same area never insert a parcel twice.

pub mod cadastral;
pub mod store;

use std::collections::HashSet;

use parcel_wfs_download::interaction::Prompter;
use parcel_wfs_parcel_models::{
    AttributeValue, Attributes, DedupOutcome, DuplicateTag, FeatureRecord, FieldDef, FieldType,
    SchemaInfo, config::OutputConfig,
};
use thiserror::Error;

use crate::cadastral::CadastralCode;

/// Geometry-duplicate flag field.
pub const DUPLICATE_FLAG_FIELD: &str = "is_geometry_duplicate";
/// Geometry-duplicate group field.
pub const DUPLICATE_GROUP_FIELD: &str = "duplicate_group_id";

/// Errors that can occur while writing results.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The append target lacks fields and the reduced set was refused.
    #[error("Target collection is missing fields: {}", fields.join(", "))]
    SchemaMismatch {
        /// Missing or incompatible fields.
        fields: Vec<String>,
    },

    /// The append target uses another coordinate frame.
    #[error("Coordinate frame mismatch: target uses {target}, features use {incoming}")]
    FrameMismatch {
        /// Frame of the target.
        target: String,
        /// Frame of the new features.
        incoming: String,
    },

    /// The caller chose to abort.
    #[error("Append aborted: {reason}")]
    Aborted {
        /// What was declined.
        reason: String,
    },

    /// A record does not match its collection's schema.
    #[error("Inconsistent collection: {message}")]
    Inconsistent {
        /// Description of the inconsistency.
        message: String,
    },

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file is not a result collection.
    #[error("Invalid collection file: {message}")]
    InvalidFile {
        /// Description of what went wrong.
        message: String,
    },
}

/// A named set of records sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCollection {
    /// Collection name.
    pub name: String,
    /// Full field layout, synthetic fields included.
    pub schema: SchemaInfo,
    /// Records, each with exactly the schema's fields in schema order.
    pub records: Vec<FeatureRecord>,
}

impl ResultCollection {
    /// Checks that every record matches the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Inconsistent`] naming the first offending
    /// record.
    pub fn validate(&self) -> Result<(), SinkError> {
        for (i, record) in self.records.iter().enumerate() {
            check_record(&self.schema, record).map_err(|message| SinkError::Inconsistent {
                message: format!("record {i}: {message}"),
            })?;
        }
        Ok(())
    }

    /// Identity values present in the collection for `field`.
    #[must_use]
    pub fn identity_keys(&self, field: &str) -> HashSet<Option<String>> {
        self.records
            .iter()
            .map(|r| r.attribute(field).identity_key())
            .collect()
    }
}

fn check_record(schema: &SchemaInfo, record: &FeatureRecord) -> Result<(), String> {
    if record.attributes.len() != schema.fields.len() {
        return Err(format!(
            "{} attributes for {} fields",
            record.attributes.len(),
            schema.fields.len()
        ));
    }

    for ((name, value), field) in record.attributes.iter().zip(&schema.fields) {
        if name != field.name {
            return Err(format!("attribute '{name}' where '{}' expected", field.name));
        }
        if let Some(actual) = value.field_type()
            && actual != field.field_type
        {
            return Err(format!(
                "'{name}' holds {actual}, field is {}",
                field.field_type
            ));
        }
    }

    Ok(())
}

/// Converts `value` to `field_type`, or `Null` when it cannot be.
pub(crate) fn coerce(value: AttributeValue, field_type: FieldType) -> AttributeValue {
    match (value, field_type) {
        (AttributeValue::Null, _) => AttributeValue::Null,
        (v @ AttributeValue::Text(_), FieldType::Text)
        | (v @ AttributeValue::Integer(_), FieldType::Integer)
        | (v @ AttributeValue::Real(_), FieldType::Real)
        | (v @ AttributeValue::Bool(_), FieldType::Boolean) => v,
        #[allow(clippy::cast_precision_loss)]
        (AttributeValue::Integer(i), FieldType::Real) => AttributeValue::Real(i as f64),
        (AttributeValue::Text(s), FieldType::Integer) => {
            s.trim().parse().map_or(AttributeValue::Null, AttributeValue::Integer)
        }
        (AttributeValue::Text(s), FieldType::Real) => {
            s.trim().parse().map_or(AttributeValue::Null, AttributeValue::Real)
        }
        (AttributeValue::Text(s), FieldType::Boolean) => s
            .trim()
            .parse()
            .map_or(AttributeValue::Null, AttributeValue::Bool),
        (v, FieldType::Text) => AttributeValue::Text(v.to_string()),
        _ => AttributeValue::Null,
    }
}

/// How [`ResultSink::materialize`] writes its records.
#[derive(Debug)]
pub enum SinkMode<'a> {
    /// Build a new collection named `{base_name}_{timestamp}`.
    Create {
        /// Base name, usually from the selection mode.
        base_name: &'a str,
    },
    /// Extend an existing collection in place.
    Append {
        /// The collection to extend.
        target: &'a mut ResultCollection,
        /// Identity field of the new features, used to skip records the
        /// target already holds.
        identity_field: Option<&'a str>,
    },
}

/// Counters of one write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Name of the collection written to.
    pub collection_name: String,
    /// Records written.
    pub added: usize,
    /// Features skipped because the target already held their identity.
    pub skipped_existing: usize,
    /// Source fields the target could not hold.
    pub dropped_fields: Vec<String>,
    /// Cadastral code fields were filled in.
    pub expanded: bool,
}

/// Result of [`ResultSink::materialize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// A new collection.
    Created {
        /// The collection.
        collection: ResultCollection,
        /// Write counters.
        report: SinkReport,
    },
    /// Records appended to the target.
    Appended(SinkReport),
}

impl Materialized {
    /// Write counters.
    #[must_use]
    pub const fn report(&self) -> &SinkReport {
        match self {
            Self::Created { report, .. } | Self::Appended(report) => report,
        }
    }
}

/// Everything needed to turn one feature into a record.
struct RecordSource<'a> {
    schema: &'a SchemaInfo,
    reference_field: Option<&'a str>,
    expand: bool,
}

impl RecordSource<'_> {
    fn build(
        &self,
        feature: &FeatureRecord,
        tag: DuplicateTag,
        fields: &[FieldDef],
    ) -> FeatureRecord {
        let code = if self.expand {
            self.reference_field
                .and_then(|f| feature.attribute(f).as_text())
                .and_then(CadastralCode::parse)
        } else {
            None
        };

        let attributes: Attributes = fields
            .iter()
            .map(|field| {
                let value = match field.name.as_str() {
                    DUPLICATE_FLAG_FIELD => AttributeValue::Bool(tag.is_geometry_duplicate),
                    DUPLICATE_GROUP_FIELD => tag
                        .group_id
                        .map_or(AttributeValue::Null, |id| AttributeValue::Integer(id.into())),
                    name => match CadastralCode::value_of(code.as_ref(), name) {
                        Some(value) if self.expand => value,
                        _ => self
                            .schema
                            .resolve_field(name)
                            .map_or(AttributeValue::Null, |f| feature.attribute(&f.name).clone()),
                    },
                };
                (field.name.clone(), coerce(value, field.field_type))
            })
            .collect();

        FeatureRecord::new(feature.geometry.clone(), attributes)
    }
}

/// Writes deduplicated features into result collections.
pub struct ResultSink<'a> {
    output: &'a OutputConfig,
    prompter: &'a dyn Prompter,
}

impl<'a> ResultSink<'a> {
    /// Creates a sink asking `prompter` about schema compromises.
    #[must_use]
    pub const fn new(output: &'a OutputConfig, prompter: &'a dyn Prompter) -> Self {
        Self { output, prompter }
    }

    fn reference_field<'s>(&self, schema: &'s SchemaInfo) -> Option<&'s str> {
        let field = schema.resolve_field(&self.output.cadastral_reference_field);
        if field.is_none() && self.output.expand_cadastral_code {
            log::warn!(
                "Field '{}' not found; cadastral code fields will be empty",
                self.output.cadastral_reference_field
            );
        }
        field.map(|f| f.name.as_str())
    }

    /// Writes `features` according to `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if an append is refused or a record would
    /// not match its collection's schema.
    pub fn materialize(
        &self,
        features: &[FeatureRecord],
        schema: &SchemaInfo,
        outcome: &DedupOutcome,
        mode: SinkMode<'_>,
    ) -> Result<Materialized, SinkError> {
        match mode {
            SinkMode::Create { base_name } => {
                let (collection, report) = self.create(base_name, features, schema, outcome)?;
                Ok(Materialized::Created { collection, report })
            }
            SinkMode::Append {
                target,
                identity_field,
            } => self
                .append(target, features, schema, outcome, identity_field)
                .map(Materialized::Appended),
        }
    }

    /// Builds a new collection from `features`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Inconsistent`] if a record would not match
    /// the collection's schema.
    pub fn create(
        &self,
        base_name: &str,
        features: &[FeatureRecord],
        schema: &SchemaInfo,
        outcome: &DedupOutcome,
    ) -> Result<(ResultCollection, SinkReport), SinkError> {
        let expand = self.output.expand_cadastral_code;
        let mut fields = schema.fields.clone();
        let synthetic = [
            FieldDef::new(DUPLICATE_FLAG_FIELD, FieldType::Boolean),
            FieldDef::new(DUPLICATE_GROUP_FIELD, FieldType::Integer),
        ];
        let derived = if expand {
            CadastralCode::fields().to_vec()
        } else {
            Vec::new()
        };
        for field in synthetic.into_iter().chain(derived) {
            if !fields.iter().any(|f| f.name == field.name) {
                fields.push(field);
            }
        }

        let source = RecordSource {
            schema,
            reference_field: self.reference_field(schema),
            expand,
        };
        let records = features
            .iter()
            .enumerate()
            .map(|(i, f)| source.build(f, outcome.tag(i), &fields))
            .collect();

        let collection = ResultCollection {
            name: format!("{base_name}_{}", chrono::Local::now().format("%Y%m%d%H%M%S")),
            schema: SchemaInfo {
                fields,
                geometry_kind: schema.geometry_kind,
                coordinate_frame: schema.coordinate_frame.clone(),
            },
            records,
        };
        collection.validate()?;

        log::info!(
            "Created collection '{}' with {} features",
            collection.name,
            collection.records.len()
        );

        let report = SinkReport {
            collection_name: collection.name.clone(),
            added: collection.records.len(),
            expanded: expand,
            ..SinkReport::default()
        };
        Ok((collection, report))
    }

    /// Fields of `schema` (plus the duplicate fields) that `target`
    /// cannot hold, with a reason.
    fn missing_fields(target: &SchemaInfo, schema: &SchemaInfo) -> Vec<String> {
        let synthetic = [
            FieldDef::new(DUPLICATE_FLAG_FIELD, FieldType::Boolean),
            FieldDef::new(DUPLICATE_GROUP_FIELD, FieldType::Integer),
        ];

        schema
            .fields
            .iter()
            .chain(&synthetic)
            .filter_map(|field| match target.resolve_field(&field.name) {
                None => Some(field.name.clone()),
                Some(existing)
                    if existing.field_type != field.field_type
                        && !(existing.field_type == FieldType::Real
                            && field.field_type == FieldType::Integer)
                        && existing.field_type != FieldType::Text =>
                {
                    Some(format!(
                        "{} ({} instead of {})",
                        field.name, existing.field_type, field.field_type
                    ))
                }
                Some(_) => None,
            })
            .collect()
    }

    /// Appends `features` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the frames differ, the caller refuses a
    /// reduced field set or missing code fields, or a record would not
    /// match the target's schema.
    pub fn append(
        &self,
        target: &mut ResultCollection,
        features: &[FeatureRecord],
        schema: &SchemaInfo,
        outcome: &DedupOutcome,
        identity_field: Option<&str>,
    ) -> Result<SinkReport, SinkError> {
        if !target
            .schema
            .coordinate_frame
            .eq_ignore_ascii_case(&schema.coordinate_frame)
        {
            return Err(SinkError::FrameMismatch {
                target: target.schema.coordinate_frame.clone(),
                incoming: schema.coordinate_frame.clone(),
            });
        }

        let dropped_fields = Self::missing_fields(&target.schema, schema);
        if !dropped_fields.is_empty()
            && !self.prompter.ask_yes_no(
                "Schema mismatch",
                &format!(
                    "Collection '{}' cannot hold these fields: {}.\n\nAppend with the reduced field set?",
                    target.name,
                    dropped_fields.join(", ")
                ),
            )
        {
            return Err(SinkError::SchemaMismatch {
                fields: dropped_fields,
            });
        }

        let mut expand = self.output.expand_cadastral_code;
        if expand
            && !CadastralCode::fields()
                .iter()
                .all(|f| target.schema.index_of(&f.name).is_some())
        {
            if !self.prompter.ask_yes_no(
                "Cadastral fields missing",
                &format!(
                    "Collection '{}' has no section/sheet/attachment/development fields.\n\n\
                     Append without them?",
                    target.name
                ),
            ) {
                return Err(SinkError::Aborted {
                    reason: "target lacks cadastral code fields".to_string(),
                });
            }
            expand = false;
        }

        let identity = identity_field.and_then(|source_name| {
            let target_name = target.schema.resolve_field(source_name)?.name.clone();
            Some((source_name, target_name))
        });
        let mut existing = match &identity {
            Some((_, target_name)) => target.identity_keys(target_name),
            None => {
                log::warn!(
                    "No identity field shared with '{}'; existing records are not checked",
                    target.name
                );
                HashSet::new()
            }
        };

        let source = RecordSource {
            schema,
            reference_field: self.reference_field(schema),
            expand,
        };

        let mut new_records = Vec::new();
        let mut skipped_existing = 0;
        for (i, feature) in features.iter().enumerate() {
            if let Some((source_name, _)) = &identity
                && !existing.insert(feature.attribute(source_name).identity_key())
            {
                skipped_existing += 1;
                continue;
            }
            let record = source.build(feature, outcome.tag(i), &target.schema.fields);
            check_record(&target.schema, &record).map_err(|message| SinkError::Inconsistent {
                message: format!("feature {i}: {message}"),
            })?;
            new_records.push(record);
        }

        let added = new_records.len();
        target.records.extend(new_records);

        log::info!(
            "Appended {added} features to '{}' ({skipped_existing} already present)",
            target.name
        );

        Ok(SinkReport {
            collection_name: target.name.clone(),
            added,
            skipped_existing,
            dropped_fields,
            expanded: expand,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use geo::{Geometry, point};
    use parcel_wfs_parcel_models::GeometryKind;

    use super::*;
    use crate::cadastral::{ATTACHMENT_FIELD, SECTION_FIELD, SHEET_FIELD};

    struct ScriptedPrompter {
        answers: Mutex<Vec<bool>>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompter {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().rev().copied().collect()),
                asked: Mutex::new(Vec::new()),
            }
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask_yes_no(&self, title: &str, _message: &str) -> bool {
            self.asked.lock().unwrap().push(title.to_string());
            self.answers.lock().unwrap().pop().unwrap_or(false)
        }
    }

    fn source_schema() -> SchemaInfo {
        SchemaInfo {
            fields: vec![
                FieldDef::new("gml_id", FieldType::Text),
                FieldDef::new("label", FieldType::Text),
                FieldDef::new("NATIONALCADASTRALREFERENCE", FieldType::Text),
            ],
            geometry_kind: GeometryKind::MultiPolygon,
            coordinate_frame: "EPSG:6706".to_string(),
        }
    }

    fn parcel(id: &str, reference: &str) -> FeatureRecord {
        let attributes: Attributes = [
            ("gml_id", AttributeValue::from(id)),
            ("label", AttributeValue::from("12")),
            ("NATIONALCADASTRALREFERENCE", AttributeValue::from(reference)),
        ]
        .into_iter()
        .collect();
        FeatureRecord::new(Some(Geometry::Point(point! { x: 9.0, y: 45.0 })), attributes)
    }

    fn expanding() -> OutputConfig {
        OutputConfig {
            expand_cadastral_code: true,
            ..OutputConfig::default()
        }
    }

    #[test]
    fn create_adds_duplicate_fields_and_timestamped_name() {
        let output = OutputConfig::default();
        let prompter = ScriptedPrompter::new(&[]);
        let sink = ResultSink::new(&output, &prompter);
        let features = [parcel("a", "G273_0001A0.1"), parcel("b", "G273_0001A0.2")];
        let outcome = DedupOutcome::new(vec![DuplicateTag::UNIQUE, DuplicateTag::duplicate(3)]);

        let (collection, report) = sink
            .create("Parcels (BBox)", &features, &source_schema(), &outcome)
            .unwrap();

        let suffix = collection.name.strip_prefix("Parcels (BBox)_").unwrap();
        assert_eq!(suffix.len(), 14);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));

        let names: Vec<&str> = collection.schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["gml_id", "label", "NATIONALCADASTRALREFERENCE", DUPLICATE_FLAG_FIELD, DUPLICATE_GROUP_FIELD]
        );
        assert_eq!(
            collection.records[0].attribute(DUPLICATE_FLAG_FIELD),
            &AttributeValue::Bool(false)
        );
        assert_eq!(
            collection.records[0].attribute(DUPLICATE_GROUP_FIELD),
            &AttributeValue::Null
        );
        assert_eq!(
            collection.records[1].attribute(DUPLICATE_GROUP_FIELD),
            &AttributeValue::Integer(3)
        );
        assert_eq!(report.added, 2);
        assert!(!report.expanded);
    }

    #[test]
    fn create_expands_cadastral_code_with_case_insensitive_field() {
        let output = expanding();
        let prompter = ScriptedPrompter::new(&[]);
        let sink = ResultSink::new(&output, &prompter);
        let features = [parcel("a", "H501B0123Z1.45"), parcel("b", "bad.1")];

        let (collection, _) = sink
            .create("P", &features, &source_schema(), &DedupOutcome::all_unique(2))
            .unwrap();

        let first = &collection.records[0];
        assert_eq!(first.attribute(SECTION_FIELD), &AttributeValue::from("B"));
        assert_eq!(first.attribute(SHEET_FIELD), &AttributeValue::Integer(123));
        assert_eq!(first.attribute(ATTACHMENT_FIELD), &AttributeValue::from("Z"));

        let second = &collection.records[1];
        assert_eq!(second.attribute(SECTION_FIELD), &AttributeValue::Null);
        assert_eq!(second.attribute(SHEET_FIELD), &AttributeValue::Null);
    }

    fn existing_collection(output: &OutputConfig) -> ResultCollection {
        let prompter = ScriptedPrompter::new(&[]);
        let sink = ResultSink::new(output, &prompter);
        sink.create(
            "Parcels (Points buffer 10 m)",
            &[parcel("X", "G273_0001A0.1")],
            &source_schema(),
            &DedupOutcome::all_unique(1),
        )
        .unwrap()
        .0
    }

    #[test]
    fn append_skips_identities_already_in_target() {
        let output = OutputConfig::default();
        let mut target = existing_collection(&output);
        let prompter = ScriptedPrompter::new(&[]);
        let sink = ResultSink::new(&output, &prompter);

        let report = sink
            .append(
                &mut target,
                &[parcel("X", "G273_0001A0.1"), parcel("Y", "G273_0001A0.2")],
                &source_schema(),
                &DedupOutcome::all_unique(2),
                Some("gml_id"),
            )
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(target.records.len(), 2);
        assert!(prompter.asked().is_empty());
        target.validate().unwrap();
    }

    #[test]
    fn reduced_schema_requires_confirmation() {
        let output = OutputConfig::default();
        let mut target = existing_collection(&output);
        let mut wider = source_schema();
        wider.fields.push(FieldDef::new("areaValue", FieldType::Text));

        let refusing = ScriptedPrompter::new(&[false]);
        let err = ResultSink::new(&output, &refusing)
            .append(&mut target, &[parcel("Y", "")], &wider, &DedupOutcome::all_unique(1), Some("gml_id"))
            .unwrap_err();
        assert!(matches!(err, SinkError::SchemaMismatch { ref fields } if fields == &["areaValue"]));
        assert_eq!(target.records.len(), 1);

        let accepting = ScriptedPrompter::new(&[true]);
        let report = ResultSink::new(&output, &accepting)
            .append(&mut target, &[parcel("Y", "")], &wider, &DedupOutcome::all_unique(1), Some("gml_id"))
            .unwrap();
        assert_eq!(report.dropped_fields, ["areaValue"]);
        assert_eq!(target.records.len(), 2);
        target.validate().unwrap();
    }

    #[test]
    fn missing_code_fields_ask_before_appending() {
        let mut target = existing_collection(&OutputConfig::default());
        let output = expanding();

        let refusing = ScriptedPrompter::new(&[false]);
        let err = ResultSink::new(&output, &refusing)
            .append(&mut target, &[parcel("Y", "G273_0001A0.2")], &source_schema(), &DedupOutcome::all_unique(1), Some("gml_id"))
            .unwrap_err();
        assert!(matches!(err, SinkError::Aborted { .. }));
        assert_eq!(refusing.asked(), ["Cadastral fields missing"]);

        let accepting = ScriptedPrompter::new(&[true]);
        let report = ResultSink::new(&output, &accepting)
            .append(&mut target, &[parcel("Y", "G273_0001A0.2")], &source_schema(), &DedupOutcome::all_unique(1), Some("gml_id"))
            .unwrap();
        assert!(!report.expanded);
        assert_eq!(report.added, 1);
    }

    #[test]
    fn frame_mismatch_is_refused() {
        let output = OutputConfig::default();
        let mut target = existing_collection(&output);
        let mut schema = source_schema();
        schema.coordinate_frame = "EPSG:4326".to_string();
        let prompter = ScriptedPrompter::new(&[]);

        assert!(matches!(
            ResultSink::new(&output, &prompter).append(&mut target, &[], &schema, &DedupOutcome::default(), None),
            Err(SinkError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn validate_reports_inconsistent_records() {
        let mut collection = existing_collection(&OutputConfig::default());
        collection.records.push(parcel("Z", ""));
        assert!(matches!(
            collection.validate(),
            Err(SinkError::Inconsistent { .. })
        ));
    }

    #[test]
    fn coerce_converts_compatible_values() {
        assert_eq!(coerce(AttributeValue::from("12"), FieldType::Integer), AttributeValue::Integer(12));
        assert_eq!(coerce(AttributeValue::Integer(2), FieldType::Real), AttributeValue::Real(2.0));
        assert_eq!(coerce(AttributeValue::Integer(2), FieldType::Text), AttributeValue::from("2"));
        assert_eq!(coerce(AttributeValue::from("x"), FieldType::Integer), AttributeValue::Null);
    }
}
