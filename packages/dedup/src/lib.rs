#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deduplication of features gathered across tiles.
//!
//! Adjacent tiles share edges, so a parcel crossing an edge is returned
//! by every tile it touches. Two phases run in order:
//!
//! 1. **Identity**: features with an identity value already seen are
//!    dropped, keeping the first occurrence in arrival order.
//! 2. **Geometry coincidence**: survivors whose geometries render to the
//!    same canonical WKT are tagged with a shared group id. Nothing is
//!    removed; coincident geometries with different identifiers point at
//!    upstream data problems the user should be able to inspect.

use std::collections::{HashMap, HashSet};

use parcel_wfs_parcel_models::{
    BBox, DedupOutcome, DuplicateTag, FeatureRecord, SchemaInfo, config::DedupConfig,
    wkt::canonical_wkt,
};

/// Number of duplicate groups listed individually in the log.
const LOGGED_GROUPS: usize = 10;

/// Result of [`dedupe`].
#[derive(Debug, Clone, PartialEq)]
pub struct DedupReport {
    /// Features surviving the identity phase, in arrival order.
    pub survivors: Vec<FeatureRecord>,
    /// Geometry duplicate tags aligned with `survivors`.
    pub outcome: DedupOutcome,
    /// Schema name of the identity field, `None` when no candidate
    /// exists.
    pub identity_field: Option<String>,
    /// Features dropped by the identity phase.
    pub duplicates_removed: usize,
}

/// Picks the first candidate present in `schema`, returning the schema's
/// own spelling of it.
#[must_use]
pub fn select_identity_field(schema: &SchemaInfo, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find_map(|candidate| schema.resolve_field(candidate))
        .map(|field| field.name.clone())
}

/// Drops every feature whose `identity_field` value was already seen.
///
/// Null values are compared like any other value, so only the first
/// feature without an identity survives.
#[must_use]
pub fn remove_identity_duplicates(
    features: Vec<FeatureRecord>,
    identity_field: &str,
) -> Vec<FeatureRecord> {
    let mut seen: HashSet<Option<String>> = HashSet::with_capacity(features.len());
    features
        .into_iter()
        .filter(|f| seen.insert(f.attribute(identity_field).identity_key()))
        .collect()
}

/// Groups features by canonical geometry string.
///
/// Groups with more than one member get ids from 1 in the order their
/// first member appears. Features without a usable geometry are never
/// grouped.
#[must_use]
pub fn tag_geometry_duplicates(features: &[FeatureRecord], precision: usize) -> DedupOutcome {
    let mut group_of: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (i, feature) in features.iter().enumerate() {
        let Some(geometry) = feature.usable_geometry() else {
            continue;
        };
        let key = canonical_wkt(geometry, precision);
        let slot = *group_of.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }

    let mut tags = vec![DuplicateTag::UNIQUE; features.len()];
    let mut next_id = 0u32;
    for members in groups.iter().filter(|m| m.len() > 1) {
        next_id += 1;
        for &i in members {
            tags[i] = DuplicateTag::duplicate(next_id);
        }
    }

    DedupOutcome::new(tags)
}

/// Runs both deduplication phases.
#[must_use]
pub fn dedupe(
    features: Vec<FeatureRecord>,
    schema: &SchemaInfo,
    config: &DedupConfig,
) -> DedupReport {
    let before = features.len();
    let identity_field = select_identity_field(schema, &config.identity_fields);

    let survivors = match &identity_field {
        Some(field) => {
            log::info!("Identity deduplication on field '{field}'");
            remove_identity_duplicates(features, field)
        }
        None => {
            log::warn!(
                "No identity field among {:?}; skipping identity deduplication",
                config.identity_fields
            );
            features
        }
    };

    let duplicates_removed = before - survivors.len();
    if duplicates_removed > 0 {
        log::info!(
            "Removed {duplicates_removed} duplicate features ({before} -> {})",
            survivors.len()
        );
    }

    let outcome = tag_geometry_duplicates(&survivors, config.canonical_precision);
    log_geometry_groups(&survivors, &outcome, identity_field.as_deref());

    DedupReport {
        survivors,
        outcome,
        identity_field,
        duplicates_removed,
    }
}

fn log_geometry_groups(features: &[FeatureRecord], outcome: &DedupOutcome, identity: Option<&str>) {
    let group_count = outcome.group_count();
    if group_count == 0 {
        return;
    }

    log::warn!(
        "{} features share their geometry with another feature ({group_count} groups)",
        outcome.duplicate_count()
    );

    for group in (1u32..).take(group_count.min(LOGGED_GROUPS)) {
        let members: Vec<&FeatureRecord> = features
            .iter()
            .zip(outcome.tags())
            .filter(|(_, tag)| tag.group_id == Some(group))
            .map(|(f, _)| f)
            .collect();

        let ids: Vec<String> = members
            .iter()
            .map(|f| identity.map_or_else(|| "?".to_string(), |field| f.attribute(field).to_string()))
            .collect();
        let corner = members
            .first()
            .and_then(|f| f.geometry.as_ref())
            .and_then(BBox::of_geometry)
            .map(|b| format!("{:.6},{:.6}", b.min_lat, b.min_lon))
            .unwrap_or_default();

        log::warn!("  group {group}: [{}] at {corner}", ids.join(", "));
    }

    if group_count > LOGGED_GROUPS {
        log::warn!("  ... and {} more", group_count - LOGGED_GROUPS);
    }
}
