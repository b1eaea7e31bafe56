//! TOML configuration schema.
//!
//! Every section and key is optional in a user file; missing values fall
//! back to the defaults below, which match the embedded default
//! configuration shipped with the pipeline.

use serde::{Deserialize, Serialize};

/// Complete configuration of a download session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote feature service.
    pub service: ServiceConfig,
    /// Tiling and pacing policy.
    pub download: DownloadConfig,
    /// Deduplication settings.
    pub dedup: DedupConfig,
    /// Result collection settings.
    pub output: OutputConfig,
    /// Area selection settings.
    pub selection: SelectionConfig,
}

/// Response format requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// GML 3.2 `FeatureCollection` (the service default).
    #[default]
    Gml,
    /// `GeoJSON` `FeatureCollection` (`outputFormat=application/json`).
    Geojson,
}

/// Order of the two coordinates in GML `pos`/`posList` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    /// Latitude first, as mandated by `urn:ogc:def:crs:EPSG::6706`.
    #[default]
    LatLon,
    /// Longitude first.
    LonLat,
}

/// Connection parameters of the remote WFS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// `GetFeature` base URL, including `service`, `request` and
    /// `version` parameters.
    pub endpoint: String,
    /// Feature type to request.
    pub type_name: String,
    /// Short identifier of the service coordinate frame.
    pub srs_name: String,
    /// URN appended to the `bbox` parameter.
    pub srs_urn: String,
    /// Response format to request.
    pub output_format: OutputFormat,
    /// Coordinate order of GML positions.
    pub axis_order: AxisOrder,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Markers whose presence in the start of a response body identifies
    /// a service-side exception report.
    pub exception_markers: Vec<String>,
    /// Refuse endpoints that are not `https://`.
    pub https_only: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://wfs.cartografia.agenziaentrate.gov.it/inspire/wfs/owfs01.php?\
                       service=WFS&request=GetFeature&version=2.0.0"
                .to_string(),
            type_name: "CP:CadastralParcel".to_string(),
            srs_name: "EPSG:6706".to_string(),
            srs_urn: "urn:ogc:def:crs:EPSG::6706".to_string(),
            output_format: OutputFormat::Gml,
            axis_order: AxisOrder::LatLon,
            timeout_secs: 120,
            exception_markers: vec![
                "<ExceptionReport".to_string(),
                "<ows:ExceptionReport".to_string(),
            ],
            https_only: true,
        }
    }
}

/// Client-enforced request policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Maximum estimated area of a single request, in km².
    pub max_tile_km2: f64,
    /// Fixed pause between consecutive requests, in seconds.
    pub pacing_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_tile_km2: 4.0,
            pacing_secs: 5,
        }
    }
}

/// Deduplication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Identity field candidates in priority order. The first one present
    /// in the schema is used.
    pub identity_fields: Vec<String>,
    /// Decimal precision of the canonical geometry string.
    pub canonical_precision: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            identity_fields: vec![
                "gml_id".to_string(),
                "inspireId_localId".to_string(),
                "nationalCadastralReference".to_string(),
            ],
            canonical_precision: 6,
        }
    }
}

/// Result collection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Field holding the structured cadastral code.
    pub cadastral_reference_field: String,
    /// Add the fields derived from the cadastral code.
    pub expand_cadastral_code: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cadastral_reference_field: "nationalCadastralReference".to_string(),
            expand_cadastral_code: false,
        }
    }
}

/// Area selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Buffer distance used by line and point selections, in metres.
    pub default_buffer_m: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_buffer_m: 50.0,
        }
    }
}
