#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-tile WFS `GetFeature` requests.
//!
//! A [`TileFetcher`] issues one bounded request for one tile and returns
//! the parsed features together with the schema they were read with.
//! [`WfsFetcher`] is the `reqwest`-backed implementation; responses are
//! held in memory only, so nothing needs cleaning up when a request or
//! parse fails.
//!
//! Failures are classified for logging as service errors (an exception
//! report in the body), parse errors, or transport errors. The
//! orchestrator treats all of them the same way.

pub mod gml;
pub mod json;

use std::time::Duration;

use async_trait::async_trait;
use parcel_wfs_parcel_models::{
    BBox, FeatureRecord, SchemaInfo, Tile,
    config::{AxisOrder, OutputFormat, ServiceConfig},
};
use thiserror::Error;

/// Errors that can occur while fetching one tile.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The service answered with an exception report.
    #[error("Service error: {message}")]
    Service {
        /// Exception text reported by the service.
        message: String,
    },

    /// The response could not be parsed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status without an exception report.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// The endpoint is not `https://` and insecure endpoints are refused.
    #[error("Refusing non-https endpoint: {endpoint}")]
    InsecureEndpoint {
        /// The refused endpoint.
        endpoint: String,
    },
}

/// Coarse failure class used in logs and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FetchErrorKind {
    /// Exception report from the service.
    Service,
    /// Unparsable response.
    Parse,
    /// Network, HTTP status, or endpoint failure.
    Transport,
}

impl FetchError {
    /// Returns the failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Service { .. } => FetchErrorKind::Service,
            Self::Parse { .. } => FetchErrorKind::Parse,
            Self::Transport(_) | Self::Status { .. } | Self::InsecureEndpoint { .. } => {
                FetchErrorKind::Transport
            }
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Features returned for one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBatch {
    /// Parsed features in response order.
    pub features: Vec<FeatureRecord>,
    /// Schema of the features; `None` when the response held no features.
    pub schema: Option<SchemaInfo>,
}

impl TileBatch {
    /// A batch with no features.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            features: Vec::new(),
            schema: None,
        }
    }
}

/// Fetches the features of one tile.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Issues one request scoped to `tile.bbox`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request, the service, or parsing
    /// fails.
    async fn fetch(&self, tile: &Tile) -> Result<TileBatch, FetchError>;
}

/// Builds the `GetFeature` URL for `bbox`.
///
/// The bbox is written in the axis order of the service frame, followed
/// by the frame URN.
#[must_use]
pub fn build_tile_url(config: &ServiceConfig, bbox: &BBox) -> String {
    let corners = match config.axis_order {
        AxisOrder::LatLon => bbox.to_string(),
        AxisOrder::LonLat => format!(
            "{:.7},{:.7},{:.7},{:.7}",
            bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat
        ),
    };

    let mut url = format!(
        "{}&typeNames={}&bbox={corners},{}",
        config.endpoint, config.type_name, config.srs_urn
    );
    if config.output_format == OutputFormat::Geojson {
        url.push_str("&outputFormat=application/json");
    }
    url
}

/// Returns `true` if any non-empty marker appears anywhere in `body`.
#[must_use]
pub fn is_exception_report(body: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| !marker.is_empty() && body.contains(marker.as_str()))
}

/// Extracts the `ExceptionText` of an OWS exception report, falling back
/// to the start of the body.
#[must_use]
pub fn exception_text(body: &str) -> String {
    body.find("ExceptionText>")
        .map(|start| &body[start + "ExceptionText>".len()..])
        .and_then(|rest| rest.find("</").map(|end| rest[..end].trim().to_string()))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| truncate_for_log(body, 300))
}

fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Classifies a response and parses it on success.
///
/// An exception report wins over the HTTP status: services commonly send
/// one with a 400.
///
/// # Errors
///
/// Returns [`FetchError`] for exception reports, non-success statuses,
/// and unparsable bodies.
pub fn classify_response(
    status: u16,
    body: &str,
    config: &ServiceConfig,
) -> Result<TileBatch, FetchError> {
    if is_exception_report(body, &config.exception_markers) {
        return Err(FetchError::Service {
            message: exception_text(body),
        });
    }

    if !(200..300).contains(&status) {
        return Err(FetchError::Status {
            status,
            body: truncate_for_log(body, 500),
        });
    }

    match config.output_format {
        OutputFormat::Gml => gml::parse_feature_collection(body, config.axis_order, &config.srs_name),
        OutputFormat::Geojson => json::parse_feature_collection(body, &config.srs_name),
    }
}

/// `reqwest`-backed [`TileFetcher`] for a WFS 2.0 endpoint.
pub struct WfsFetcher {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl WfsFetcher {
    /// Creates a fetcher for the configured service.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InsecureEndpoint`] if the endpoint is not
    /// `https://` while `https_only` is set, or [`FetchError::Transport`]
    /// if the HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, FetchError> {
        if config.https_only && !config.endpoint.starts_with("https://") {
            return Err(FetchError::InsecureEndpoint {
                endpoint: config.endpoint,
            });
        }

        let client = reqwest::Client::builder()
            .https_only(config.https_only)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// The service configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Fetches the features inside an arbitrary bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request, the service, or parsing
    /// fails.
    pub async fn fetch_bbox(&self, bbox: &BBox) -> Result<TileBatch, FetchError> {
        let url = build_tile_url(&self.config, bbox);
        log::debug!("GET {url}");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        classify_response(status.as_u16(), &body, &self.config)
    }
}

#[async_trait]
impl TileFetcher for WfsFetcher {
    async fn fetch(&self, tile: &Tile) -> Result<TileBatch, FetchError> {
        self.fetch_bbox(&tile.bbox).await
    }
}
