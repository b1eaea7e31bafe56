//! Parcel-at-point lookup.
//!
//! Requests a tiny box around one point and reports the first parcel that
//! contains it.

use geo::{Geometry, Point};
use parcel_wfs_geometry::GeometryOps;
use parcel_wfs_parcel_models::{BBox, Tile, config::OutputConfig, wkt::canonical_wkt};
use parcel_wfs_sink::cadastral::CadastralCode;
use parcel_wfs_wfs::{FetchError, TileFetcher};

/// Half-size of the requested box, in degrees.
const LOOKUP_MARGIN_DEG: f64 = 0.000_01;
/// Decimal places of the reported WKT.
const WKT_PRECISION: usize = 6;

const LABEL_FIELD: &str = "label";
const ADMIN_UNIT_FIELD: &str = "administrativeUnit";

/// Cadastral information of the parcel under a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelInfo {
    /// National cadastral reference, e.g. `M011_0019C0.131`.
    pub reference: Option<String>,
    /// Sheet digits as written in the reference (`0019`).
    pub sheet: Option<String>,
    /// Parcel label.
    pub label: Option<String>,
    /// Administrative unit (municipality code).
    pub administrative_unit: Option<String>,
    /// Parcel geometry as WKT.
    pub wkt: Option<String>,
    /// Census section, `None` for `_` or an unparseable reference.
    pub section: Option<String>,
    /// Attachment letter.
    pub attachment: Option<String>,
}

impl std::fmt::Display for ParcelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/D".to_string());
        writeln!(f, "Reference:           {}", show(&self.reference))?;
        writeln!(f, "Sheet:               {}", show(&self.sheet))?;
        writeln!(f, "Label:               {}", show(&self.label))?;
        writeln!(f, "Administrative unit: {}", show(&self.administrative_unit))?;
        writeln!(f, "Section:             {}", show(&self.section))?;
        writeln!(f, "Attachment:          {}", show(&self.attachment))?;
        write!(f, "WKT:                 {}", show(&self.wkt))
    }
}

/// Finds the parcel containing the point at `(lat, lon)`.
///
/// Returns `Ok(None)` when no parcel contains the point.
///
/// # Errors
///
/// Returns [`FetchError`] if the request fails.
pub async fn lookup_parcel(
    fetcher: &dyn TileFetcher,
    ops: &dyn GeometryOps,
    output: &OutputConfig,
    lat: f64,
    lon: f64,
) -> Result<Option<ParcelInfo>, FetchError> {
    let tile = Tile {
        index: 0,
        row: 0,
        col: 0,
        bbox: BBox::new(lat, lon, lat, lon).expanded(LOOKUP_MARGIN_DEG),
    };
    let batch = fetcher.fetch(&tile).await?;
    let Some(schema) = batch.schema else {
        log::info!("No parcel found at {lat:.6},{lon:.6}");
        return Ok(None);
    };

    let point = Geometry::Point(Point::new(lon, lat));
    let Some(parcel) = batch
        .features
        .iter()
        .find(|f| f.usable_geometry().is_some_and(|g| ops.intersects(g, &point)))
    else {
        log::info!(
            "{} parcels near {lat:.6},{lon:.6}, none contains it",
            batch.features.len()
        );
        return Ok(None);
    };

    let text = |name: &str| {
        schema
            .resolve_field(name)
            .map(|field| parcel.attribute(&field.name))
            .filter(|value| !value.is_null())
            .map(ToString::to_string)
    };

    let reference = text(&output.cadastral_reference_field);
    let code = reference.as_deref().and_then(CadastralCode::parse);
    let sheet = reference
        .as_deref()
        .filter(|r| r.chars().count() > 9)
        .map(|r| r.chars().skip(5).take(4).collect());

    Ok(Some(ParcelInfo {
        sheet,
        label: text(LABEL_FIELD),
        administrative_unit: text(ADMIN_UNIT_FIELD),
        wkt: parcel
            .geometry
            .as_ref()
            .map(|g| canonical_wkt(g, WKT_PRECISION)),
        section: code.as_ref().and_then(|c| c.section.clone()),
        attachment: code.map(|c| c.attachment),
        reference,
    }))
}
