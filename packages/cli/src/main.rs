#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line parcel downloader.
//!
//! One subcommand per selection mode. Each run tiles the selected area,
//! downloads the tiles with a pause between requests, and writes the
//! deduplicated parcels to a new `GeoJSON` collection or appends them to
//! an existing one. Ctrl-C stops the download at the next tile boundary
//! and offers to keep what was already fetched.
//!
//! Uses `indicatif-log-bridge` (via [`parcel_wfs_cli_utils::init_logger`])
//! so that log lines and the tile bar never fight for the terminal.

mod input;

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use parcel_wfs_cli_utils::{IndicatifProgress, TerminalPrompter};
use parcel_wfs_download::interaction::{CancelFlag, FixedAnswer, Prompter};
use parcel_wfs_geometry::{
    PlanarGeometryOps,
    selection::{AreaSelection, AreaSelectionStrategy},
};
use parcel_wfs_pipeline::{
    OutputTarget, Session,
    config::load_config,
    lookup::lookup_parcel,
};
use parcel_wfs_wfs::WfsFetcher;

use crate::input::{parse_lat_lon, points_of, read_geometries};

#[derive(Parser)]
#[command(name = "parcel_wfs", about = "Download cadastral parcels from a WFS service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file replacing the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for new collections
    #[arg(long, global = true, default_value = ".")]
    output: PathBuf,

    /// Append to this existing collection instead of creating a new one
    #[arg(long, global = true)]
    append: Option<PathBuf>,

    /// Add section, sheet, attachment and development fields decoded from
    /// the cadastral reference
    #[arg(long, global = true)]
    expand_code: bool,

    /// Answer yes to every confirmation
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    /// Coordinate frame of the selection, when not the service frame
    #[arg(long, global = true)]
    frame: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download parcels inside a rectangle given by two opposite corners
    Bbox {
        /// First corner as LAT,LON
        #[arg(value_parser = parse_lat_lon, allow_hyphen_values = true)]
        corner_a: (f64, f64),
        /// Opposite corner as LAT,LON
        #[arg(value_parser = parse_lat_lon, allow_hyphen_values = true)]
        corner_b: (f64, f64),
    },
    /// Download parcels intersecting the polygons of a `GeoJSON` file
    Polygon {
        /// `GeoJSON` file with Polygon or `MultiPolygon` geometries
        file: PathBuf,
    },
    /// Download parcels within a buffer around the lines of a `GeoJSON` file
    Line {
        /// `GeoJSON` file with `LineString` or `MultiLineString` geometries
        file: PathBuf,
        /// Buffer distance in metres (0-100, default from configuration)
        #[arg(long)]
        buffer: Option<f64>,
    },
    /// Download parcels within a buffer around a set of points
    Points {
        /// `GeoJSON` file with Point or `MultiPoint` geometries
        #[arg(long)]
        file: Option<PathBuf>,
        /// A point as LAT,LON (repeatable)
        #[arg(long = "point", value_parser = parse_lat_lon, allow_hyphen_values = true)]
        points: Vec<(f64, f64)>,
        /// Buffer distance in metres (0-100, default from configuration)
        #[arg(long)]
        buffer: Option<f64>,
        /// Keep only parcels containing at least one of the points
        #[arg(long)]
        per_point: bool,
    },
    /// Show the cadastral parcel under a point
    Lookup {
        /// The point as LAT,LON
        #[arg(value_parser = parse_lat_lon, allow_hyphen_values = true)]
        point: (f64, f64),
    },
    /// Print the effective configuration
    Config,
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = parcel_wfs_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if cli.expand_code {
        config.output.expand_cadastral_code = true;
    }
    let default_buffer = config.selection.default_buffer_m;

    let selection = match cli.command {
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }
        Commands::Lookup { point: (lat, lon) } => {
            let fetcher = WfsFetcher::new(config.service.clone())?;
            match lookup_parcel(&fetcher, &PlanarGeometryOps::new(), &config.output, lat, lon)
                .await?
            {
                Some(info) => println!("{info}"),
                None => println!("No parcel at {lat},{lon}"),
            }
            return Ok(());
        }
        Commands::Bbox { corner_a, corner_b } => AreaSelection::BBoxDraw { corner_a, corner_b },
        Commands::Polygon { file } => AreaSelection::PolygonPick {
            polygons: read_geometries(&file)?,
        },
        Commands::Line { file, buffer } => AreaSelection::LinePick {
            lines: read_geometries(&file)?,
            buffer_m: buffer.unwrap_or(default_buffer),
        },
        Commands::Points {
            file,
            points,
            buffer,
            per_point,
        } => {
            let mut selected = match file {
                Some(file) => points_of(read_geometries(&file)?),
                None => Vec::new(),
            };
            selected.extend(points.into_iter().map(|(lat, lon)| geo::Point::new(lon, lat)));
            AreaSelection::PointSet {
                points: selected,
                buffer_m: buffer.unwrap_or(default_buffer),
                per_point,
            }
        }
    };

    let fetcher = Arc::new(WfsFetcher::new(config.service.clone())?);
    let prompter: Arc<dyn Prompter> = if cli.yes {
        Arc::new(FixedAnswer(true))
    } else {
        Arc::new(TerminalPrompter::new(multi.clone(), false))
    };

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current tile...");
            on_interrupt.cancel();
        }
    });

    let target = match cli.append {
        Some(path) => OutputTarget::Append { path },
        None => OutputTarget::Create { dir: cli.output },
    };

    let progress = IndicatifProgress::tiles_bar(&multi, &format!("{}...", selection.label()));
    let mut session = Session::new(
        config,
        fetcher,
        Arc::new(PlanarGeometryOps::new()),
        prompter,
        Arc::new(cancel),
    )
    .with_progress(progress);
    if let Some(frame) = cli.frame {
        session = session.with_input_frame(frame);
    }

    let report = session.run(&selection, &target).await?;
    println!("\n{}", report.summary());

    Ok(())
}
