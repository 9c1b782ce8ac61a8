use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand};
use geo::geometry::Coord;
use horizon::{peaks::DEFAULT_PEAK_TOLERANCE_M, Config};
use std::{path::PathBuf, str::FromStr};

/// Compute the skyline visible from a point on the map.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory containing SRTM hgt tiles.
    #[arg(short, long)]
    pub tile_dir: PathBuf,

    /// Read whole tiles into memory instead of mapping them.
    #[arg(long, default_value_t = false)]
    pub in_mem: bool,

    /// Observer "lat,lon".
    #[arg(short, long)]
    pub observer: LatLon,

    /// Observer elevation in meters, defaults to ground level.
    #[arg(short, long)]
    pub elevation: Option<f64>,

    /// Bearing sectors around the full circle.
    #[arg(long)]
    pub resolution: Option<usize>,

    /// Distance between samples, in meters.
    #[arg(long)]
    pub step: Option<f64>,

    /// How far to look, in meters.
    #[arg(short, long)]
    pub range: Option<f64>,

    /// Passes the horizon must stay flat behind a ridge point.
    #[arg(long)]
    pub persistence: Option<u32>,

    /// First ring swept; closer terrain is ignored.
    #[arg(long)]
    pub min_pass: Option<u32>,

    /// Highest possible terrain, in meters.
    #[arg(long)]
    pub max_terrain: Option<f64>,

    /// Don't draw progress bars.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

impl Cli {
    /// Default tuning overridden by whatever was given on the
    /// command line.
    pub fn config(&self) -> Config {
        let default = Config::default();
        Config {
            bearing_resolution: self.resolution.unwrap_or(default.bearing_resolution),
            sample_step: self.step.unwrap_or(default.sample_step),
            visual_range: self.range.unwrap_or(default.visual_range),
            ridge_persistence: self.persistence.unwrap_or(default.ridge_persistence),
            min_pass: self.min_pass.unwrap_or(default.min_pass),
            max_terrain_elevation: self.max_terrain.unwrap_or(default.max_terrain_elevation),
        }
    }
}

#[derive(Clone, Debug, Copy)]
pub struct LatLon(pub Coord<f64>);

impl FromStr for LatLon {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (lat_str, lon_str) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid lat,lon pair"))?;
        let lat = f64::from_str(lat_str.trim())?;
        let lon = f64::from_str(lon_str.trim())?;
        Ok(Self(Coord { y: lat, x: lon }))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print ridges as JSON to stdout.
    Json,

    /// Print ridge points as CSV to stdout.
    Csv,

    /// Print ridges and summits as a GeoJSON FeatureCollection to
    /// stdout.
    Geojson,

    /// Plot projected ridge heights to terminal.
    Plot,

    /// Name the visible peaks.
    Peaks {
        /// JSON file of `[{"lat", "lon", "elevation", "name"}]`.
        peaks: PathBuf,

        /// Maximum distance between a summit and a peak, in meters.
        #[arg(long, default_value_t = DEFAULT_PEAK_TOLERANCE_M)]
        tolerance: f64,
    },
}
