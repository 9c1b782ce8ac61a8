mod features;
mod options;
mod progress;

use anyhow::{Context, Error as AnyError};
use clap::Parser;
use horizon::{
    peaks::{Peak, PeakMatcher},
    projection::{projected_height, Dimensions},
    TileMode, Tiles, View,
};
use log::info;
use options::{Cli, Command as CliCmd};
use progress::Bars;
use serde::Serialize;
use std::{fs::File, io::BufReader, io::Write, path::Path};
use textplots::{Chart, Plot, Shape};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();
    env_logger::init();

    let config = cli.config();
    let tile_mode = if cli.in_mem {
        TileMode::InMem
    } else {
        TileMode::MemMap
    };
    let tiles = Tiles::new(cli.tile_dir.clone(), tile_mode)?;

    let bars = Bars::new(cli.quiet);
    let mut builder = View::builder()
        .observer(cli.observer.0)
        .config(config)
        .progress(&bars);
    if let Some(elevation) = cli.elevation {
        builder = builder.observer_elevation(elevation);
    }
    let view = builder.build(&tiles)?;
    bars.finish();

    match cli.cmd {
        CliCmd::Json => print_json(&view),
        CliCmd::Csv => print_csv(&view),
        CliCmd::Geojson => {
            println!("{}", geojson::GeoJson::from(features::collection(&view)));
            Ok(())
        }
        CliCmd::Plot => {
            plot_ascii(&view);
            Ok(())
        }
        CliCmd::Peaks { peaks, tolerance } => print_peaks(&view, &peaks, tolerance),
    }
}

/// Bearing of sector `idx`, in degrees.
#[allow(clippy::cast_precision_loss)]
fn degrees(view: &View, idx: usize) -> f64 {
    idx as f64 * 360.0 / view.config().bearing_resolution as f64
}

fn print_json(view: &View) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonPoint {
        location: [f64; 2],
        elevation: f64,
        distance: f64,
        bearing: f64,
        local_max: bool,
    }

    #[derive(Serialize)]
    struct JsonView {
        observer: [f64; 2],
        observer_elevation: f64,
        dimensions: Option<Dimensions>,
        ridges: Vec<Vec<JsonPoint>>,
    }

    let observer = view.observer();
    let reshaped = JsonView {
        observer: [observer.x, observer.y],
        observer_elevation: view.observer_elevation(),
        dimensions: Dimensions::of(view),
        ridges: view
            .ridges()
            .iter()
            .map(|ridge| {
                ridge
                    .iter()
                    .map(|point| JsonPoint {
                        location: [point.coord().x, point.coord().y],
                        elevation: point.elevation(),
                        distance: point.distance(),
                        bearing: degrees(view, point.bearing()),
                        local_max: point.is_local_max(),
                    })
                    .collect()
            })
            .collect(),
    };
    let json = serde_json::to_string(&reshaped)?;
    println!("{json}");
    Ok(())
}

fn print_csv(view: &View) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "Ridge,Bearing,Longitude,Latitude,Elevation,Distance,LocalMax"
    )?;
    for (ridge_idx, ridge) in view.ridges().iter().enumerate() {
        for point in ridge {
            let bearing = degrees(view, point.bearing());
            let coord = point.coord();
            writeln!(
                stdout,
                "{ridge_idx},{bearing},{},{},{},{},{}",
                coord.x,
                coord.y,
                point.elevation(),
                point.distance(),
                point.is_local_max()
            )?;
        }
    }
    Ok(())
}

/// Projected height of every ridge point against bearing.
#[allow(clippy::cast_possible_truncation)]
fn plot_ascii(view: &View) {
    let observer_elevation = view.observer_elevation();
    let plot_data: Vec<(f32, f32)> = view
        .ridges()
        .iter()
        .flatten()
        .map(|point| {
            (
                degrees(view, point.bearing()) as f32,
                projected_height(observer_elevation, point.distance(), point.elevation()) as f32,
            )
        })
        .collect();
    Chart::new(300, 150, 0.0, 360.0)
        .lineplot(&Shape::Points(&plot_data))
        .display();
}

fn print_peaks(view: &View, path: &Path, tolerance: f64) -> Result<(), AnyError> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let peaks: Vec<Peak> = serde_json::from_reader(BufReader::new(file))?;
    info!("loaded {} peaks from {}", peaks.len(), path.display());

    let matcher = PeakMatcher::new(peaks, tolerance);
    let mut stdout = std::io::stdout().lock();
    for placed in matcher.locate(view) {
        let name = placed.peak.name.as_deref().unwrap_or_default();
        let bearing = degrees(view, placed.bearing);
        let km = placed.distance / 1000.0;
        match placed.peak.elevation {
            Some(elevation) => writeln!(stdout, "{name}: {bearing:.1}°, {km:.1} km, {elevation} m")?,
            None => writeln!(stdout, "{name}: {bearing:.1}°, {km:.1} km")?,
        }
    }
    Ok(())
}
