mod options;

use anyhow::{anyhow, Error as AnyError};
use clap::Parser;
use log::{debug, info, warn};
use options::{Cli, Command as CliCmd, LatLon};
use probe::{
    transform, Crs, Event, GeoPoint, Mode, ProfileSample, RasterSampler, Session, SessionConfig,
    Update, ViewEvent,
};
use std::{fs::File, io::BufReader, path::Path};
use textplots::{Chart, Plot, Shape};

/// Default view resolution for a Web Mercator view, in metres.
const MERCATOR_RESOLUTION: f64 = 30.0;

/// Default view resolution for a geographic view, one arcsecond.
const GEOGRAPHIC_RESOLUTION: f64 = 1.0 / 3600.0;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();
    let Cli {
        raster,
        config,
        epsg,
        resolution,
        overviews,
        cmd,
    } = cli;

    env_logger::init();

    let projection = Crs::from_epsg(epsg).ok_or_else(|| anyhow!("unsupported EPSG:{epsg}"))?;
    let resolution = resolution.unwrap_or(match projection {
        Crs::Geographic => GEOGRAPHIC_RESOLUTION,
        Crs::WebMercator => MERCATOR_RESOLUTION,
    });
    let mut config = match config {
        Some(path) => read_config(&path)?,
        None => SessionConfig::default(),
    };

    let sampler = RasterSampler::from_hgt(&raster, overviews)?.bands(config.bands);
    let (cols, rows) = sampler.raster().dimensions(0);
    info!(
        "loaded {cols}x{rows} raster, {} levels",
        sampler.raster().levels()
    );

    let (mode, points, clicked) = match &cmd {
        CliCmd::Pins { points } => (Mode::PinDrop, points, true),
        CliCmd::Profile { points, .. } => (Mode::PathDrawing, points, true),
        CliCmd::Hover { points } => (config.mode, points, false),
    };
    if config.mode != mode {
        info!("overriding {:?} mode with {mode:?}", config.mode);
        config.mode = mode;
    }
    let mut session = Session::new(config);
    debug!("replaying {} points in {:?} mode", points.len(), session.mode());

    for &LatLon { lat, lon } in points {
        let coordinate = transform::to_map(projection, GeoPoint::new(lon, lat)?)?;
        let view = ViewEvent {
            coordinate,
            resolution,
            projection,
        };
        let event = if clicked {
            Event::Clicked(view)
        } else {
            Event::PointerMoved(view)
        };
        for update in session.handle(&sampler, event).await? {
            if let Update::Hover(result) = update {
                println!("{}", serde_json::to_string(&result)?);
            }
        }
    }

    match cmd {
        CliCmd::Pins { points } => {
            if session.pins().len() < points.len() {
                warn!(
                    "{} of {} clicks failed to sample",
                    points.len() - session.pins().len(),
                    points.len()
                );
            }
            println!("{}", serde_json::to_string(session.pins())?);
        }
        CliCmd::Profile { plot: true, .. } => plot_ascii(&session.profile()),
        CliCmd::Profile { plot: false, .. } => {
            println!("{}", serde_json::to_string(&session.profile())?);
        }
        CliCmd::Hover { .. } => (),
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<SessionConfig, AnyError> {
    let rdr = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(rdr)?)
}

#[allow(clippy::cast_possible_truncation)]
fn plot_ascii(profile: &[ProfileSample]) {
    let Some(last) = profile.last() else {
        warn!("empty profile");
        return;
    };
    let plot_data: Vec<(f32, f32)> = profile
        .iter()
        .map(|sample| (sample.distance as f32, sample.elevation as f32))
        .collect();
    Chart::new(300, 150, 0.0, last.distance as f32)
        .lineplot(&Shape::Lines(&plot_data))
        .display();
}
