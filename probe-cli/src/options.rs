use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, str::FromStr};

/// Probe an elevation raster the way a map view would.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// NASADEM/SRTM `.hgt` tile to probe.
    #[arg(short, long)]
    pub raster: PathBuf,

    /// Session config JSON.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// EPSG code of the simulated view (4326 or 3857).
    #[arg(short, long, default_value_t = 3857)]
    pub epsg: u32,

    /// View resolution, in the view's units per pixel. Defaults to 30 m
    /// (or one arcsecond for a geographic view).
    #[arg(long)]
    pub resolution: Option<f64>,

    /// Number of overview levels to build.
    #[arg(short, long, default_value_t = 4)]
    pub overviews: usize,

    #[command(subcommand)]
    pub cmd: Command,
}

/// A "lat,lon" pair, in degrees.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl FromStr for LatLon {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (lat_str, lon_str) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid lat,lon: {s}"))?;
        let lat = f64::from_str(lat_str.trim())?;
        let lon = f64::from_str(lon_str.trim())?;
        Ok(Self { lat, lon })
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Drop a pin at each point and print the pins as JSON.
    Pins {
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<LatLon>,
    },

    /// Draw a path through the points and print its profile.
    Profile {
        /// Plot to terminal instead of printing JSON.
        #[arg(short, long, default_value_t = false)]
        plot: bool,

        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<LatLon>,
    },

    /// Move the pointer over each point and print what it reads.
    Hover {
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<LatLon>,
    },
}
