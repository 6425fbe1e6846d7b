//! SRTM/NASADEM elevation (`.hgt`) files.
//!
//! An HGT file is a square grid of big-endian `i16` samples, north row
//! first, covering one degree on a side. The file name encodes the SW
//! corner (`N44W072.hgt`) and the file length encodes the resolution.

use crate::{Crs, Raster, RasterError, C};
use byteorder::{BigEndian as BE, ReadBytesExt};
use geo::geometry::Coord;
use log::debug;
use std::{fs::File, io::BufReader, mem::size_of, path::Path};

const ARCSEC_PER_DEG: C = 3600.0;

/// Sample value marking a void in SRTM data.
pub const HGT_VOID: i16 = i16::MIN;

impl Raster {
    /// Returns a Raster read into memory from the HGT file at `path`,
    /// with `overviews` levels generated below full resolution.
    pub fn from_hgt<P: AsRef<Path>>(path: P, overviews: usize) -> Result<Self, RasterError> {
        let (arcsec, side) = extract_resolution(&path)?;
        let sw_corner = parse_sw_corner(&path)?;
        let resolution = C::from(arcsec) / ARCSEC_PER_DEG;

        // Samples are centered on whole degrees, so the grid's outer
        // edge sits half a sample beyond the tile corner.
        let origin = Coord {
            x: C::from(sw_corner.x) - resolution / 2.0,
            y: C::from(sw_corner.y) + 1.0 + resolution / 2.0,
        };

        let raster = Raster::builder()
            .crs(Crs::Geographic)
            .origin(origin)
            .resolution(resolution)
            .dimensions(side, side)
            .nodata(f32::from(HGT_VOID))
            .overviews(overviews)
            .build()?;

        let samples = {
            let mut file = BufReader::new(File::open(&path)?);
            let mut samples = Vec::with_capacity(side * side);
            for _ in 0..(side * side) {
                samples.push(f32::from(file.read_i16::<BE>()?));
            }
            samples
        };

        let now = std::time::Instant::now();
        raster.load_level(0, &samples)?;
        raster.build_overviews();
        debug!(
            "loaded {:?}; tiles: {}, exec: {:?}",
            path.as_ref(),
            raster.loaded_tiles(),
            now.elapsed()
        );

        Ok(raster)
    }
}

/// Returns (arcseconds per sample, samples per side).
fn extract_resolution<P: AsRef<Path>>(path: P) -> Result<(u8, usize), RasterError> {
    const RES_1_ARCSECOND_LEN: u64 = 3601 * 3601 * size_of::<i16>() as u64;
    const RES_3_ARCSECOND_LEN: u64 = 1201 * 1201 * size_of::<i16>() as u64;
    match path.as_ref().metadata().map(|m| m.len())? {
        RES_1_ARCSECOND_LEN => Ok((1, 3601)),
        RES_3_ARCSECOND_LEN => Ok((3, 1201)),
        invalid_len => Err(RasterError::HgtLen(invalid_len, path.as_ref().to_owned())),
    }
}

fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i16>, RasterError> {
    let mk_err = || RasterError::HgtName(path.as_ref().to_owned());
    let name = path
        .as_ref()
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(mk_err)?;
    if name.len() != 7 || !name.is_ascii() {
        return Err(mk_err());
    }
    let lat_sign = match &name[0..1] {
        "N" | "n" => 1,
        "S" | "s" => -1,
        _ => return Err(mk_err()),
    };
    let lat = lat_sign * name[1..3].parse::<i16>().map_err(|_| mk_err())?;
    let lon_sign = match &name[3..4] {
        "E" | "e" => 1,
        "W" | "w" => -1,
        _ => return Err(mk_err()),
    };
    let lon = lon_sign * name[4..7].parse::<i16>().map_err(|_| mk_err())?;
    Ok(Coord { x: lon, y: lat })
}
