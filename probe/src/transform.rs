//! Conversions between a map projection and longitude/latitude.
//!
//! Web Mercator here is the spherical variant used by web maps
//! (EPSG:3857), so both directions are closed-form and exact up to
//! floating point error.

use crate::{GeoPoint, ProbeError};
use geo::geometry::Coord;
use raster::Crs;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Sphere radius used by Web Mercator, in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Web Mercator easting/northing of the antimeridian, in metres.
pub const MERCATOR_HALF_WORLD: f64 = PI * EARTH_RADIUS;

/// Converts a coordinate in `projection`'s native units to a
/// geographic point.
pub fn to_geo(projection: Crs, coord: Coord<f64>) -> Result<GeoPoint, ProbeError> {
    let invalid = || ProbeError::InvalidCoordinate(coord.x, coord.y);
    if !(coord.x.is_finite() && coord.y.is_finite()) {
        return Err(invalid());
    }
    match projection {
        Crs::Geographic => GeoPoint::new(coord.x, coord.y),
        Crs::WebMercator => {
            if coord.x.abs() > MERCATOR_HALF_WORLD {
                return Err(invalid());
            }
            let longitude = (coord.x / EARTH_RADIUS).to_degrees();
            let latitude = (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
            GeoPoint::new(longitude.clamp(-180.0, 180.0), latitude)
        }
    }
}

/// Converts a geographic point to `projection`'s native units.
///
/// The poles have no Web Mercator representation and are rejected.
pub fn to_map(projection: Crs, point: GeoPoint) -> Result<Coord<f64>, ProbeError> {
    match projection {
        Crs::Geographic => Ok(Coord {
            x: point.longitude(),
            y: point.latitude(),
        }),
        Crs::WebMercator if point.latitude().abs() < 90.0 => {
            let x = EARTH_RADIUS * point.longitude().to_radians();
            let y = EARTH_RADIUS * (FRAC_PI_4 + point.latitude().to_radians() / 2.0).tan().ln();
            Ok(Coord { x, y })
        }
        Crs::WebMercator => Err(ProbeError::InvalidCoordinate(
            point.longitude(),
            point.latitude(),
        )),
    }
}

/// Converts a ground resolution (native units per display unit) from
/// one projection's units to another's.
///
/// Web Mercator easting is linear in longitude, so the conversion is
/// the same at every latitude.
pub fn convert_resolution(resolution: f64, from: Crs, to: Crs) -> f64 {
    const METRES_PER_DEGREE: f64 = MERCATOR_HALF_WORLD / 180.0;
    match (from, to) {
        (Crs::Geographic, Crs::Geographic) | (Crs::WebMercator, Crs::WebMercator) => resolution,
        (Crs::WebMercator, Crs::Geographic) => resolution / METRES_PER_DEGREE,
        (Crs::Geographic, Crs::WebMercator) => resolution * METRES_PER_DEGREE,
    }
}
