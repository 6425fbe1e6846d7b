use crate::ProbeError;
use geo::geometry::Point;
use serde::Serialize;

/// A validated longitude/latitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    /// Returns a point if `longitude` is within [-180, 180] and
    /// `latitude` within [-90, 90].
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, ProbeError> {
        if (-180.0..=180.0).contains(&longitude) && (-90.0..=90.0).contains(&latitude) {
            Ok(Self {
                longitude,
                latitude,
            })
        } else {
            Err(ProbeError::InvalidCoordinate(longitude, latitude))
        }
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(GeoPoint { longitude, latitude }: GeoPoint) -> Self {
        Point::new(longitude, latitude)
    }
}

impl TryFrom<Point<f64>> for GeoPoint {
    type Error = ProbeError;

    fn try_from(point: Point<f64>) -> Result<Self, ProbeError> {
        Self::new(point.x(), point.y())
    }
}

#[cfg(test)]
mod tests {
    use super::GeoPoint;
    use crate::ProbeError;
    use geo::geometry::Point;

    #[test]
    fn test_bounds() {
        assert!(GeoPoint::new(180.0, 90.0).is_ok());
        assert!(GeoPoint::new(-180.0, -90.0).is_ok());
        assert!(matches!(
            GeoPoint::new(180.1, 0.0),
            Err(ProbeError::InvalidCoordinate(..))
        ));
        assert!(GeoPoint::new(0.0, -90.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_geo_point_conversion() {
        let india = GeoPoint::new(78.9629, 20.5937).unwrap();
        let point = Point::from(india);
        assert_eq!((point.x(), point.y()), (78.9629, 20.5937));
        assert_eq!(GeoPoint::try_from(point).unwrap(), india);
        assert!(GeoPoint::try_from(Point::new(0.0, 91.0)).is_err());
    }
}
