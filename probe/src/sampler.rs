//! Resolving geographic points against a raster.

use crate::{transform, GeoPoint, ProbeError};
use log::{debug, trace};
use raster::{Crs, Pixel, Raster};
use serde::{Deserialize, Serialize};
use std::{future::Future, path::Path, sync::Arc};

/// Value sampled at a point.
///
/// `value` is `None` when there is no data at `point`: outside the
/// raster, a masked sample, a tile that hasn't loaded, or a failed
/// read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleResult {
    pub point: GeoPoint,
    pub value: Option<f64>,
    /// Every band's value, when all bands were requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bands: Vec<Option<f64>>,
}

impl SampleResult {
    pub fn no_data(point: GeoPoint) -> Self {
        Self {
            point,
            value: None,
            bands: Vec::new(),
        }
    }
}

/// Which bands a sampler reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BandSelection {
    /// Only the first band, as [`SampleResult::value`].
    #[default]
    First,

    /// The first band as [`SampleResult::value`], plus every band in
    /// [`SampleResult::bands`].
    All,
}

/// An asynchronous source of raster values.
///
/// Requests can't be cancelled. Callers which only care about the
/// latest of several in-flight requests must tag them and drop stale
/// responses themselves (see [`Session`](crate::Session)).
pub trait Sampler {
    /// Samples the raster at `point`.
    ///
    /// `resolution` is ground distance per display unit in
    /// `projection`'s units and picks the raster level to read. A
    /// point without data is `Ok` with a `None` value; `Err` is
    /// reserved for failed reads and invalid requests.
    fn sample(
        &self,
        point: GeoPoint,
        resolution: f64,
        projection: Crs,
    ) -> impl Future<Output = Result<SampleResult, ProbeError>> + Send;
}

/// Samples an in-process [Raster].
#[derive(Clone)]
pub struct RasterSampler {
    raster: Arc<Raster>,
    bands: BandSelection,
}

impl RasterSampler {
    pub fn new(raster: Arc<Raster>) -> Self {
        Self {
            raster,
            bands: BandSelection::default(),
        }
    }

    /// Returns a sampler over the `.hgt` tile at `path`, with
    /// `overviews` levels below full resolution.
    pub fn from_hgt<P: AsRef<Path>>(path: P, overviews: usize) -> Result<Self, ProbeError> {
        let raster = Raster::from_hgt(path, overviews)?;
        Ok(Self::new(Arc::new(raster)))
    }

    pub fn bands(mut self, bands: BandSelection) -> Self {
        self.bands = bands;
        self
    }

    pub fn raster(&self) -> &Arc<Raster> {
        &self.raster
    }
}

impl Sampler for RasterSampler {
    fn sample(
        &self,
        point: GeoPoint,
        resolution: f64,
        projection: Crs,
    ) -> impl Future<Output = Result<SampleResult, ProbeError>> + Send {
        let raster = Arc::clone(&self.raster);
        let bands = self.bands;
        async move { lookup(&raster, bands, point, resolution, projection) }
    }
}

fn lookup(
    raster: &Raster,
    bands: BandSelection,
    point: GeoPoint,
    resolution: f64,
    projection: Crs,
) -> Result<SampleResult, ProbeError> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(ProbeError::InvalidResolution(resolution));
    }

    // A point with no representation in the raster's frame (a pole
    // against a Web Mercator raster) can't be inside it.
    let Ok(native) = transform::to_map(raster.crs(), point) else {
        trace!("{point:?} not representable in {:?}", raster.crs());
        return Ok(SampleResult::no_data(point));
    };
    let native_resolution = transform::convert_resolution(resolution, projection, raster.crs());
    let level = raster.level_for_resolution(native_resolution);

    match raster.get(native, level) {
        Pixel::Values(values) => {
            let values: Vec<Option<f64>> = values.into_iter().map(|v| v.map(f64::from)).collect();
            let value = values.first().copied().flatten();
            if value.is_none() {
                trace!("{point:?} is no-data at level {level}");
            }
            Ok(SampleResult {
                point,
                value,
                bands: match bands {
                    BandSelection::First => Vec::new(),
                    BandSelection::All => values,
                },
            })
        }
        Pixel::OutOfExtent => {
            trace!("{point:?} outside raster");
            Ok(SampleResult::no_data(point))
        }
        Pixel::NotLoaded => {
            debug!("{point:?} level {level} tile not loaded");
            Ok(SampleResult::no_data(point))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BandSelection, RasterSampler, Sampler};
    use crate::{transform, GeoPoint, ProbeError};
    use geo::geometry::Coord;
    use raster::{Crs, Raster, RasterError, TileKey};
    use std::sync::Arc;

    const NODATA: f32 = -9999.0;

    /// 0.25 degree pixels covering lon [78, 79], lat [20, 21], with
    /// one overview. Pixel value is `100 * row + col`, except the
    /// SE-most pixel, which is no-data.
    fn india() -> Arc<Raster> {
        let raster = Raster::builder()
            .crs(Crs::Geographic)
            .origin(Coord { x: 78.0, y: 21.0 })
            .resolution(0.25)
            .dimensions(4, 4)
            .nodata(NODATA)
            .tile_size(2)
            .overviews(1)
            .build()
            .unwrap();
        let mut samples: Vec<f32> = (0..4_u16)
            .flat_map(|row| (0..4_u16).map(move |col| f32::from(100 * row + col)))
            .collect();
        samples[15] = NODATA;
        raster.load_level(0, &samples).unwrap();
        raster.build_overviews();
        Arc::new(raster)
    }

    fn point(lon: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lon, lat).unwrap()
    }

    #[tokio::test]
    async fn test_sample_full_resolution() {
        let sampler = RasterSampler::new(india());
        // Row 1 (20.5..20.75), col 3 (78.75..79.0).
        let result = sampler
            .sample(point(78.9629, 20.5937), 0.1, Crs::Geographic)
            .await
            .unwrap();
        assert_eq!(result.value, Some(103.0));
        assert!(result.bands.is_empty());
    }

    #[tokio::test]
    async fn test_sample_overview() {
        let sampler = RasterSampler::new(india());
        // Mean of 2, 3, 102, 103.
        let result = sampler
            .sample(point(78.9629, 20.5937), 0.5, Crs::Geographic)
            .await
            .unwrap();
        assert_eq!(result.value, Some(52.5));
    }

    #[tokio::test]
    async fn test_sample_with_mercator_resolution() {
        let sampler = RasterSampler::new(india());
        // ~0.25 degrees per pixel expressed in Web Mercator metres.
        let metres = transform::convert_resolution(0.25, Crs::Geographic, Crs::WebMercator);
        let fine = sampler
            .sample(point(78.9629, 20.5937), metres, Crs::WebMercator)
            .await
            .unwrap();
        assert_eq!(fine.value, Some(103.0));
        let coarse = sampler
            .sample(point(78.9629, 20.5937), metres * 2.0, Crs::WebMercator)
            .await
            .unwrap();
        assert_eq!(coarse.value, Some(52.5));
    }

    #[tokio::test]
    async fn test_outside_extent_is_no_data() {
        let sampler = RasterSampler::new(india());
        let result = sampler
            .sample(point(-71.3, 44.27), 0.1, Crs::Geographic)
            .await
            .unwrap();
        assert_eq!(result.value, None);
        assert_eq!(result.point, point(-71.3, 44.27));
    }

    #[tokio::test]
    async fn test_outside_extent_on_overview() {
        // 3x3 pixels; the rounded up overview reaches x = 4.
        let raster = Raster::builder()
            .origin(Coord { x: 0.0, y: 3.0 })
            .resolution(1.0)
            .dimensions(3, 3)
            .tile_size(2)
            .overviews(1)
            .build()
            .unwrap();
        raster.load_level(0, &[1.0; 9]).unwrap();
        raster.build_overviews();
        let sampler = RasterSampler::new(Arc::new(raster));
        for resolution in [1.0, 2.0] {
            let outside = sampler
                .sample(point(3.5, 1.5), resolution, Crs::Geographic)
                .await
                .unwrap();
            assert_eq!(outside.value, None);
        }
        let inside = sampler
            .sample(point(2.5, 1.5), 2.0, Crs::Geographic)
            .await
            .unwrap();
        assert_eq!(inside.value, Some(1.0));
    }

    #[tokio::test]
    async fn test_masked_pixel_is_no_data() {
        let sampler = RasterSampler::new(india());
        let result = sampler
            .sample(point(78.9, 20.1), 0.1, Crs::Geographic)
            .await
            .unwrap();
        assert_eq!(result.value, None);
    }

    #[tokio::test]
    async fn test_unloaded_tile_is_no_data() {
        let raster = Raster::builder()
            .origin(Coord { x: 0.0, y: 2.0 })
            .resolution(1.0)
            .dimensions(2, 2)
            .tile_size(1)
            .build()
            .unwrap();
        raster.insert_tile(TileKey::new(0, 0, 0), vec![7.0]).unwrap();
        let sampler = RasterSampler::new(Arc::new(raster));
        let loaded = sampler
            .sample(point(0.5, 1.5), 1.0, Crs::Geographic)
            .await
            .unwrap();
        let pending = sampler
            .sample(point(1.5, 1.5), 1.0, Crs::Geographic)
            .await
            .unwrap();
        assert_eq!(loaded.value, Some(7.0));
        assert_eq!(pending.value, None);
    }

    #[tokio::test]
    async fn test_all_bands() {
        let raster = Raster::builder()
            .origin(Coord { x: 0.0, y: 1.0 })
            .resolution(1.0)
            .dimensions(1, 1)
            .bands(2)
            .tile_size(1)
            .build()
            .unwrap();
        raster.load_level(0, &[1.5, f32::NAN]).unwrap();
        let sampler = RasterSampler::new(Arc::new(raster)).bands(BandSelection::All);
        let result = sampler
            .sample(point(0.5, 0.5), 1.0, Crs::Geographic)
            .await
            .unwrap();
        assert_eq!(result.value, Some(1.5));
        assert_eq!(result.bands, vec![Some(1.5), None]);
    }

    #[test]
    fn test_from_hgt() {
        let dir = std::env::temp_dir().join(format!("probe-sampler-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = RasterSampler::from_hgt(dir.join("N89E179.hgt"), 0);
        assert!(matches!(
            missing,
            Err(ProbeError::Raster(RasterError::Io(_)))
        ));

        // Three arcsecond tile, every sample 7.
        let path = dir.join("N20E078.hgt");
        let samples: Vec<u8> = (0..1201 * 1201).flat_map(|_| 7_i16.to_be_bytes()).collect();
        std::fs::write(&path, samples).unwrap();
        let sampler = RasterSampler::from_hgt(&path, 1).unwrap();
        assert_eq!(sampler.raster().dimensions(0), (1201, 1201));
        assert_eq!(sampler.raster().levels(), 2);
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_resolution() {
        let sampler = RasterSampler::new(india());
        for resolution in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                sampler
                    .sample(point(78.5, 20.5), resolution, Crs::Geographic)
                    .await,
                Err(ProbeError::InvalidResolution(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_pole_against_mercator_raster() {
        let raster = Raster::builder()
            .crs(Crs::WebMercator)
            .origin(Coord {
                x: -transform::MERCATOR_HALF_WORLD,
                y: transform::MERCATOR_HALF_WORLD,
            })
            .resolution(transform::MERCATOR_HALF_WORLD)
            .dimensions(2, 2)
            .build()
            .unwrap();
        raster.load_level(0, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let sampler = RasterSampler::new(Arc::new(raster));
        let pole = sampler
            .sample(point(0.0, 90.0), 1000.0, Crs::WebMercator)
            .await
            .unwrap();
        assert_eq!(pole.value, None);
        let ne = sampler
            .sample(point(90.0, 45.0), 1000.0, Crs::WebMercator)
            .await
            .unwrap();
        assert_eq!(ne.value, Some(2.0));
    }
}
