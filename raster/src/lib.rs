//! Tiled, multi-resolution rasters.
//!
//! A [Raster] has the same shape as a cloud-optimized GeoTIFF: a full
//! resolution grid plus a pyramid of overviews, each level cut into
//! square tiles. Tiles arrive independently (see
//! [`Raster::insert_tile`]) and a lookup against a tile which hasn't
//! arrived yet reports [`Pixel::NotLoaded`] rather than failing.
//!
//! # References
//!
//! 1. [Cloud Optimized GeoTIFF](https://www.cogeo.org/in-depth.html)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

mod error;
mod hgt;
mod tile;

pub use crate::{error::RasterError, hgt::HGT_VOID, tile::TileKey};
use crate::tile::Tile;
use dashmap::DashMap;
use geo::geometry::{Coord, Rect};
use log::trace;
use std::sync::Arc;

/// Base floating point type used for all coordinates.
pub type C = f64;

/// Default edge length, in pixels, of a raster tile.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Coordinate reference systems understood by this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326).
    Geographic,

    /// Spherical Web Mercator in metres (EPSG:3857).
    WebMercator,
}

impl Crs {
    pub fn epsg(self) -> u32 {
        match self {
            Self::Geographic => 4326,
            Self::WebMercator => 3857,
        }
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Self::Geographic),
            3857 | 900_913 => Some(Self::WebMercator),
            _ => None,
        }
    }
}

/// Result of looking up a single pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixel {
    /// One entry per band, `None` where the band holds no-data.
    Values(Vec<Option<f32>>),

    /// The coordinate lies outside the raster.
    OutOfExtent,

    /// The tile covering the coordinate hasn't been loaded.
    NotLoaded,
}

impl Pixel {
    /// Returns the first band's value, if any.
    pub fn first(&self) -> Option<f32> {
        match self {
            Self::Values(values) => values.first().copied().flatten(),
            Self::OutOfExtent | Self::NotLoaded => None,
        }
    }
}

pub struct Raster {
    /// Native reference frame of the grid.
    crs: Crs,

    /// NW corner of the NW-most pixel, in native units.
    origin: Coord<C>,

    /// Native units per pixel at full resolution.
    resolution: C,

    /// Full resolution (columns, rows).
    dimensions: (usize, usize),

    /// Number of bands per pixel.
    bands: usize,

    /// Sentinel marking masked or void samples.
    nodata: Option<f32>,

    /// Edge length of every tile, in pixels.
    tile_size: usize,

    /// Number of pyramid levels, including full resolution.
    levels: usize,

    /// Tiles which have been loaded so far.
    tiles: DashMap<TileKey, Arc<Tile>>,
}

impl Raster {
    pub fn builder() -> RasterBuilder {
        RasterBuilder {
            crs: Crs::Geographic,
            origin: None,
            resolution: None,
            dimensions: None,
            bands: 1,
            nodata: None,
            tile_size: DEFAULT_TILE_SIZE,
            overviews: 0,
        }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Returns the number of pyramid levels, full resolution included.
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Returns native units per pixel at `level`.
    pub fn resolution(&self, level: usize) -> C {
        self.resolution * scale(level) as C
    }

    /// Returns (columns, rows) at `level`.
    pub fn dimensions(&self, level: usize) -> (usize, usize) {
        let (cols, rows) = self.dimensions;
        let scale = scale(level);
        (cols.div_ceil(scale).max(1), rows.div_ceil(scale).max(1))
    }

    /// Returns the number of tiles (across, down) at `level`.
    pub fn tile_grid(&self, level: usize) -> (usize, usize) {
        let (cols, rows) = self.dimensions(level);
        (cols.div_ceil(self.tile_size), rows.div_ceil(self.tile_size))
    }

    /// Returns the area covered by the full resolution grid, in native
    /// units.
    pub fn extent(&self) -> Rect<C> {
        let (cols, rows) = self.dimensions;
        #[allow(clippy::cast_precision_loss)]
        let se = Coord {
            x: self.origin.x + cols as C * self.resolution,
            y: self.origin.y - rows as C * self.resolution,
        };
        Rect::new(self.origin, se)
    }

    /// Returns the pyramid level whose resolution is nearest to
    /// `resolution` (native units per pixel).
    ///
    /// Distance is measured in powers of two, and a tie goes to the
    /// finer level.
    pub fn level_for_resolution(&self, resolution: C) -> usize {
        if !(resolution.is_finite() && resolution > 0.0) {
            return 0;
        }
        let ideal = (resolution / self.resolution).log2();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let level = (ideal - 0.5).ceil().max(0.0) as usize;
        level.min(self.levels - 1)
    }

    /// Converts native coordinates to (column, row) at `level`, or
    /// `None` if `coord` is outside the raster.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn world_to_pixel(&self, coord: Coord<C>, level: usize) -> Option<(usize, usize)> {
        // Bounds are checked on the full resolution grid. Overview grids
        // are rounded up and overhang its east and south edges.
        let px = (coord.x - self.origin.x) / self.resolution;
        let py = (self.origin.y - coord.y) / self.resolution;
        let (cols, rows) = self.dimensions;
        if level >= self.levels
            || px.is_nan()
            || py.is_nan()
            || px < 0.0
            || py < 0.0
            || px >= cols as C
            || py >= rows as C
        {
            return None;
        }
        let scale = scale(level);
        Some((px as usize / scale, py as usize / scale))
    }

    /// Returns the pixel at native coordinates `coord` on `level`.
    pub fn get(&self, coord: Coord<C>, level: usize) -> Pixel {
        if level >= self.levels {
            return Pixel::OutOfExtent;
        }
        match self.world_to_pixel(coord, level) {
            Some((col, row)) => self.get_xy(level, (col, row)),
            None => {
                trace!("{coord:?} outside raster extent");
                Pixel::OutOfExtent
            }
        }
    }

    /// Returns the pixel at (`col`, `row`) on `level`.
    pub fn get_xy(&self, level: usize, (col, row): (usize, usize)) -> Pixel {
        if level >= self.levels {
            return Pixel::OutOfExtent;
        }
        let (cols, rows) = self.dimensions(level);
        if col >= cols || row >= rows {
            return Pixel::OutOfExtent;
        }
        let ts = self.tile_size;
        let key = TileKey::new(level, col / ts, row / ts);
        let Some(tile) = self.tiles.get(&key) else {
            trace!("{key:?} not loaded");
            return Pixel::NotLoaded;
        };
        let values = (0..self.bands)
            .map(|band| self.valid(tile.get(band, col % ts, row % ts)))
            .collect();
        Pixel::Values(values)
    }

    /// Returns `true` if the tile at `key` has been loaded.
    pub fn is_loaded(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    /// Returns the number of tiles loaded across all levels.
    pub fn loaded_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Stores a decoded tile.
    ///
    /// `samples` must hold `tile_size * tile_size` samples for every
    /// band, band-sequential then row-major. Replaces any tile already
    /// stored at `key`.
    pub fn insert_tile(&self, key: TileKey, samples: Vec<f32>) -> Result<(), RasterError> {
        self.check_level(key.level)?;
        let (tiles_x, tiles_y) = self.tile_grid(key.level);
        if key.x >= tiles_x || key.y >= tiles_y {
            return Err(RasterError::Tile {
                level: key.level,
                x: key.x,
                y: key.y,
            });
        }
        let expected = self.tile_size * self.tile_size * self.bands;
        if samples.len() != expected {
            return Err(RasterError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        self.tiles.insert(
            key,
            Arc::new(Tile::new(self.tile_size, samples.into_boxed_slice())),
        );
        Ok(())
    }

    /// Cuts a whole level's samples into tiles and stores them.
    ///
    /// `samples` holds every pixel of `level` for every band,
    /// band-sequential then row-major from the NW corner.
    pub fn load_level(&self, level: usize, samples: &[f32]) -> Result<(), RasterError> {
        self.check_level(level)?;
        let (cols, rows) = self.dimensions(level);
        let expected = cols * rows * self.bands;
        if samples.len() != expected {
            return Err(RasterError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }

        let ts = self.tile_size;
        let (tiles_x, tiles_y) = self.tile_grid(level);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let mut tile = vec![self.fill(); ts * ts * self.bands];
                for band in 0..self.bands {
                    let band_offset = band * cols * rows;
                    for r in 0..ts.min(rows - ty * ts) {
                        let row = ty * ts + r;
                        for c in 0..ts.min(cols - tx * ts) {
                            let col = tx * ts + c;
                            tile[band * ts * ts + r * ts + c] =
                                samples[band_offset + row * cols + col];
                        }
                    }
                }
                self.tiles.insert(
                    TileKey::new(level, tx, ty),
                    Arc::new(Tile::new(ts, tile.into_boxed_slice())),
                );
            }
        }
        Ok(())
    }

    /// Generates overview levels from the level below each.
    ///
    /// Every overview pixel is the mean of the valid samples among the
    /// 2x2 pixels it covers, or no-data if none are valid. Overview
    /// tiles whose source tiles aren't all loaded are left unloaded.
    pub fn build_overviews(&self) {
        let ts = self.tile_size;
        for level in 1..self.levels {
            let (cols, rows) = self.dimensions(level);
            let (tiles_x, tiles_y) = self.tile_grid(level);
            for ty in 0..tiles_y {
                for tx in 0..tiles_x {
                    let key = TileKey::new(level, tx, ty);
                    if !self.sources_loaded(key) {
                        trace!("skipping overview {key:?}, sources not loaded");
                        continue;
                    }
                    let mut tile = vec![self.fill(); ts * ts * self.bands];
                    for r in 0..ts.min(rows - ty * ts) {
                        for c in 0..ts.min(cols - tx * ts) {
                            let means = self.downsample(level - 1, (tx * ts + c, ty * ts + r));
                            for (band, mean) in means.into_iter().enumerate() {
                                if let Some(mean) = mean {
                                    tile[band * ts * ts + r * ts + c] = mean;
                                }
                            }
                        }
                    }
                    self.tiles
                        .insert(key, Arc::new(Tile::new(ts, tile.into_boxed_slice())));
                }
            }
        }
    }
}

/// Private API.
impl Raster {
    fn check_level(&self, level: usize) -> Result<(), RasterError> {
        if level < self.levels {
            Ok(())
        } else {
            Err(RasterError::Level(level, self.levels))
        }
    }

    /// Value written where there is no sample.
    fn fill(&self) -> f32 {
        self.nodata.unwrap_or(f32::NAN)
    }

    fn valid(&self, sample: f32) -> Option<f32> {
        if sample.is_nan() || Some(sample) == self.nodata {
            None
        } else {
            Some(sample)
        }
    }

    /// Per-band mean of the valid samples in the 2x2 block of `level`
    /// under pixel (`col`, `row`) of `level + 1`.
    #[allow(clippy::cast_possible_truncation)]
    fn downsample(&self, level: usize, (col, row): (usize, usize)) -> Vec<Option<f32>> {
        let mut sums = vec![0.0_f64; self.bands];
        let mut counts = vec![0_u32; self.bands];
        for (dc, dr) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            if let Pixel::Values(values) = self.get_xy(level, (2 * col + dc, 2 * row + dr)) {
                for (band, value) in values.into_iter().enumerate() {
                    if let Some(value) = value {
                        sums[band] += f64::from(value);
                        counts[band] += 1;
                    }
                }
            }
        }
        sums.into_iter()
            .zip(counts)
            .map(|(sum, n)| (n > 0).then(|| (sum / f64::from(n)) as f32))
            .collect()
    }

    /// Returns `true` if every tile on the level below `key` that it
    /// is derived from has been loaded.
    fn sources_loaded(&self, key: TileKey) -> bool {
        let source_level = key.level - 1;
        let (tiles_x, tiles_y) = self.tile_grid(source_level);
        (2 * key.y..(2 * key.y + 2).min(tiles_y)).all(|y| {
            (2 * key.x..(2 * key.x + 2).min(tiles_x))
                .all(|x| self.is_loaded(TileKey::new(source_level, x, y)))
        })
    }
}

fn scale(level: usize) -> usize {
    1 << level
}

pub struct RasterBuilder {
    crs: Crs,

    origin: Option<Coord<C>>,

    resolution: Option<C>,

    dimensions: Option<(usize, usize)>,

    bands: usize,

    nodata: Option<f32>,

    tile_size: usize,

    /// Number of overview levels below full resolution.
    overviews: usize,
}

impl RasterBuilder {
    pub fn crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    /// NW corner of the NW-most pixel, in native units.
    pub fn origin(mut self, origin: Coord<C>) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Native units per pixel at full resolution.
    pub fn resolution(mut self, resolution: C) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Full resolution (columns, rows).
    pub fn dimensions(mut self, cols: usize, rows: usize) -> Self {
        self.dimensions = Some((cols, rows));
        self
    }

    pub fn bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    pub fn nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn overviews(mut self, overviews: usize) -> Self {
        self.overviews = overviews;
        self
    }

    pub fn build(self) -> Result<Raster, RasterError> {
        match (self.origin, self.resolution, self.dimensions) {
            (Some(origin), Some(resolution), Some((cols, rows)))
                if origin.x.is_finite()
                    && origin.y.is_finite()
                    && resolution.is_finite()
                    && resolution > 0.0
                    && cols > 0
                    && rows > 0
                    && self.bands > 0
                    && self.tile_size > 0
                    && self.overviews < usize::BITS as usize =>
            {
                Ok(Raster {
                    crs: self.crs,
                    origin,
                    resolution,
                    dimensions: (cols, rows),
                    bands: self.bands,
                    nodata: self.nodata,
                    tile_size: self.tile_size,
                    levels: self.overviews + 1,
                    tiles: DashMap::new(),
                })
            }
            _ => Err(RasterError::Builder),
        }
    }
}
