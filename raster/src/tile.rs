/// Location of a tile within a [Raster](crate::Raster)'s pyramid.
///
/// `x` and `y` count tiles from the NW corner of `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub level: usize,
    pub x: usize,
    pub y: usize,
}

impl TileKey {
    pub fn new(level: usize, x: usize, y: usize) -> Self {
        Self { level, x, y }
    }
}

/// A square block of samples for every band.
///
/// Samples are stored band-sequential (planar), then row-major, the
/// same layout a planar-configured GeoTIFF tile decodes to. Tiles at
/// the right and bottom edges are padded out to the full tile size.
pub(crate) struct Tile {
    size: usize,
    samples: Box<[f32]>,
}

impl Tile {
    pub(crate) fn new(size: usize, samples: Box<[f32]>) -> Self {
        debug_assert_eq!(samples.len() % (size * size), 0);
        Self { size, samples }
    }

    #[inline]
    pub(crate) fn get(&self, band: usize, col: usize, row: usize) -> f32 {
        self.samples[band * self.size * self.size + row * self.size + col]
    }
}
