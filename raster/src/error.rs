use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("missing required parameters")]
    Builder,

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid HGT name {0}")]
    HgtName(PathBuf),

    #[error("invalid HGT file len {0} for {1}")]
    HgtLen(u64, PathBuf),

    #[error("level {0} out of range, raster has {1} levels")]
    Level(usize, usize),

    #[error("tile ({x}, {y}) out of range for level {level}")]
    Tile { level: usize, x: usize, y: usize },

    #[error("expected {expected} samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },
}
