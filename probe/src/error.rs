use raster::RasterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid coordinate ({0}, {1})")]
    InvalidCoordinate(f64, f64),

    #[error("invalid resolution {0}")]
    InvalidResolution(f64),

    #[error("sample unavailable: {0}")]
    SampleUnavailable(String),

    #[error("stale response for {slot:?} request {seq}")]
    StaleResponse { slot: crate::Slot, seq: u64 },

    #[error("{0}")]
    Raster(#[from] RasterError),
}
