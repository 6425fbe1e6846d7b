//! Interactive raster probing.
//!
//! A [Session] turns map interactions into samples of a raster and
//! collects them into pins or a path, from which an elevation
//! [profile](profile::derive) is derived. The raster is reached through
//! a [Sampler], normally a [RasterSampler] over a [raster::Raster].

mod config;
mod error;
mod path;
mod pins;
mod point;
pub mod profile;
mod sampler;
mod session;
pub mod transform;

pub use crate::{
    config::{Mode, SessionConfig},
    error::ProbeError,
    path::{PathAccumulator, PathState, PathVertex},
    pins::{Pin, PinStore},
    point::GeoPoint,
    profile::{ProfileBuilder, ProfileSample, Spacing},
    sampler::{BandSelection, RasterSampler, SampleResult, Sampler},
    session::{Completed, Event, Pending, Session, Slot, Update, ViewEvent},
};
pub use geo;
pub use raster::{self, Crs};
