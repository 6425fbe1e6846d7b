//! The interaction layer: map events in, store updates out.
//!
//! Handling an event is split in three so that sampling, the only
//! step which suspends, never holds a borrow of the session:
//!
//! 1. [`Session::begin`] converts the event to a geographic point and
//!    tags a [`Pending`] request with a sequence number.
//! 1. [`Pending::resolve`] samples the raster, bounded by a timeout.
//! 1. [`Session::apply`] merges the [`Completed`] sample into the
//!    stores, unless a newer one has already been applied.
//!
//! Several requests may be in flight at once and complete in any
//! order. Hover responses older than the newest hover already applied
//! are dropped. Pin and path responses are applied in arrival order,
//! but path responses issued before a [`Session::reset_path`] are
//! dropped.

use crate::{
    transform, GeoPoint, Mode, PathAccumulator, PathState, PathVertex, Pin, PinStore,
    ProbeError, ProfileBuilder, ProfileSample, SampleResult, Sampler, SessionConfig,
};
use geo::geometry::Coord;
use log::{debug, trace, warn};
use raster::Crs;
use std::{collections::HashMap, time::Duration};

/// Logical request stream a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Pointer-move probing.
    Hover,

    /// Click in pin-drop or combined mode.
    Pin,

    /// Click in path-drawing mode.
    PathStep,
}

/// Where and at what scale the view was interacted with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewEvent {
    /// Location in `projection`'s native units.
    pub coordinate: Coord<f64>,

    /// Ground distance per display unit, in `projection`'s units.
    pub resolution: f64,

    pub projection: Crs,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    PointerMoved(ViewEvent),
    Clicked(ViewEvent),
}

/// Change to a session's state produced by an applied sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Latest value under the pointer.
    Hover(SampleResult),

    PinAdded(Pin),

    /// The path grew; `profile` is the full recomputed profile.
    VertexAppended {
        vertex: PathVertex,
        profile: Vec<ProfileSample>,
    },
}

/// A tagged sample request which hasn't been resolved yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pending {
    slot: Slot,
    seq: u64,
    point: GeoPoint,
    resolution: f64,
    projection: Crs,
    /// Path epoch when issued, if the sample feeds the path.
    path_epoch: Option<u64>,
}

impl Pending {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn point(&self) -> GeoPoint {
        self.point
    }

    /// Samples `sampler`, treating no answer within `timeout` as a
    /// failure.
    pub async fn resolve<S: Sampler>(self, sampler: &S, timeout: Duration) -> Completed {
        let now = std::time::Instant::now();
        let outcome = match tokio::time::timeout(
            timeout,
            sampler.sample(self.point, self.resolution, self.projection),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::SampleUnavailable(format!(
                "no response after {timeout:?}"
            ))),
        };
        debug!(
            "resolved {:?} request {}; exec: {:?}",
            self.slot,
            self.seq,
            now.elapsed()
        );
        Completed {
            pending: self,
            outcome,
        }
    }
}

/// A resolved sample request, ready to apply.
#[derive(Debug)]
pub struct Completed {
    pending: Pending,
    outcome: Result<SampleResult, ProbeError>,
}

impl Completed {
    pub fn slot(&self) -> Slot {
        self.pending.slot
    }

    pub fn seq(&self) -> u64 {
        self.pending.seq
    }
}

/// One interactive view's probing state.
pub struct Session {
    config: SessionConfig,

    pins: PinStore,

    path: PathAccumulator,

    profile: ProfileBuilder,

    /// Sequence number for the next request, shared by all slots.
    next_seq: u64,

    /// Highest sequence number applied per slot.
    applied: HashMap<Slot, u64>,

    /// Incremented by every path reset.
    path_epoch: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let profile = ProfileBuilder::new().spacing(config.spacing);
        Self {
            config,
            pins: PinStore::new(),
            path: PathAccumulator::new(),
            profile,
            next_seq: 0,
            applied: HashMap::new(),
            path_epoch: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn pins(&self) -> &[Pin] {
        self.pins.list()
    }

    pub fn vertices(&self) -> &[PathVertex] {
        self.path.vertices()
    }

    pub fn path_state(&self) -> PathState {
        self.path.state()
    }

    pub fn profile(&self) -> Vec<ProfileSample> {
        self.profile.build(self.path.vertices())
    }

    /// Returns the highest sequence number applied for `slot`.
    pub fn last_applied(&self, slot: Slot) -> Option<u64> {
        self.applied.get(&slot).copied()
    }

    pub fn remove_pin(&mut self, id: u64) -> bool {
        self.pins.remove(id)
    }

    /// Starts a new path. Path samples still in flight will be dropped.
    pub fn reset_path(&mut self) {
        self.path.reset();
        self.path_epoch += 1;
    }

    /// Tags a sample request for `event`.
    ///
    /// Fails only if the event's coordinate isn't valid in its
    /// projection.
    pub fn begin(&mut self, event: Event) -> Result<Pending, ProbeError> {
        let (slot, view) = match event {
            Event::PointerMoved(view) => (Slot::Hover, view),
            Event::Clicked(view) => match self.config.mode {
                Mode::PinDrop | Mode::Combined => (Slot::Pin, view),
                Mode::PathDrawing => (Slot::PathStep, view),
            },
        };
        let point = transform::to_geo(view.projection, view.coordinate)?;
        let path_epoch = match (slot, self.config.mode) {
            (Slot::PathStep, _) | (Slot::Pin, Mode::Combined) => Some(self.path_epoch),
            _ => None,
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!("issued {slot:?} request {seq} at {point:?}");
        Ok(Pending {
            slot,
            seq,
            point,
            resolution: view.resolution,
            projection: view.projection,
            path_epoch,
        })
    }

    /// Merges a resolved sample into the session.
    ///
    /// Returns no updates for a stale response, or for a failed pin or
    /// path sample when failures aren't recorded.
    pub fn apply(&mut self, completed: Completed) -> Vec<Update> {
        let Completed { pending, outcome } = completed;

        if self.is_stale(&pending) {
            let stale = ProbeError::StaleResponse {
                slot: pending.slot,
                seq: pending.seq,
            };
            debug!("dropping {stale}");
            return Vec::new();
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    "sampling {:?} request {} at {:?} failed: {e}",
                    pending.slot, pending.seq, pending.point
                );
                if pending.slot != Slot::Hover && !self.config.record_failures {
                    return Vec::new();
                }
                SampleResult::no_data(pending.point)
            }
        };

        let applied = self.applied.entry(pending.slot).or_insert(pending.seq);
        *applied = (*applied).max(pending.seq);

        match pending.slot {
            Slot::Hover => vec![Update::Hover(result)],
            Slot::Pin => {
                let mut updates = vec![Update::PinAdded(
                    self.pins.add(pending.point, result.value),
                )];
                if pending.path_epoch == Some(self.path_epoch) {
                    updates.push(self.append_vertex(pending.point, result.value));
                }
                updates
            }
            Slot::PathStep => vec![self.append_vertex(pending.point, result.value)],
        }
    }

    /// Begins, resolves and applies `event` in one go.
    pub async fn handle<S: Sampler>(
        &mut self,
        sampler: &S,
        event: Event,
    ) -> Result<Vec<Update>, ProbeError> {
        let pending = self.begin(event)?;
        let completed = pending.resolve(sampler, self.config.sample_timeout()).await;
        Ok(self.apply(completed))
    }
}

/// Private API.
impl Session {
    fn is_stale(&self, pending: &Pending) -> bool {
        match pending.slot {
            Slot::Hover => self
                .last_applied(Slot::Hover)
                .is_some_and(|latest| pending.seq <= latest),
            Slot::Pin => false,
            Slot::PathStep => pending.path_epoch != Some(self.path_epoch),
        }
    }

    fn append_vertex(&mut self, point: GeoPoint, value: Option<f64>) -> Update {
        let vertex = self.path.append(point, value);
        Update::VertexAppended {
            vertex,
            profile: self.profile(),
        }
    }
}
