use crate::PathVertex;
use geo::{algorithm::HaversineDistance, geometry::Point};
use log::debug;
use serde::{Deserialize, Serialize};

/// Distance between consecutive vertices under the default spacing.
pub const UNIT_STEP: f64 = 10.0;

/// One point of a distance/elevation profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileSample {
    pub distance: f64,
    pub elevation: f64,
}

/// How distance along the path is measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Spacing {
    /// Vertex `i` sits at `i * step`, regardless of where it is.
    Uniform { step: f64 },

    /// Cumulative great circle distance between vertices, in metres.
    Haversine,
}

impl Default for Spacing {
    fn default() -> Self {
        Self::Uniform { step: UNIT_STEP }
    }
}

/// Derives a profile from `vertices` using the default spacing.
///
/// Vertices without a value are given an elevation of 0.
pub fn derive(vertices: &[PathVertex]) -> Vec<ProfileSample> {
    ProfileBuilder::new().build(vertices)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileBuilder {
    spacing: Spacing,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spacing(mut self, spacing: Spacing) -> Self {
        self.spacing = spacing;
        self
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn build(&self, vertices: &[PathVertex]) -> Vec<ProfileSample> {
        let now = std::time::Instant::now();
        let elevations = vertices.iter().map(|v| v.value.unwrap_or(0.0));
        let profile: Vec<ProfileSample> = match self.spacing {
            Spacing::Uniform { step } => elevations
                .enumerate()
                .map(|(i, elevation)| ProfileSample {
                    distance: i as f64 * step,
                    elevation,
                })
                .collect(),
            Spacing::Haversine => {
                let mut distance = 0.0;
                let mut prev: Option<Point<f64>> = None;
                vertices
                    .iter()
                    .zip(elevations)
                    .map(|(vertex, elevation)| {
                        let point = Point::from(vertex.point);
                        if let Some(prev) = prev {
                            distance += prev.haversine_distance(&point);
                        }
                        prev = Some(point);
                        ProfileSample {
                            distance,
                            elevation,
                        }
                    })
                    .collect()
            }
        };
        debug!(
            "profile; len: {}, spacing: {:?}, exec: {:?}",
            profile.len(),
            self.spacing,
            now.elapsed()
        );
        profile
    }
}
