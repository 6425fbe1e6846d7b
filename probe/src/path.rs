use crate::GeoPoint;
use serde::Serialize;

/// A sampled point along a drawn path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathVertex {
    pub point: GeoPoint,
    pub value: Option<f64>,
    /// Append order, starting at 0 after each reset.
    pub sequence: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Empty,
    Accumulating,
}

/// Append-only sequence of path vertices.
#[derive(Debug, Default)]
pub struct PathAccumulator {
    vertices: Vec<PathVertex>,
}

impl PathAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, point: GeoPoint, value: Option<f64>) -> PathVertex {
        let vertex = PathVertex {
            point,
            value,
            sequence: self.vertices.len(),
        };
        self.vertices.push(vertex.clone());
        vertex
    }

    /// Discards all vertices; the next append starts at sequence 0.
    pub fn reset(&mut self) {
        self.vertices.clear();
    }

    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    pub fn state(&self) -> PathState {
        if self.vertices.is_empty() {
            PathState::Empty
        } else {
            PathState::Accumulating
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{GeoPoint, PathAccumulator, PathState};

    #[test]
    fn test_sequence_is_append_order() {
        let mut path = PathAccumulator::new();
        assert_eq!(path.state(), PathState::Empty);
        for i in 0..5 {
            let point = GeoPoint::new(f64::from(i), 0.0).unwrap();
            let vertex = path.append(point, Some(f64::from(i) * 100.0));
            assert_eq!(vertex.sequence, i as usize);
        }
        assert_eq!(path.state(), PathState::Accumulating);
        assert_eq!(path.len(), 5);
        let sequences: Vec<usize> = path.vertices().iter().map(|v| v.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut path = PathAccumulator::new();
        let point = GeoPoint::new(1.0, 1.0).unwrap();
        path.append(point, None);
        path.append(point, None);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut path = PathAccumulator::new();
        let point = GeoPoint::new(1.0, 1.0).unwrap();
        path.append(point, Some(1.0));
        path.append(point, Some(2.0));
        path.reset();
        assert!(path.is_empty());
        assert_eq!(path.state(), PathState::Empty);
        assert_eq!(path.append(point, Some(3.0)).sequence, 0);
    }
}
