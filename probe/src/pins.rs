use crate::GeoPoint;
use serde::Serialize;

/// A probed location and the value sampled there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pin {
    pub id: u64,
    pub point: GeoPoint,
    pub value: Option<f64>,
}

/// Pins in insertion order.
///
/// Ids start at 1 and are never reused, even after removal or
/// [`PinStore::clear`].
#[derive(Debug)]
pub struct PinStore {
    pins: Vec<Pin>,
    next_id: u64,
}

impl Default for PinStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PinStore {
    pub fn new() -> Self {
        Self {
            pins: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, point: GeoPoint, value: Option<f64>) -> Pin {
        let pin = Pin {
            id: self.next_id,
            point,
            value,
        };
        self.next_id += 1;
        self.pins.push(pin.clone());
        pin
    }

    /// Removes the pin with `id`, returning whether it existed.
    pub fn remove(&mut self, id: u64) -> bool {
        match self.pins.iter().position(|pin| pin.id == id) {
            Some(idx) => {
                self.pins.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u64) -> Option<&Pin> {
        self.pins.iter().find(|pin| pin.id == id)
    }

    pub fn list(&self) -> &[Pin] {
        &self.pins
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn clear(&mut self) {
        self.pins.clear();
    }
}
