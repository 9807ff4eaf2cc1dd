//! JsonBatch - byte-bounded batch of JSON event bodies

use contracts::{EventBatch, EventData};
use serde_json::Value;

/// Batch whose size is the length of its compact JSON serialisation
///
/// `envelope_bytes` is the size of the surrounding document with an empty
/// item list; each item costs its own length plus one separator.
#[derive(Debug, Clone)]
pub struct JsonBatch {
    bodies: Vec<Value>,
    size: usize,
    max_size: usize,
}

impl JsonBatch {
    pub fn new(max_size: usize, envelope_bytes: usize) -> Self {
        Self {
            bodies: Vec::new(),
            size: envelope_bytes,
            max_size,
        }
    }

    /// Bare JSON array: `[a,b,...]`
    pub fn array(max_size: usize) -> Self {
        Self::new(max_size, 2)
    }

    pub fn bodies(&self) -> &[Value] {
        &self.bodies
    }

    pub fn into_bodies(self) -> Vec<Value> {
        self.bodies
    }
}

impl EventBatch for JsonBatch {
    fn try_add(&mut self, item: EventData) -> bool {
        let Ok(encoded) = serde_json::to_vec(&item.body) else {
            return false;
        };
        let separator = usize::from(!self.bodies.is_empty());
        let new_size = self.size + encoded.len() + separator;
        if new_size > self.max_size {
            return false;
        }
        self.size = new_size;
        self.bodies.push(item.body);
        true
    }

    fn count(&self) -> usize {
        self.bodies.len()
    }

    fn size_in_bytes(&self) -> usize {
        self.size
    }

    fn max_size_in_bytes(&self) -> usize {
        self.max_size
    }
}
