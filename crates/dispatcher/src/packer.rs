//! Batch packer - fills one batch from the head of a working list

use std::collections::VecDeque;
use std::sync::Arc;

use contracts::{EventBatch, EventData, TrackingEvent};
use serde_json::Value;

use crate::queue::{Pending, SeqNo};

/// Turns an event into the payload placed in a batch
pub type Formatter = Arc<dyn Fn(&TrackingEvent) -> Value + Send + Sync>;

/// Pass the event through unchanged
pub fn identity_formatter() -> Formatter {
    Arc::new(TrackingEvent::to_payload)
}

/// Result of one packing round
#[derive(Debug, Default)]
pub struct Packed {
    /// Accepted events, in order
    pub sent: Vec<SeqNo>,
    /// The batch refused an item (it is back at the head of the list)
    pub batch_full: bool,
}

impl Packed {
    /// The batch refused the first item it was offered
    pub fn first_item_refused(&self) -> bool {
        self.batch_full && self.sent.is_empty()
    }
}

/// Pack events from the front of `working` into `batch`
///
/// Stops at the first item that does not fit, putting it back at the head,
/// or when the list is exhausted.
pub fn pack<B: EventBatch>(
    working: &mut VecDeque<Pending>,
    batch: &mut B,
    formatter: &Formatter,
) -> Packed {
    let mut packed = Packed::default();

    while let Some(item) = working.pop_front() {
        let data = EventData::new(formatter(&item.event));
        if batch.try_add(data) {
            packed.sent.push(item.seq);
        } else {
            working.push_front(item);
            packed.batch_full = true;
            break;
        }
    }

    packed
}
