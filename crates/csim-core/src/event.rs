//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;
use thiserror::Error;

use crate::component::Id;

/// Event identifier. Identifiers are assigned from a global counter, so they also define the insertion order.
pub type EventId = u64;

/// Trait for event payloads. Implemented automatically for any serializable type.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// Representation of event.
///
/// Events are ordered by time and then by id, so events with the same time are processed in the order
/// they were created.
pub struct Event {
    /// Unique event identifier (insertion sequence number).
    pub id: EventId,
    /// Time of event occurrence.
    pub time: f64,
    /// Identifier of event source.
    pub src: Id,
    /// Identifier of event destination.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted so that BinaryHeap pops the earliest event.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returned when an event is requested at a time earlier than the current simulation time.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("event at time {time} is earlier than current simulation time {clock}")]
pub struct CausalityViolation {
    /// Requested event time.
    pub time: f64,
    /// Simulation time at the moment of request.
    pub clock: f64,
}
