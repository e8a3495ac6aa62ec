use std::collections::{BinaryHeap, HashSet};

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::component::Id;
use crate::event::{CausalityViolation, Event, EventData, EventId};
use crate::log::log_rejected_event;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

/// Pending events ordered by (time, id).
///
/// Cancellation is lazy: cancelled ids are remembered and the events are skipped when they reach the head.
#[derive(Default)]
struct EventQueue {
    heap: BinaryHeap<Event>,
    cancelled: HashSet<EventId>,
    issued: u64,
}

impl EventQueue {
    fn push(&mut self, time: f64, src: Id, dst: Id, data: Box<dyn EventData>) -> EventId {
        let id = self.issued;
        self.issued += 1;
        self.heap.push(Event { id, time, src, dst, data });
        id
    }

    fn drop_cancelled_head(&mut self) {
        while let Some(head) = self.heap.peek() {
            if !self.cancelled.remove(&head.id) {
                break;
            }
            self.heap.pop();
        }
    }

    fn pop(&mut self) -> Option<Event> {
        self.drop_cancelled_head();
        self.heap.pop()
    }

    fn next_time(&mut self) -> Option<f64> {
        self.drop_cancelled_head();
        self.heap.peek().map(|event| event.time)
    }

    fn cancel(&mut self, id: EventId) {
        if self.heap.iter().any(|event| event.id == id) {
            self.cancelled.insert(id);
        }
    }

    fn cancel_matching<F: Fn(&Event) -> bool>(&mut self, pred: F) {
        let matched: Vec<EventId> = self.heap.iter().filter(|event| pred(event)).map(|event| event.id).collect();
        self.cancelled.extend(matched);
    }

    fn len(&self) -> usize {
        self.heap.len() - self.cancelled.len()
    }
}

/// Clock, event queue and random generator shared by the simulation and its contexts.
pub(crate) struct SimulationState {
    clock: f64,
    queue: EventQueue,
    rng: Pcg64,
}

impl SimulationState {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.,
            queue: EventQueue::default(),
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Validates the requested event time. Times less than [`EPSILON`] in the past are moved to the current time.
    fn causal_time(&self, time: f64) -> Result<f64, CausalityViolation> {
        if time.is_nan() || time < self.clock - EPSILON {
            Err(CausalityViolation {
                time,
                clock: self.clock,
            })
        } else {
            Ok(time.max(self.clock))
        }
    }

    /// Schedules event at the absolute time.
    pub fn schedule_at<T: EventData>(
        &mut self,
        time: f64,
        src: Id,
        dst: Id,
        data: T,
    ) -> Result<EventId, CausalityViolation> {
        let time = self.causal_time(time)?;
        Ok(self.queue.push(time, src, dst, Box::new(data)))
    }

    /// Schedules event after the delay. A negative delay is a logic error and panics.
    pub fn schedule_after<T: EventData>(&mut self, delay: f64, src: Id, dst: Id, data: T) -> EventId {
        match self.causal_time(self.clock + delay) {
            Ok(time) => self.queue.push(time, src, dst, Box::new(data)),
            Err(err) => {
                log_rejected_event(&data, src, dst, &err);
                panic!("Event delay is negative ({}): {}", delay, err);
            }
        }
    }

    /// Removes the next event from the queue and advances the clock to its time.
    pub fn pop_event(&mut self) -> Option<Event> {
        let event = self.queue.pop()?;
        self.clock = event.time;
        Some(event)
    }

    pub fn next_event_time(&mut self) -> Option<f64> {
        self.queue.next_time()
    }

    /// Cancels the event if it is still pending.
    pub fn cancel(&mut self, id: EventId) {
        self.queue.cancel(id);
    }

    pub fn cancel_matching<F: Fn(&Event) -> bool>(&mut self, pred: F) {
        self.queue.cancel_matching(pred);
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn issued_events(&self) -> u64 {
        self.queue.issued
    }

    pub fn rand(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.gen_range(range)
    }
}
