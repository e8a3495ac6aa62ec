//! Accessing simulation from components.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};

use crate::component::Id;
use crate::event::{CausalityViolation, Event, EventData, EventId};
use crate::state::SimulationState;

/// Handle through which a component reads the clock, draws random numbers and schedules events.
///
/// All events emitted through the context have the component as their source. Relative emits (`emit*`) take a
/// non-negative delay from the current time. [`emit_at`](Self::emit_at) takes an absolute time and reports a
/// time in the past as an error, which suits setup code driven by external input.
pub struct SimulationContext {
    id: Id,
    name: String,
    state: Rc<RefCell<SimulationState>>,
}

impl SimulationContext {
    pub(crate) fn new(id: Id, name: &str, state: Rc<RefCell<SimulationState>>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            state,
        }
    }

    /// Returns the identifier of component associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.state.borrow().time()
    }

    /// Returns a random float in _[0, 1)_ from the simulation generator.
    pub fn rand(&self) -> f64 {
        self.state.borrow_mut().rand()
    }

    /// Returns a random value in the range from the simulation generator.
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.state.borrow_mut().gen_range(range)
    }

    /// Schedules event for `dst` after `delay`.
    ///
    /// Panics if the delay is negative.
    pub fn emit<T: EventData>(&self, data: T, dst: Id, delay: f64) -> EventId {
        self.state.borrow_mut().schedule_after(delay, self.id, dst, data)
    }

    /// Schedules event for `dst` at the current time, after the events already scheduled for this time.
    pub fn emit_now<T: EventData>(&self, data: T, dst: Id) -> EventId {
        self.emit(data, dst, 0.)
    }

    /// Schedules event for this component after `delay`.
    pub fn emit_self<T: EventData>(&self, data: T, delay: f64) -> EventId {
        self.emit(data, self.id, delay)
    }

    /// Schedules event for this component at the current time.
    pub fn emit_self_now<T: EventData>(&self, data: T) -> EventId {
        self.emit(data, self.id, 0.)
    }

    /// Schedules event for `dst` at the absolute time.
    ///
    /// Returns [`CausalityViolation`] without scheduling anything if the time is before the current time.
    pub fn emit_at<T: EventData>(&self, data: T, dst: Id, time: f64) -> Result<EventId, CausalityViolation> {
        self.state.borrow_mut().schedule_at(time, self.id, dst, data)
    }

    /// Cancels the event if it is still pending.
    pub fn cancel_event(&self, id: EventId) {
        self.state.borrow_mut().cancel(id);
    }

    /// Cancels all pending events matching the predicate.
    pub fn cancel_events<F>(&self, pred: F)
    where
        F: Fn(&Event) -> bool,
    {
        self.state.borrow_mut().cancel_matching(pred);
    }

    /// Returns `true` if some not cancelled events are pending.
    pub fn has_pending_events(&self) -> bool {
        self.state.borrow().pending_events() > 0
    }
}
