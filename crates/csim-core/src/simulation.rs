//! Simulation configuration and execution.

use std::cell::RefCell;
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled};

use crate::component::{Id, Registry};
use crate::context::SimulationContext;
use crate::handler::EventHandler;
use crate::log::{log_undelivered_event, trace_delivery};
use crate::state::SimulationState;

/// Owns the simulation clock, the event queue and the registered components.
///
/// Events are processed one at a time in the order of their time. Events with the same time are processed in the
/// order they were scheduled, since event ids grow with each scheduled event. Processing an event moves the clock
/// to the event time and passes the event to the handler of its destination, which may schedule new events but never
/// before the current time. The clock therefore never goes back.
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use serde::Serialize;
/// use csim_core::{cast, Event, EventHandler, Simulation, SimulationContext};
///
/// #[derive(Serialize)]
/// struct Tick {}
///
/// struct Ticker {
///     ticks: Vec<f64>,
///     ctx: SimulationContext,
/// }
///
/// impl EventHandler for Ticker {
///     fn on(&mut self, event: Event) {
///         cast!(match event.data {
///             Tick {} => {
///                 self.ticks.push(self.ctx.time());
///                 if self.ticks.len() < 3 {
///                     self.ctx.emit_self(Tick {}, 0.5);
///                 }
///             }
///         })
///     }
/// }
///
/// let mut sim = Simulation::new(123);
/// let ticker = Rc::new(RefCell::new(Ticker { ticks: Vec::new(), ctx: sim.create_context("ticker") }));
/// sim.add_handler("ticker", ticker.clone());
/// ticker.borrow().ctx.emit_self_now(Tick {});
/// sim.step_until_no_events();
/// assert_eq!(ticker.borrow().ticks, vec![0., 0.5, 1.]);
/// ```
pub struct Simulation {
    state: Rc<RefCell<SimulationState>>,
    registry: Registry,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimulationState::new(seed))),
            registry: Registry::default(),
        }
    }

    /// Creates a context for the component with the given name, registering the component if needed.
    pub fn create_context<S: AsRef<str>>(&mut self, name: S) -> SimulationContext {
        let name = name.as_ref();
        let id = self.registry.register(name);
        debug!(target: "simulation", "[{:.3} simulation] context of {} (#{}) created", self.time(), name, id);
        SimulationContext::new(id, name, self.state.clone())
    }

    /// Sets the handler of events addressed to the component with the given name and returns the component Id.
    pub fn add_handler<S: AsRef<str>>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id {
        let name = name.as_ref();
        let id = self.registry.register(name);
        self.registry.set_handler(id, handler);
        debug!(target: "simulation", "[{:.3} simulation] handler of {} (#{}) added", self.time(), name, id);
        id
    }

    /// Returns the Id of the registered component.
    ///
    /// Panics if there is no component with such name.
    pub fn lookup_id(&self, name: &str) -> Id {
        match self.registry.id(name) {
            Some(id) => id,
            None => panic!("component {} is not registered", name),
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.state.borrow().time()
    }

    /// Processes the next pending event.
    ///
    /// Returns `false` if there are no pending events. An event addressed to a component without handler is
    /// logged and dropped, this still counts as a step.
    pub fn step(&mut self) -> bool {
        let next = self.state.borrow_mut().pop_event();
        let event = match next {
            Some(event) => event,
            None => return false,
        };
        if log_enabled!(Trace) {
            trace_delivery(&event, self.registry.name(event.src), self.registry.name(event.dst));
        }
        match self.registry.handler(event.dst) {
            Some(handler) => handler.borrow_mut().on(event),
            None => log_undelivered_event(&event),
        }
        true
    }

    /// Performs up to `step_count` steps. Returns `false` if the queue ran empty.
    pub fn steps(&mut self, step_count: u64) -> bool {
        (0..step_count).all(|_| self.step())
    }

    /// Processes events until the queue is empty.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Processes the events with time up to `current time + duration`.
    ///
    /// Returns `false` if the queue ran empty, `true` if later events remain.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.time() + duration;
        loop {
            let next_time = self.state.borrow_mut().next_event_time();
            match next_time {
                None => return false,
                Some(time) if time > end_time => return true,
                Some(_) => {
                    self.step();
                }
            }
        }
    }

    /// Returns the number of scheduled events including processed and cancelled ones.
    pub fn event_count(&self) -> u64 {
        self.state.borrow().issued_events()
    }

    /// Returns the number of pending events, cancelled ones are not counted.
    pub fn pending_event_count(&self) -> usize {
        self.state.borrow().pending_events()
    }
}
