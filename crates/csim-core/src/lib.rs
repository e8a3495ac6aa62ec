#![warn(missing_docs)]
//! Discrete-event simulation engine.
//!
//! The engine keeps a single simulation clock and a queue of pending events ordered by time and insertion sequence.
//! Simulation components are registered with [`Simulation`], receive events via [`EventHandler`] and produce new
//! events through their [`SimulationContext`].

pub mod component;
pub mod context;
pub mod event;
pub mod handler;
pub mod log;
pub mod simulation;
mod state;

pub use colored;
#[doc(hidden)]
pub use ::log as __log;
pub use component::Id;
pub use context::SimulationContext;
pub use event::{CausalityViolation, Event, EventData, EventId};
pub use handler::EventHandler;
pub use simulation::Simulation;
pub use state::EPSILON;
