//! Event handling.

use crate::event::Event;

/// Implemented by simulation components to receive the events addressed to them.
///
/// The simulation calls [`on`](EventHandler::on) once per delivered event, in event order. Payloads are usually
/// dispatched with [`cast!`](crate::cast!).
pub trait EventHandler {
    /// Processes event.
    fn on(&mut self, event: Event);
}

/// Dispatches the event payload to the arm matching its concrete type.
///
/// Each arm destructures one payload struct. Arms are tried in order and the first one whose type matches the
/// payload is executed. Payloads of other types are logged as unhandled under `ERROR` level.
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use serde::Serialize;
/// use csim_core::{cast, Event, EventHandler, Simulation};
///
/// #[derive(Serialize)]
/// struct Resize {
///     size: u32,
/// }
///
/// #[derive(Serialize)]
/// struct Reset {}
///
/// struct Counter {
///     size: u32,
/// }
///
/// impl EventHandler for Counter {
///     fn on(&mut self, event: Event) {
///         cast!(match event.data {
///             Resize { size } => {
///                 self.size = size;
///             }
///             Reset {} => {
///                 self.size = 0;
///             }
///         })
///     }
/// }
///
/// let mut sim = Simulation::new(1);
/// let client = sim.create_context("client");
/// let counter = Rc::new(RefCell::new(Counter { size: 0 }));
/// let counter_id = sim.add_handler("counter", counter.clone());
/// client.emit(Resize { size: 16 }, counter_id, 1.);
/// sim.step();
/// assert_eq!(counter.borrow().size, 16);
/// ```
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($fields:tt)* } => { $($body:tt)* } )+ } ) => {{
        let mut __payload = Some($event.data);
        $(
            if let Some(__data) = __payload.take() {
                match __data.downcast::<$type>() {
                    Ok(__typed) => {
                        let $type { $($fields)* } = *__typed;
                        $($body)*
                    }
                    Err(__data) => __payload = Some(__data),
                }
            }
        )+
        if let Some(__data) = __payload {
            $crate::log::log_unhandled_event($event.time, $event.src, $event.dst, &*__data);
        }
    }};
}
