//! Logging facilities.
//!
//! Component messages are prefixed with the simulation time, a level tag and the component name,
//! e.g. `[12.500 DEBUG broker] cloudlet #3 assigned to vm #1`. Level tags are colored when stderr is a terminal.
//!
//! The macros go through the [`log`](https://docs.rs/log) facade with the component name as the target, so the
//! output of a single component can be selected with `RUST_LOG=broker=debug`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::{error, trace};
use serde_json::json;
use serde_type_name::type_name;

use crate::component::Id;
use crate::event::{CausalityViolation, Event, EventData};

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_component {
    ($level:ident, $tag:literal, $color:ident, $ctx:expr, $($arg:tt)+) => {
        $crate::__log::log!(
            target: $ctx.name(),
            $crate::__log::Level::$level,
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::log::get_colored($tag, $crate::colored::Color::$color),
            $ctx.name(),
            format_args!($($arg)+)
        )
    };
}

/// Logs a message at the info level.
///
/// Accepts the component context followed by `format!`-style arguments:
///
/// ```rust
/// use csim_core::{log_info, Simulation};
///
/// let mut sim = Simulation::new(123);
/// let ctx = sim.create_context("broker");
/// log_info!(ctx, "started");
/// log_info!(ctx, "{} vms available", 5);
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(Info, "INFO ", Green, $ctx, $($arg)+));
}

/// Logs a message at the debug level.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(Debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message at the trace level.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(Trace, "TRACE", Cyan, $ctx, $($arg)+));
}

/// Logs a message at the warn level.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(Warn, "WARN ", Yellow, $ctx, $($arg)+));
}

/// Logs a message at the error level.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(Error, "ERROR", Red, $ctx, $($arg)+));
}

/// Traces an event right before it is passed to the handler of `dst_name`.
pub(crate) fn trace_delivery(event: &Event, src_name: &str, dst_name: &str) {
    trace!(
        target: dst_name,
        "[{:.3} {} {}] {}",
        event.time,
        get_colored("EVENT", Color::BrightBlack),
        dst_name,
        json!({
            "id": event.id,
            "type": type_name(&event.data).unwrap_or("unknown"),
            "data": event.data,
            "src": src_name,
        })
    );
}

fn log_dropped(time: f64, reason: &str, details: serde_json::Value) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        time,
        get_colored("ERROR", Color::Red),
        reason,
        details
    );
}

/// Logs an event whose payload type is not handled by the destination component.
///
/// Called from the fallback branch of [`cast!`](crate::cast!).
pub fn log_unhandled_event(time: f64, src: Id, dst: Id, data: &dyn EventData) {
    log_dropped(
        time,
        "Unhandled event",
        json!({"type": type_name(&data).unwrap_or("unknown"), "data": data, "src": src, "dst": dst}),
    );
}

/// Logs an event sent to a component without a registered handler.
pub(crate) fn log_undelivered_event(event: &Event) {
    log_dropped(
        event.time,
        "Undelivered event",
        json!({"type": type_name(&event.data).unwrap_or("unknown"), "data": event.data, "src": event.src, "dst": event.dst}),
    );
}

/// Logs an event which was requested before the current simulation time.
pub(crate) fn log_rejected_event(data: &dyn EventData, src: Id, dst: Id, err: &CausalityViolation) {
    log_dropped(
        err.clock,
        "Rejected event",
        json!({"type": type_name(&data).unwrap_or("unknown"), "data": data, "src": src, "dst": dst, "time": err.time}),
    );
}
