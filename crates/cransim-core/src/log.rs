//! Logging facilities.
//!
//! Component log lines have the form `[time LEVEL component] message`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;
use serde_json::json;
use serde_type_name::type_name;

use crate::event::Event;

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
    ($level:ident, $label:literal, $color:ident, $ctx:expr, $msg:expr) => (
        log::$level!(
            target: $ctx.name(),
            "[{:.6} {} {}] {}",
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $msg
        )
    );
    ($level:ident, $label:literal, $color:ident, $ctx:expr, $format:expr, $($arg:tt)+) => (
        log::$level!(
            target: $ctx.name(),
            concat!("[{:.6} {} {}] ", $format),
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a message of a component at the info level.
///
/// The line is prefixed with the current simulation time (microsecond precision), the level
/// and the component name.
///
/// # Examples
///
/// ```rust
/// use cransim_core::{log_info, Simulation, SimulationContext};
///
/// struct Relay {
///     forwarded: u64,
///     ctx: SimulationContext,
/// }
///
/// impl Relay {
///     fn report(&self) {
///         log_info!(self.ctx, "forwarded {} packets", self.forwarded);
///     }
/// }
///
/// let mut sim = Simulation::new();
/// let relay = Relay { forwarded: 3, ctx: sim.create_context("relay-0") };
/// relay.report();
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(info, "INFO ", Green, $ctx, $($arg)+));
}

/// Logs a message of a component at the debug level. See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message of a component at the trace level. See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(trace, "TRACE", Cyan, $ctx, $($arg)+));
}

/// Logs a message of a component at the error level. See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(error, "ERROR", Red, $ctx, $($arg)+));
}

/// Logs a message of a component at the warn level. See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(warn, "WARN ", Yellow, $ctx, $($arg)+));
}

fn describe(event: &Event) -> serde_json::Value {
    json!({
        "type": type_name(&event.data).unwrap_or("unknown"),
        "data": event.data,
        "src": event.src,
        "dst": event.dst,
    })
}

fn log_engine_error(time: f64, what: &str, event: &Event) {
    error!(
        target: "simulation",
        "[{:.6} {} simulation] {}: {}",
        time,
        get_colored("ERROR", Color::Red),
        what,
        describe(event)
    );
}

/// Logs an event whose payload type is not handled by the receiving component.
///
/// Called by the [`cast!`](crate::cast!) macro when no arm matches.
pub fn log_unhandled_event(event: Event) {
    log_engine_error(event.time, "unhandled event", &event);
}

pub(crate) fn log_undelivered_event(event: Event) {
    log_engine_error(event.time, "undelivered event (no handler registered)", &event);
}

pub(crate) fn log_incorrect_event(event: Event, msg: &str) {
    log_engine_error(event.time, &format!("incorrect event ({})", msg), &event);
}

pub(crate) fn log_discarded_events(time: f64, count: usize) {
    log::debug!(
        target: "simulation",
        "[{:.6} {} simulation] {} pending events past the stop time discarded",
        time,
        get_colored("DEBUG", Color::Blue),
        count
    );
}
