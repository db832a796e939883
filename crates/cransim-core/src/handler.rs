//! Event handling.

use crate::event::Event;

/// A simulation component reacting to the events addressed to it.
pub trait EventHandler {
    /// Processes the event.
    ///
    /// Runs to completion: the handler must not block, any waiting is expressed by emitting future events.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use serde::Serialize;
    /// use cransim_core::{cast, Event, EventHandler, Simulation, SimulationContext};
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct Request {
    ///     seq: u64,
    /// }
    ///
    /// pub struct Counter {
    ///     last_seq: Option<u64>,
    ///     ctx: SimulationContext,
    /// }
    ///
    /// impl EventHandler for Counter {
    ///     fn on(&mut self, event: Event) {
    ///         cast!(match event.data {
    ///             Request { seq } => {
    ///                 self.last_seq = Some(seq);
    ///             }
    ///         })
    ///     }
    /// }
    ///
    /// let mut sim = Simulation::new();
    /// let device = sim.create_context("device");
    /// let counter = Rc::new(RefCell::new(Counter { last_seq: None, ctx: sim.create_context("counter") }));
    /// let counter_id = sim.add_handler("counter", counter.clone());
    /// device.emit(Request { seq: 7 }, counter_id, 0.002);
    /// assert_eq!(counter.borrow().last_seq, None);
    /// sim.step();
    /// assert_eq!(counter.borrow().last_seq, Some(7));
    /// ```
    fn on(&mut self, event: Event);
}

/// Dispatches an event to the arm matching the concrete type of its payload.
///
/// Each arm destructures one payload type. Arms need not be exhaustive, a payload matching no arm
/// is logged as unhandled at the `ERROR` level.
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $event.data.is::<$type>() {
                if let Ok(__payload) = $event.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__payload;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_event($event);
        }
    }
}
