//! Simulation configuration and execution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use serde_json::json;
use serde_type_name::type_name;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::event::{Event, EventId};
use crate::handler::EventHandler;
use crate::log::{log_discarded_events, log_undelivered_event};
use crate::state::SimulationState;

/// Represents a simulation, provides methods for its configuration and execution.
///
/// Lifecycle: create, register components and schedule initial events, run, then drop.
/// Each instance has its own clock and event queue, so independent simulations can coexist in one process.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    name_to_id: HashMap<String, Id>,
    names: Rc<RefCell<Vec<String>>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Creates a new simulation with the clock set to zero and an empty event queue.
    pub fn new() -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new())),
            name_to_id: HashMap::new(),
            names: Rc::new(RefCell::new(Vec::new())),
            handlers: Vec::new(),
        }
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.name_to_id.len() as Id;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.borrow_mut().push(name.to_owned());
        self.handlers.push(None);
        id
    }

    /// Returns the identifier of component by its name.
    ///
    /// Panics if component with such name does not exist.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cransim_core::Simulation;
    ///
    /// let mut sim = Simulation::new();
    /// let comp_ctx = sim.create_context("comp");
    /// let comp_id = sim.lookup_id(comp_ctx.name());
    /// assert_eq!(comp_id, 0);
    /// ```
    pub fn lookup_id(&self, name: &str) -> Id {
        *self.name_to_id.get(name).unwrap()
    }

    /// Returns the name of component by its identifier.
    ///
    /// Panics if component with such Id does not exist.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }

    /// Creates a new simulation context with specified name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cransim_core::Simulation;
    ///
    /// let mut sim = Simulation::new();
    /// let comp_ctx = sim.create_context("comp");
    /// assert_eq!(comp_ctx.id(), 0); // component ids are assigned sequentially starting from 0
    /// assert_eq!(comp_ctx.name(), "comp");
    /// ```
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let ctx = SimulationContext::new(
            self.register(name.as_ref()),
            name.as_ref(),
            self.sim_state.clone(),
            self.names.clone(),
        );
        debug!(
            target: "simulation",
            "[{:.6} {} simulation] Created context: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": ctx.name(), "id": ctx.id()})
        );
        ctx
    }

    /// Registers the event handler implementation for component with specified name, returns the component Id.
    ///
    /// When the handler is registered for component with existing context, the component Id assigned in
    /// [`create_context()`](Self::create_context()) is reused.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler);
        debug!(
            target: "simulation",
            "[{:.6} {} simulation] Added handler: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
        id
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Performs a single step through the simulation.
    ///
    /// Takes the next event from the queue, advances the simulation time to event time and tries to process it
    /// by invoking the [`EventHandler::on()`](crate::EventHandler::on()) method of the corresponding event handler.
    /// If there is no handler registered for component with Id `event.dst`, logs the undelivered event and discards it.
    ///
    /// Returns `true` if some pending event was found (no matter was it properly processed or not) and `false`
    /// otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use cransim_core::Simulation;
    ///
    /// #[derive(Serialize)]
    /// pub struct SomeEvent {
    /// }
    ///
    /// let mut sim = Simulation::new();
    /// let comp_ctx = sim.create_context("comp");
    /// comp_ctx.emit_self(SomeEvent {}, 1.2);
    /// assert!(sim.step());
    /// assert_eq!(sim.time(), 1.2);
    /// assert!(!sim.step());
    /// ```
    pub fn step(&mut self) -> bool {
        let next = self.sim_state.borrow_mut().next_event();
        match next {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    fn dispatch(&mut self, event: Event) {
        let handler = self.handlers.get(event.dst as usize).cloned().flatten();
        match handler {
            Some(handler) => {
                if log_enabled!(Trace) {
                    let src_name = self.lookup_name(event.src);
                    let dst_name = self.lookup_name(event.dst);
                    trace!(
                        target: &dst_name,
                        "[{:.6} {} {}] {}",
                        event.time,
                        crate::log::get_colored("EVENT", colored::Color::BrightBlack),
                        dst_name,
                        json!({"type": type_name(&event.data).unwrap_or("unknown"), "data": event.data, "src": src_name})
                    );
                }
                handler.borrow_mut().on(event);
            }
            None => log_undelivered_event(event),
        }
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until there are no pending events left.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Steps through the simulation with duration limit.
    ///
    /// Processes events until the next event time is above `current_time + duration` or there are no pending
    /// events left. Unlike [`run_until()`](Self::run_until()), remaining events stay in the queue.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.time() + duration;
        loop {
            match self.sim_state.borrow_mut().peek_event() {
                Some(event) if event.time > end_time => return true,
                Some(_) => {}
                None => return false,
            }
            self.step();
        }
    }

    /// Runs the simulation until `stop_time`.
    ///
    /// All events with time not exceeding `stop_time` are processed in order. Events scheduled past `stop_time`
    /// are discarded without being processed, and the clock is set to `stop_time`.
    ///
    /// Returns the number of processed events.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use cransim_core::Simulation;
    ///
    /// #[derive(Serialize)]
    /// pub struct SomeEvent {
    /// }
    ///
    /// let mut sim = Simulation::new();
    /// let comp_ctx = sim.create_context("comp");
    /// comp_ctx.emit_self(SomeEvent {}, 1.0);
    /// comp_ctx.emit_self(SomeEvent {}, 2.0);
    /// comp_ctx.emit_self(SomeEvent {}, 3.5);
    /// assert_eq!(sim.run_until(2.0), 2);
    /// assert_eq!(sim.time(), 2.0);
    /// assert_eq!(sim.pending_event_count(), 0);
    /// ```
    pub fn run_until(&mut self, stop_time: f64) -> u64 {
        let mut processed = 0;
        loop {
            match self.sim_state.borrow_mut().peek_event() {
                Some(event) if event.time <= stop_time => {}
                _ => break,
            }
            self.step();
            processed += 1;
        }
        let mut state = self.sim_state.borrow_mut();
        let discarded = state.discard_events();
        if discarded > 0 {
            log_discarded_events(stop_time, discarded);
        }
        if state.time() < stop_time {
            state.set_time(stop_time);
        }
        processed
    }

    /// Cancels the specified event.
    pub fn cancel_event(&mut self, id: EventId) {
        self.sim_state.borrow_mut().cancel_event(id);
    }

    /// Cancels events that satisfy the given predicate function.
    ///
    /// Note that already processed events cannot be cancelled.
    pub fn cancel_events<F>(&mut self, pred: F)
    where
        F: Fn(&Event) -> bool,
    {
        self.sim_state.borrow_mut().cancel_events(pred);
    }

    /// Returns the total number of created events.
    ///
    /// Note that cancelled events are also counted here.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }

    /// Returns the number of pending (not cancelled) events.
    pub fn pending_event_count(&self) -> usize {
        self.sim_state.borrow().pending_event_count()
    }
}
