//! Accessing simulation from components.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::Id;
use crate::error::SchedulingError;
use crate::event::{EventData, EventId};
use crate::state::SimulationState;

/// A facade for accessing the simulation state and producing events from simulation components.
pub struct SimulationContext {
    id: Id,
    name: String,
    sim_state: Rc<RefCell<SimulationState>>,
    names: Rc<RefCell<Vec<String>>>,
}

impl SimulationContext {
    pub(crate) fn new(
        id: Id,
        name: &str,
        sim_state: Rc<RefCell<SimulationState>>,
        names: Rc<RefCell<Vec<String>>>,
    ) -> Self {
        Self {
            id,
            name: name.to_owned(),
            sim_state,
            names,
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
        self.sim_state.borrow().time()
    }

    /// Creates new event with specified payload, destination and delay.
    ///
    /// Panics if the delay is negative.
    pub fn emit<T>(&self, data: T, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, dst, delay)
    }

    /// Creates new immediate (zero-delay) event with specified payload and destination.
    pub fn emit_now<T>(&self, data: T, dst: Id) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, dst, 0.)
    }

    /// Creates new event for itself with specified payload and delay.
    pub fn emit_self<T>(&self, data: T, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, self.id, delay)
    }

    /// Creates new immediate event for itself with specified payload.
    pub fn emit_self_now<T>(&self, data: T) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, self.id, 0.)
    }

    /// Creates new event with specified payload and destination at the absolute simulation time.
    ///
    /// Fails with [`SchedulingError`] if `time` is earlier than the current simulation time.
    pub fn emit_at<T>(&self, data: T, dst: Id, time: f64) -> Result<EventId, SchedulingError>
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event_at(data, self.id, dst, time)
    }

    /// Creates new event for itself at the absolute simulation time.
    ///
    /// Fails with [`SchedulingError`] if `time` is earlier than the current simulation time.
    pub fn emit_self_at<T>(&self, data: T, time: f64) -> Result<EventId, SchedulingError>
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event_at(data, self.id, self.id, time)
    }

    /// Cancels the specified event.
    ///
    /// The event stays in the queue and is skipped when its time comes.
    pub fn cancel_event(&self, id: EventId) {
        self.sim_state.borrow_mut().cancel_event(id);
    }

    /// Lookup component name by its identifier.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }
}
