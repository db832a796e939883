#![warn(missing_docs)]
//! Discrete-event simulation core.
//!
//! A [`Simulation`] owns a single logical clock and a time-ordered event queue. Simulation components
//! receive events through the [`EventHandler`] trait and produce new events through their
//! [`SimulationContext`]. Events with equal timestamps are processed in the order they were created,
//! so a run is fully determined by its inputs.

pub mod component;
pub mod context;
pub mod error;
pub mod event;
pub mod handler;
pub mod log;
pub mod simulation;
mod state;

pub use colored;
pub use component::Id;
pub use context::SimulationContext;
pub use error::SchedulingError;
pub use event::{Event, EventData, EventId};
pub use handler::EventHandler;
pub use simulation::Simulation;
pub use state::EPSILON;
