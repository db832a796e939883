//! Scheduling errors.

use thiserror::Error;

/// Raised when an event is scheduled at a time earlier than the current simulation time.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot schedule event at {time:.6}: simulation clock is already at {now:.6}")]
pub struct SchedulingError {
    /// Requested event time.
    pub time: f64,
    /// Simulation time at the moment of the request.
    pub now: f64,
}
