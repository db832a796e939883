//! Traffic setup errors.

use thiserror::Error;

use cransim_core::SchedulingError;
use cransim_network::NetworkError;

/// Errors raised while creating flows and installing applications.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrafficError {
    /// Invalid flow or application parameter.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Error from the network layer (unknown node, port already bound, ...).
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Start or stop event could not be scheduled.
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
}
