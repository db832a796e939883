//! Timeline errors.

use cransim_network::{LinkId, NodeId};
use thiserror::Error;

use crate::record::EventKind;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown link {0}")]
    UnknownLink(LinkId),
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(f64),
    #[error("payload does not match event kind {0:?}")]
    PayloadMismatch(EventKind),
    #[error("failed to serialize trace: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to write latencies: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
