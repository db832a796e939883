//! Network construction and routing errors.

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::address::{SegmentId, Subnet};
use crate::link::LinkId;
use crate::node::NodeId;

/// Errors raised while building the topology, assigning addresses or resolving routes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// Invalid construction parameter.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// All host addresses of the segment are already allocated.
    #[error("address segment {subnet} is exhausted ({capacity} host addresses)")]
    SegmentExhausted {
        /// Exhausted segment.
        subnet: Subnet,
        /// Number of host addresses in the segment.
        capacity: u32,
    },
    /// No node of the segment can be reached from the node.
    #[error("network {subnet} is unreachable from node {node}")]
    UnreachableNetwork {
        /// Node without a route.
        node: NodeId,
        /// Unreachable segment.
        subnet: Subnet,
    },
    /// Node with such id does not exist.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// Link with such id does not exist.
    #[error("unknown link {0}")]
    UnknownLink(LinkId),
    /// Segment with such id does not exist.
    #[error("unknown address segment {0}")]
    UnknownSegment(SegmentId),
    /// Address is not assigned to any node or there is no route to it.
    #[error("no route to address {0}")]
    UnknownAddress(Ipv4Addr),
}
