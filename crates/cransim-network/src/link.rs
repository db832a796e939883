//! Network link.

use serde::Serialize;

use crate::address::SegmentId;
use crate::node::NodeId;

/// Unique link id.
pub type LinkId = usize;

/// A bidirectional point-to-point link between two nodes.
///
/// Links are immutable once created. Data rate is informational, the packet latency over a link is
/// its propagation delay.
#[derive(Copy, Clone, Debug, Serialize)]
pub struct Link {
    /// First endpoint.
    pub node1: NodeId,
    /// Second endpoint.
    pub node2: NodeId,
    /// Data rate in bits per second.
    pub data_rate: f64,
    /// Propagation delay in seconds.
    pub delay: f64,
    /// Address segment the link endpoints are numbered from, if already assigned.
    pub segment: Option<SegmentId>,
}

impl Link {
    /// Returns the opposite endpoint, or `None` if `node` is not an endpoint of this link.
    pub fn peer(&self, node: NodeId) -> Option<NodeId> {
        if node == self.node1 {
            Some(self.node2)
        } else if node == self.node2 {
            Some(self.node1)
        } else {
            None
        }
    }
}
