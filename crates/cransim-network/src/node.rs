//! Network node.

use std::net::Ipv4Addr;

use serde::Serialize;

use crate::address::SegmentId;
use crate::link::LinkId;

/// Unique node id.
pub type NodeId = usize;

/// Tier of the node in the access network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// User equipment.
    EndDevice,
    /// Remote radio head.
    Relay,
    /// Optical network unit.
    Aggregator,
    /// Base station.
    Gateway,
    /// Cloud.
    Sink,
}

/// Static node position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// Creates a position from coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Address assigned to a node.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Interface {
    /// Assigned address.
    pub address: Ipv4Addr,
    /// Segment the address belongs to.
    pub segment: SegmentId,
    /// Link the address is bound to (`None` for addresses assigned directly to the node).
    pub link: Option<LinkId>,
}

/// A node in the network.
#[derive(Clone, Debug, Serialize)]
pub struct Node {
    /// Node name.
    pub name: String,
    /// Node tier.
    pub role: NodeRole,
    /// Node position, fixed at construction.
    pub position: Position,
    /// Addresses in assignment order.
    pub interfaces: Vec<Interface>,
}

impl Node {
    /// Returns the address bound to the link, if any.
    pub fn address_on_link(&self, link: LinkId) -> Option<Ipv4Addr> {
        self.interfaces
            .iter()
            .find(|iface| iface.link == Some(link))
            .map(|iface| iface.address)
    }

    /// Returns true if the node has an address from the segment.
    pub fn is_attached_to(&self, segment: SegmentId) -> bool {
        self.interfaces.iter().any(|iface| iface.segment == segment)
    }
}
