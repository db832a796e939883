#![warn(missing_docs)]
//! Network topology, addressing, routing and packet forwarding.
//!
//! A [`Topology`] is built node by node and link by link, addresses are handed out from non-overlapping
//! address segments, and [`routing::resolve`] computes per-node forwarding tables once the topology is
//! complete. The [`Network`] component then moves packets hop by hop through the simulation.

pub mod address;
pub mod error;
pub mod link;
pub mod network;
pub mod node;
pub mod routing;
pub mod topology;

pub use address::{AddressSegment, SegmentId, Subnet};
pub use error::NetworkError;
pub use link::{Link, LinkId};
pub use network::{Network, NetworkObserver, Packet, PacketDelivered};
pub use node::{Interface, Node, NodeId, NodeRole, Position};
pub use routing::{resolve, RouteEntry, RoutingAlgorithm, RoutingTable, RoutingTables, ShortestPathBfs};
pub use topology::Topology;
