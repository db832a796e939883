//! Routing algorithms and forwarding tables.

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use log::debug;
use serde::Serialize;

use crate::address::Subnet;
use crate::error::NetworkError;
use crate::link::LinkId;
use crate::node::NodeId;
use crate::topology::Topology;

/// Calculates the paths between pairs of nodes in a network.
pub trait RoutingAlgorithm {
    /// Performs initialization of the routing algorithm based on the provided network topology.
    fn init(&mut self, topology: &Topology);

    /// Returns the path length from `src` to `dst`, or `None` if `dst` is unreachable.
    ///
    /// Can be used only after calling [`Self::init`].
    fn distance(&self, src: NodeId, dst: NodeId) -> Option<usize>;

    /// Returns the neighbour of `src` (and the link leading to it) on the path to `dst`.
    ///
    /// Returns `None` if `src == dst` or `dst` is unreachable.
    fn next_hop(&self, src: NodeId, dst: NodeId) -> Option<(NodeId, LinkId)>;
}

// Shortest Path (BFS) -------------------------------------------------------------------------------------------------

/// Static routing algorithm which returns shortest paths by hop count, computed by a breadth-first search
/// from every node.
///
/// Neighbours are visited in node id order, so among equally short paths the one through the lowest node ids wins.
#[derive(Default)]
pub struct ShortestPathBfs {
    distance: Vec<Vec<Option<usize>>>,
    first_hop: Vec<Vec<Option<(NodeId, LinkId)>>>,
}

impl ShortestPathBfs {
    fn bfs_for_node(&mut self, src: NodeId, topology: &Topology) {
        let node_count = topology.node_count();
        let mut distance = vec![None; node_count];
        let mut first_hop: Vec<Option<(NodeId, LinkId)>> = vec![None; node_count];
        let mut queue = VecDeque::new();
        distance[src] = Some(0);
        queue.push_back(src);

        let node_links_map = topology.node_links_map();
        while let Some(node) = queue.pop_front() {
            let node_distance = distance[node].unwrap_or(0);
            for (&neighbour, &link_id) in &node_links_map[&node] {
                if distance[neighbour].is_some() {
                    continue;
                }
                distance[neighbour] = Some(node_distance + 1);
                first_hop[neighbour] = if node == src {
                    Some((neighbour, link_id))
                } else {
                    first_hop[node]
                };
                queue.push_back(neighbour);
            }
        }
        self.distance[src] = distance;
        self.first_hop[src] = first_hop;
    }
}

impl RoutingAlgorithm for ShortestPathBfs {
    fn init(&mut self, topology: &Topology) {
        let node_count = topology.node_count();
        self.distance = vec![Vec::new(); node_count];
        self.first_hop = vec![Vec::new(); node_count];
        for node in 0..node_count {
            self.bfs_for_node(node, topology);
        }
    }

    fn distance(&self, src: NodeId, dst: NodeId) -> Option<usize> {
        self.distance.get(src)?.get(dst).copied().flatten()
    }

    fn next_hop(&self, src: NodeId, dst: NodeId) -> Option<(NodeId, LinkId)> {
        self.first_hop.get(src)?.get(dst).copied().flatten()
    }
}

// Forwarding tables ---------------------------------------------------------------------------------------------------

/// A single forwarding entry of a node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteEntry {
    /// Destination prefix: an address segment or a single host.
    pub destination: Subnet,
    /// Next node on the path, `None` if the destination is on-link.
    pub next_hop: Option<NodeId>,
    /// Link used to leave the node, `None` for on-link entries without a bound link.
    pub egress: Option<LinkId>,
    /// Number of hops to the nearest node of the destination.
    pub hops: usize,
}

/// Forwarding table of one node.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    /// Returns all entries: segment routes in segment order, then host routes in address order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Returns the most specific entry matching the address.
    pub fn lookup(&self, address: Ipv4Addr) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.destination.contains(address))
            .max_by_key(|entry| entry.destination.prefix_len)
    }

    /// Returns the entry for the exact destination prefix.
    pub fn route_to(&self, destination: &Subnet) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.destination == *destination)
    }
}

/// Forwarding tables of all nodes, indexed by node id.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RoutingTables {
    tables: Vec<RoutingTable>,
}

impl RoutingTables {
    /// Returns the table of the node.
    pub fn table(&self, node: NodeId) -> &RoutingTable {
        &self.tables[node]
    }

    /// Returns the number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if there are no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Computes forwarding tables for every node using hop-count shortest paths.
///
/// Must be called after the topology is complete. Any later topology change requires a full recompute.
pub fn resolve(topology: &Topology) -> Result<RoutingTables, NetworkError> {
    let mut algorithm = ShortestPathBfs::default();
    resolve_with(topology, &mut algorithm)
}

/// Computes forwarding tables using the provided routing algorithm.
///
/// Every node gets a route to every address segment (towards the nearest node holding an address from it)
/// and a host route to every address assigned to another reachable node.
/// Fails with [`NetworkError::UnreachableNetwork`] if some segment cannot be reached from some node.
pub fn resolve_with(topology: &Topology, algorithm: &mut dyn RoutingAlgorithm) -> Result<RoutingTables, NetworkError> {
    algorithm.init(topology);
    let members: Vec<Vec<NodeId>> = (0..topology.segments().len())
        .map(|segment| topology.segment_members(segment))
        .collect();

    let mut tables = Vec::with_capacity(topology.node_count());
    for node in 0..topology.node_count() {
        let mut entries = Vec::new();
        for (segment_id, segment) in topology.segments().iter().enumerate() {
            let subnet = segment.subnet();
            let nearest = members[segment_id]
                .iter()
                .filter_map(|&member| algorithm.distance(node, member).map(|d| (d, member)))
                .min()
                .ok_or(NetworkError::UnreachableNetwork { node, subnet })?;
            entries.push(route_entry(topology, &*algorithm, node, nearest, subnet, segment_id));
        }
        for (&address, &owner) in topology.address_owners() {
            if owner == node {
                continue;
            }
            if let Some(hops) = algorithm.distance(node, owner) {
                let next = algorithm.next_hop(node, owner);
                entries.push(RouteEntry {
                    destination: Subnet::host(address),
                    next_hop: next.map(|(hop, _)| hop),
                    egress: next.map(|(_, link)| link),
                    hops,
                });
            }
        }
        debug!(target: "routing", "node {}: {} routes", node, entries.len());
        tables.push(RoutingTable { entries });
    }
    Ok(RoutingTables { tables })
}

fn route_entry(
    topology: &Topology,
    algorithm: &dyn RoutingAlgorithm,
    node: NodeId,
    (hops, nearest): (usize, NodeId),
    subnet: Subnet,
    segment_id: usize,
) -> RouteEntry {
    if nearest == node {
        let egress = topology
            .node(node)
            .interfaces
            .iter()
            .find(|iface| iface.segment == segment_id)
            .and_then(|iface| iface.link);
        return RouteEntry {
            destination: subnet,
            next_hop: None,
            egress,
            hops,
        };
    }
    let next = algorithm.next_hop(node, nearest);
    RouteEntry {
        destination: subnet,
        next_hop: next.map(|(hop, _)| hop),
        egress: next.map(|(_, link)| link),
        hops,
    }
}
