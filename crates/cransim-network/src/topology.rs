//! Network topology: nodes, links and address segments.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::address::{AddressSegment, SegmentId};
use crate::error::NetworkError;
use crate::link::{Link, LinkId};
use crate::node::{Interface, Node, NodeId, NodeRole, Position};

/// Adjacency map: node -> (neighbour -> link).
pub type NodeLinksMap = BTreeMap<NodeId, BTreeMap<NodeId, LinkId>>;

/// Owns all nodes, links and address segments of the simulated network.
#[derive(Default)]
pub struct Topology {
    nodes: Vec<Node>,
    links: Vec<Link>,
    segments: Vec<AddressSegment>,
    node_links_map: NodeLinksMap,
    address_owners: BTreeMap<Ipv4Addr, NodeId>,
}

impl Topology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node at a fixed position and returns its id.
    pub fn add_node(&mut self, name: &str, role: NodeRole, position: Position) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            role,
            position,
            interfaces: Vec::new(),
        });
        self.node_links_map.insert(id, BTreeMap::new());
        id
    }

    /// Connects two nodes with a point-to-point link and returns its id.
    pub fn connect(
        &mut self,
        node1: NodeId,
        node2: NodeId,
        data_rate: f64,
        delay: f64,
    ) -> Result<LinkId, NetworkError> {
        self.check_node_exists(node1)?;
        self.check_node_exists(node2)?;
        if node1 == node2 {
            return Err(NetworkError::Configuration(format!("link from node {} to itself", node1)));
        }
        if self.node_links_map[&node1].contains_key(&node2) {
            return Err(NetworkError::Configuration(format!(
                "nodes {} and {} are already connected",
                node1, node2
            )));
        }
        if data_rate.is_nan() || data_rate <= 0. {
            return Err(NetworkError::Configuration(format!("link data rate must be > 0, got {}", data_rate)));
        }
        if delay.is_nan() || delay < 0. {
            return Err(NetworkError::Configuration(format!("link delay must be >= 0, got {}", delay)));
        }
        let link_id = self.links.len();
        self.links.push(Link {
            node1,
            node2,
            data_rate,
            delay,
            segment: None,
        });
        self.node_links_map.entry(node1).or_default().insert(node2, link_id);
        self.node_links_map.entry(node2).or_default().insert(node1, link_id);
        Ok(link_id)
    }

    /// Creates an address segment. Segments must not overlap.
    pub fn allocate_segment(&mut self, base: Ipv4Addr, mask: Ipv4Addr) -> Result<SegmentId, NetworkError> {
        let segment = AddressSegment::new(base, mask)?;
        if let Some(existing) = self.segments.iter().find(|s| s.subnet().overlaps(&segment.subnet())) {
            return Err(NetworkError::Configuration(format!(
                "address segment {} overlaps {}",
                segment.subnet(),
                existing.subnet()
            )));
        }
        self.segments.push(segment);
        Ok(self.segments.len() - 1)
    }

    /// Assigns the next free address of the segment to the node.
    pub fn assign(&mut self, segment: SegmentId, node: NodeId) -> Result<Ipv4Addr, NetworkError> {
        self.check_node_exists(node)?;
        self.add_interface(segment, node, None)
    }

    /// Numbers both endpoints of the link from the segment, first endpoint first.
    ///
    /// Either both addresses are assigned or none.
    pub fn assign_link(&mut self, segment: SegmentId, link: LinkId) -> Result<(Ipv4Addr, Ipv4Addr), NetworkError> {
        let Link { node1, node2, segment: current, .. } = *self.links.get(link).ok_or(NetworkError::UnknownLink(link))?;
        if current.is_some() {
            return Err(NetworkError::Configuration(format!("link {} is already numbered", link)));
        }
        let seg = self.segments.get(segment).ok_or(NetworkError::UnknownSegment(segment))?;
        if seg.remaining() < 2 {
            return Err(NetworkError::SegmentExhausted {
                subnet: seg.subnet(),
                capacity: seg.subnet().host_capacity(),
            });
        }
        let addr1 = self.add_interface(segment, node1, Some(link))?;
        let addr2 = self.add_interface(segment, node2, Some(link))?;
        self.links[link].segment = Some(segment);
        Ok((addr1, addr2))
    }

    fn add_interface(
        &mut self,
        segment: SegmentId,
        node: NodeId,
        link: Option<LinkId>,
    ) -> Result<Ipv4Addr, NetworkError> {
        let address = self
            .segments
            .get_mut(segment)
            .ok_or(NetworkError::UnknownSegment(segment))?
            .allocate(node)?;
        self.nodes[node].interfaces.push(Interface { address, segment, link });
        self.address_owners.insert(address, node);
        Ok(address)
    }

    fn check_node_exists(&self, node: NodeId) -> Result<(), NetworkError> {
        if node < self.nodes.len() {
            Ok(())
        } else {
            Err(NetworkError::UnknownNode(node))
        }
    }

    /// Returns the node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Returns all nodes in id order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the link by id.
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id]
    }

    /// Returns all links in id order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns the number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Returns the link connecting two nodes, if any.
    pub fn link_between(&self, node1: NodeId, node2: NodeId) -> Option<LinkId> {
        self.node_links_map.get(&node1)?.get(&node2).copied()
    }

    /// Returns the adjacency map.
    pub fn node_links_map(&self) -> &NodeLinksMap {
        &self.node_links_map
    }

    /// Returns the segment by id.
    pub fn segment(&self, id: SegmentId) -> &AddressSegment {
        &self.segments[id]
    }

    /// Returns all segments in id order.
    pub fn segments(&self) -> &[AddressSegment] {
        &self.segments
    }

    /// Returns the node owning the address.
    pub fn address_owner(&self, address: Ipv4Addr) -> Option<NodeId> {
        self.address_owners.get(&address).copied()
    }

    /// Returns all assigned addresses with their owners in address order.
    pub fn address_owners(&self) -> &BTreeMap<Ipv4Addr, NodeId> {
        &self.address_owners
    }

    /// Returns the nodes holding an address from the segment, in id order.
    pub fn segment_members(&self, segment: SegmentId) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&id| self.nodes[id].is_attached_to(segment))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn pair() -> (Topology, NodeId, NodeId) {
        let mut topology = Topology::new();
        let a = topology.add_node("a", NodeRole::EndDevice, Position::default());
        let b = topology.add_node("b", NodeRole::Relay, Position::new(1., 0., 0.));
        (topology, a, b)
    }

    #[test]
    fn connect_validates_input() {
        let (mut topology, a, b) = pair();
        assert_eq!(topology.connect(a, 7, 1e9, 0.001), Err(NetworkError::UnknownNode(7)));
        assert!(topology.connect(a, a, 1e9, 0.001).is_err());
        assert!(topology.connect(a, b, 0., 0.001).is_err());
        assert!(topology.connect(a, b, 1e9, -1.).is_err());
        let link = topology.connect(a, b, 1e9, 0.001).unwrap();
        assert_eq!(topology.link_between(b, a), Some(link));
        assert!(topology.connect(b, a, 1e9, 0.001).is_err());
    }

    #[test]
    fn link_endpoints_are_numbered_in_order() {
        let (mut topology, a, b) = pair();
        let link = topology.connect(b, a, 1e9, 0.002).unwrap();
        let segment = topology.allocate_segment(addr("10.3.0.0"), addr("255.255.255.0")).unwrap();
        let (first, second) = topology.assign_link(segment, link).unwrap();
        assert_eq!(first, addr("10.3.0.1"));
        assert_eq!(second, addr("10.3.0.2"));
        assert_eq!(topology.address_owner(first), Some(b));
        assert_eq!(topology.node(a).address_on_link(link), Some(second));
        assert_eq!(topology.link(link).segment, Some(segment));
        assert_eq!(topology.segment_members(segment), vec![a, b]);
    }

    #[test]
    fn overlapping_segments_are_rejected() {
        let (mut topology, _, _) = pair();
        topology.allocate_segment(addr("10.0.0.0"), addr("255.255.255.0")).unwrap();
        assert!(topology.allocate_segment(addr("10.0.0.0"), addr("255.255.0.0")).is_err());
        assert!(topology.allocate_segment(addr("10.0.1.0"), addr("255.255.255.0")).is_ok());
    }

    #[test]
    fn link_numbering_is_all_or_nothing() {
        let mut topology = Topology::new();
        let nodes: Vec<NodeId> = (0..3)
            .map(|i| topology.add_node(&format!("n{}", i), NodeRole::EndDevice, Position::default()))
            .collect();
        let l1 = topology.connect(nodes[0], nodes[1], 1e9, 0.001).unwrap();
        let l2 = topology.connect(nodes[1], nodes[2], 1e9, 0.001).unwrap();
        // /30 holds two hosts
        let segment = topology.allocate_segment(addr("10.9.0.0"), addr("255.255.255.252")).unwrap();
        topology.assign_link(segment, l1).unwrap();
        let err = topology.assign_link(segment, l2).unwrap_err();
        assert!(matches!(err, NetworkError::SegmentExhausted { capacity: 2, .. }));
        assert!(topology.node(nodes[2]).interfaces.is_empty());
        assert_eq!(topology.link(l2).segment, None);
        assert_eq!(topology.address_owners().len(), 2);
    }

    #[test]
    fn standalone_addresses_fill_segment_exactly() {
        let mut topology = Topology::new();
        let nodes: Vec<NodeId> = (0..255)
            .map(|i| topology.add_node(&format!("n{}", i), NodeRole::EndDevice, Position::default()))
            .collect();
        let segment = topology.allocate_segment(addr("10.5.0.0"), addr("255.255.255.0")).unwrap();
        let mut assigned = std::collections::BTreeSet::new();
        for &node in &nodes[..254] {
            let address = topology.assign(segment, node).unwrap();
            assert_eq!(topology.address_owner(address), Some(node));
            assigned.insert(address);
        }
        assert_eq!(assigned.len(), 254);
        assert_eq!(assigned.iter().next(), Some(&addr("10.5.0.1")));
        assert_eq!(assigned.iter().last(), Some(&addr("10.5.0.254")));

        let err = topology.assign(segment, nodes[254]).unwrap_err();
        assert!(matches!(err, NetworkError::SegmentExhausted { capacity: 254, .. }));
        assert_eq!(topology.address_owners().len(), 254);
        assert!(topology.node(nodes[254]).interfaces.is_empty());
    }
}
