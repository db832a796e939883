//! Packet forwarding over the simulated network.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::rc::Rc;

use serde::Serialize;

use cransim_core::{cast, log_debug, log_warn, Event, EventHandler, Id, SimulationContext};

use crate::error::NetworkError;
use crate::link::LinkId;
use crate::node::NodeId;
use crate::routing::RoutingTables;
use crate::topology::Topology;

/// A datagram travelling through the network.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Packet {
    /// Network-wide unique packet id.
    pub uid: u64,
    /// Source address.
    pub src: Ipv4Addr,
    /// Source port.
    pub src_port: u16,
    /// Destination address.
    pub dst: Ipv4Addr,
    /// Destination port.
    pub dst_port: u16,
    /// Payload size in bytes.
    pub size: u32,
    /// Application-level sequence number.
    pub seq: u64,
    /// Time the packet was sent by the application.
    pub sent_at: f64,
}

/// Event delivered to the application bound to the destination port.
#[derive(Clone, Serialize)]
pub struct PacketDelivered {
    /// Delivered packet.
    pub packet: Packet,
    /// Node the packet was delivered at.
    pub node: NodeId,
}

#[derive(Clone, Serialize)]
struct HopCompleted {
    packet: Packet,
    link: LinkId,
    from: NodeId,
    to: NodeId,
}

/// Receives notifications about packet movement. Observers must not change the simulation state.
pub trait NetworkObserver {
    /// Called when an application hands a packet to the network.
    fn on_packet_sent(&mut self, time: f64, node: NodeId, packet: &Packet);

    /// Called when a packet reaches the node owning its destination address.
    fn on_packet_received(&mut self, time: f64, node: NodeId, packet: &Packet);

    /// Called when a packet starts crossing a link.
    fn on_link_transmit(&mut self, _time: f64, _link: LinkId, _from: NodeId, _to: NodeId, _packet: &Packet) {}

    /// Called when a packet arrives at the far end of a link.
    fn on_link_receive(&mut self, _time: f64, _link: LinkId, _from: NodeId, _to: NodeId, _packet: &Packet) {}
}

/// Simulation component forwarding packets along the resolved routes.
///
/// Each hop takes the propagation delay of the traversed link, so the end-to-end latency of a packet is the sum
/// of link delays on its path. Packets are never lost.
pub struct Network {
    topology: Topology,
    routes: RoutingTables,
    bindings: BTreeMap<(NodeId, u16), Id>,
    observers: Vec<Rc<RefCell<dyn NetworkObserver>>>,
    packet_count: u64,
    ctx: SimulationContext,
}

impl Network {
    /// Creates the network over a complete topology and its forwarding tables.
    pub fn new(topology: Topology, routes: RoutingTables, ctx: SimulationContext) -> Self {
        Self {
            topology,
            routes,
            bindings: BTreeMap::new(),
            observers: Vec::new(),
            packet_count: 0,
            ctx,
        }
    }

    /// Returns the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Returns the forwarding tables.
    pub fn routes(&self) -> &RoutingTables {
        &self.routes
    }

    /// Registers a packet observer.
    pub fn add_observer(&mut self, observer: Rc<RefCell<dyn NetworkObserver>>) {
        self.observers.push(observer);
    }

    /// Binds the component to the port of the node, so it receives [`PacketDelivered`] events for that port.
    pub fn bind(&mut self, node: NodeId, port: u16, component: Id) -> Result<(), NetworkError> {
        if node >= self.topology.node_count() {
            return Err(NetworkError::UnknownNode(node));
        }
        if self.bindings.contains_key(&(node, port)) {
            return Err(NetworkError::Configuration(format!(
                "port {} of node {} is already bound",
                port, node
            )));
        }
        self.bindings.insert((node, port), component);
        Ok(())
    }

    /// Returns the number of packets sent so far.
    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    /// Returns the source address the node uses to reach the destination.
    pub fn source_address(&self, node: NodeId, dst: Ipv4Addr) -> Result<Ipv4Addr, NetworkError> {
        let node_info = self.topology.node(node);
        let egress = self.routes.table(node).lookup(dst).and_then(|entry| entry.egress);
        egress
            .and_then(|link| node_info.address_on_link(link))
            .or_else(|| node_info.interfaces.first().map(|iface| iface.address))
            .ok_or_else(|| NetworkError::Configuration(format!("node {} has no address", node)))
    }

    /// Returns the links a packet from the node to the address traverses.
    pub fn path(&self, src: NodeId, dst: Ipv4Addr) -> Result<Vec<LinkId>, NetworkError> {
        let mut path = Vec::new();
        let mut node = src;
        while self.topology.address_owner(dst) != Some(node) {
            let (next, link) = self.next_hop(node, dst).ok_or(NetworkError::UnknownAddress(dst))?;
            path.push(link);
            node = next;
            if path.len() > self.topology.link_count() {
                return Err(NetworkError::UnknownAddress(dst));
            }
        }
        Ok(path)
    }

    /// Returns the sum of link delays on the path from the node to the address.
    pub fn path_latency(&self, src: NodeId, dst: Ipv4Addr) -> Result<f64, NetworkError> {
        Ok(self
            .path(src, dst)?
            .iter()
            .map(|&link| self.topology.link(link).delay)
            .sum())
    }

    fn next_hop(&self, node: NodeId, dst: Ipv4Addr) -> Option<(NodeId, LinkId)> {
        let entry = self.routes.table(node).lookup(dst)?;
        Some((entry.next_hop?, entry.egress?))
    }

    /// Sends an application packet from the node and returns its uid.
    pub fn send_packet(
        &mut self,
        node: NodeId,
        src_port: u16,
        dst: Ipv4Addr,
        dst_port: u16,
        size: u32,
        seq: u64,
    ) -> Result<u64, NetworkError> {
        if self.topology.address_owner(dst).is_none() {
            return Err(NetworkError::UnknownAddress(dst));
        }
        let src = self.source_address(node, dst)?;
        self.packet_count += 1;
        let packet = Packet {
            uid: self.packet_count,
            src,
            src_port,
            dst,
            dst_port,
            size,
            seq,
            sent_at: self.ctx.time(),
        };
        log_debug!(
            self.ctx,
            "packet {} of size {} sent from {}:{} to {}:{}",
            packet.uid,
            size,
            src,
            src_port,
            dst,
            dst_port
        );
        let time = self.ctx.time();
        for observer in &self.observers {
            observer.borrow_mut().on_packet_sent(time, node, &packet);
        }
        let uid = packet.uid;
        self.forward(packet, node);
        Ok(uid)
    }

    fn forward(&mut self, packet: Packet, node: NodeId) {
        let time = self.ctx.time();
        if self.topology.address_owner(packet.dst) == Some(node) {
            for observer in &self.observers {
                observer.borrow_mut().on_packet_received(time, node, &packet);
            }
            match self.bindings.get(&(node, packet.dst_port)) {
                Some(&component) => {
                    self.ctx.emit_now(PacketDelivered { packet, node }, component);
                }
                None => {
                    log_debug!(
                        self.ctx,
                        "packet {} dropped at node {}: nothing bound to port {}",
                        packet.uid,
                        node,
                        packet.dst_port
                    );
                }
            }
            return;
        }
        match self.next_hop(node, packet.dst) {
            Some((next, link)) => {
                for observer in &self.observers {
                    observer.borrow_mut().on_link_transmit(time, link, node, next, &packet);
                }
                let delay = self.topology.link(link).delay;
                self.ctx.emit_self(
                    HopCompleted {
                        packet,
                        link,
                        from: node,
                        to: next,
                    },
                    delay,
                );
            }
            None => {
                log_warn!(
                    self.ctx,
                    "packet {} dropped at node {}: no route to {}",
                    packet.uid,
                    node,
                    packet.dst
                );
            }
        }
    }
}

impl EventHandler for Network {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            HopCompleted { packet, link, from, to } => {
                let time = self.ctx.time();
                for observer in &self.observers {
                    observer.borrow_mut().on_link_receive(time, link, from, to, &packet);
                }
                self.forward(packet, to);
            }
        })
    }
}
