//! Timeline of a simulation run.

use std::fs::File;
use std::io::Write;
use std::net::Ipv4Addr;

use serde::Serialize;

use cransim_network::{LinkId, NetworkObserver, NodeId, NodeRole, Packet, Position, Topology};

use crate::error::TimelineError;
use crate::record::{Color, EventKind, PacketPayload, Payload, Record, Subject};

#[derive(Clone, Debug, Serialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub role: NodeRole,
    pub position: Position,
    pub addresses: Vec<Ipv4Addr>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LinkInfo {
    pub id: LinkId,
    pub node1: NodeId,
    pub node2: NodeId,
    pub data_rate: f64,
    pub delay: f64,
    pub addresses: Vec<Ipv4Addr>,
}

#[derive(Serialize)]
struct Trace<'a> {
    duration: f64,
    nodes: &'a [NodeInfo],
    links: &'a [LinkInfo],
    records: &'a [Record],
}

/// Accumulates the trace of a run.
///
/// The timeline only observes the simulation. Packet records are collected through
/// the [`NetworkObserver`] implementation, node cosmetics (labels and colors) are owned here.
pub struct Timeline {
    duration: f64,
    nodes: Vec<NodeInfo>,
    links: Vec<LinkInfo>,
    records: Vec<Record>,
}

impl Timeline {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            nodes: Vec::new(),
            links: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Stores the node and link listing and records the initial node positions.
    pub fn record_topology(&mut self, topology: &Topology) {
        self.nodes = topology
            .nodes()
            .iter()
            .enumerate()
            .map(|(id, node)| NodeInfo {
                id,
                name: node.name.clone(),
                role: node.role,
                position: node.position,
                addresses: node.interfaces.iter().map(|i| i.address).collect(),
            })
            .collect();
        self.links = topology
            .links()
            .iter()
            .enumerate()
            .map(|(id, link)| LinkInfo {
                id,
                node1: link.node1,
                node2: link.node2,
                data_rate: link.data_rate,
                delay: link.delay,
                addresses: [link.node1, link.node2]
                    .iter()
                    .filter_map(|&node| topology.node(node).address_on_link(id))
                    .collect(),
            })
            .collect();
        for (id, node) in topology.nodes().iter().enumerate() {
            self.push(0., Subject::Node(id), EventKind::PositionSet, Payload::Position(node.position));
        }
    }

    pub fn set_label(&mut self, node: NodeId, label: &str) -> Result<(), TimelineError> {
        self.record_event(
            Subject::Node(node),
            EventKind::LabelSet,
            0.,
            Payload::Label {
                label: label.to_string(),
            },
        )
    }

    pub fn set_color(&mut self, node: NodeId, color: Color) -> Result<(), TimelineError> {
        self.record_event(Subject::Node(node), EventKind::ColorSet, 0., Payload::Color(color))
    }

    /// Appends a record after checking its subject, timestamp and payload shape.
    pub fn record_event(
        &mut self,
        subject: Subject,
        kind: EventKind,
        timestamp: f64,
        payload: Payload,
    ) -> Result<(), TimelineError> {
        match subject {
            Subject::Node(id) if id >= self.nodes.len() => return Err(TimelineError::UnknownNode(id)),
            Subject::Link(id) if id >= self.links.len() => return Err(TimelineError::UnknownLink(id)),
            _ => {}
        }
        if !timestamp.is_finite() || timestamp < 0. {
            return Err(TimelineError::InvalidTimestamp(timestamp));
        }
        if !payload.matches(kind) {
            return Err(TimelineError::PayloadMismatch(kind));
        }
        self.push(timestamp, subject, kind, payload);
        Ok(())
    }

    fn push(&mut self, timestamp: f64, subject: Subject, kind: EventKind, payload: Payload) {
        self.records.push(Record {
            timestamp,
            subject,
            kind,
            payload,
        });
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    pub fn links(&self) -> &[LinkInfo] {
        &self.links
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Orders the records by timestamp, keeping emission order for equal timestamps,
    /// and serializes the trace to JSON.
    pub fn finalize(&mut self) -> Result<String, TimelineError> {
        self.records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        let trace = Trace {
            duration: self.duration,
            nodes: &self.nodes,
            links: &self.links,
            records: &self.records,
        };
        Ok(serde_json::to_string_pretty(&trace)?)
    }

    pub fn save_to_file(&mut self, path: &str) -> Result<(), TimelineError> {
        let trace = self.finalize()?;
        File::create(path)?.write_all(trace.as_bytes())?;
        Ok(())
    }
}

impl NetworkObserver for Timeline {
    fn on_packet_sent(&mut self, time: f64, node: NodeId, packet: &Packet) {
        self.push(
            time,
            Subject::Node(node),
            EventKind::PacketSent,
            Payload::Packet(PacketPayload::new(packet)),
        );
    }

    fn on_packet_received(&mut self, time: f64, node: NodeId, packet: &Packet) {
        self.push(
            time,
            Subject::Node(node),
            EventKind::PacketReceived,
            Payload::Packet(PacketPayload::new(packet)),
        );
    }

    fn on_link_transmit(&mut self, time: f64, link: LinkId, from: NodeId, to: NodeId, packet: &Packet) {
        self.push(
            time,
            Subject::Link(link),
            EventKind::PacketSent,
            Payload::Packet(PacketPayload::with_hop(packet, from, to)),
        );
    }

    fn on_link_receive(&mut self, time: f64, link: LinkId, from: NodeId, to: NodeId, packet: &Packet) {
        self.push(
            time,
            Subject::Link(link),
            EventKind::PacketReceived,
            Payload::Packet(PacketPayload::with_hop(packet, from, to)),
        );
    }
}
