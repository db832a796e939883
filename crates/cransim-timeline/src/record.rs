//! Trace records.

use std::net::Ipv4Addr;

use serde::Serialize;

use cransim_network::{LinkId, NodeId, Packet, Position};

/// What a record is about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "kebab-case")]
pub enum Subject {
    Node(NodeId),
    Link(LinkId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    PositionSet,
    LabelSet,
    ColorSet,
    PacketSent,
    PacketReceived,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Packet fields carried by `packet-sent` and `packet-received` records.
///
/// Link-level records also name the hop endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PacketPayload {
    pub uid: u64,
    pub seq: u64,
    pub src: Ipv4Addr,
    pub src_port: u16,
    pub dst: Ipv4Addr,
    pub dst_port: u16,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NodeId>,
}

impl PacketPayload {
    pub fn new(packet: &Packet) -> Self {
        Self {
            uid: packet.uid,
            seq: packet.seq,
            src: packet.src,
            src_port: packet.src_port,
            dst: packet.dst,
            dst_port: packet.dst_port,
            size: packet.size,
            from: None,
            to: None,
        }
    }

    pub fn with_hop(packet: &Packet, from: NodeId, to: NodeId) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::new(packet)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Position(Position),
    Label { label: String },
    Color(Color),
    Packet(PacketPayload),
}

impl Payload {
    /// Checks that the payload has the shape expected for the event kind.
    pub fn matches(&self, kind: EventKind) -> bool {
        matches!(
            (kind, self),
            (EventKind::PositionSet, Payload::Position(_))
                | (EventKind::LabelSet, Payload::Label { .. })
                | (EventKind::ColorSet, Payload::Color(_))
                | (EventKind::PacketSent, Payload::Packet(_))
                | (EventKind::PacketReceived, Payload::Packet(_))
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub timestamp: f64,
    pub subject: Subject,
    pub kind: EventKind,
    pub payload: Payload,
}
