//! Trace analysis: packet counts, latency and delivery rate.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::error::TimelineError;
use crate::record::{EventKind, PacketPayload, Payload, Record, Subject};

/// End-to-end latency of one delivered packet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PacketLatency {
    pub uid: u64,
    pub seq: u64,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub sent_at: f64,
    pub received_at: f64,
    pub latency: f64,
}

/// Aggregate packet statistics of a trace.
///
/// Only node-level packet records are taken into account, packets are matched by uid.
/// Packets still in flight when the run stopped count as lost.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceSummary {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_lost: u64,
    /// Average latency in seconds, 0 when nothing was received.
    pub average_latency: f64,
    /// Percentage of sent packets that were received.
    pub delivery_rate: f64,
}

impl TraceSummary {
    pub fn from_records(records: &[Record]) -> Self {
        let packets_sent = node_packets(records, EventKind::PacketSent).count() as u64;
        let latencies = packet_latencies(records);
        let packets_received = latencies.len() as u64;
        let average_latency = if latencies.is_empty() {
            0.
        } else {
            latencies.iter().map(|l| l.latency).sum::<f64>() / latencies.len() as f64
        };
        let delivery_rate = if packets_sent > 0 {
            packets_received as f64 / packets_sent as f64 * 100.
        } else {
            0.
        };
        Self {
            packets_sent,
            packets_received,
            packets_lost: packets_sent - packets_received,
            average_latency,
            delivery_rate,
        }
    }
}

fn node_packets<'a>(records: &'a [Record], kind: EventKind) -> impl Iterator<Item = (f64, &'a PacketPayload)> + 'a {
    records.iter().filter_map(move |r| match (&r.subject, &r.payload) {
        (Subject::Node(_), Payload::Packet(packet)) if r.kind == kind => Some((r.timestamp, packet)),
        _ => None,
    })
}

/// Returns the latencies of delivered packets in receive order.
pub fn packet_latencies(records: &[Record]) -> Vec<PacketLatency> {
    let send_times: BTreeMap<u64, f64> = node_packets(records, EventKind::PacketSent)
        .map(|(time, packet)| (packet.uid, time))
        .collect();
    node_packets(records, EventKind::PacketReceived)
        .filter_map(|(time, packet)| {
            send_times.get(&packet.uid).map(|&sent_at| PacketLatency {
                uid: packet.uid,
                seq: packet.seq,
                src: packet.src,
                dst: packet.dst,
                sent_at,
                received_at: time,
                latency: time - sent_at,
            })
        })
        .collect()
}

/// Writes per-packet latencies as CSV.
pub fn write_latencies<W: Write>(records: &[Record], writer: W) -> Result<(), TimelineError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for latency in packet_latencies(records) {
        wtr.serialize(latency)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_latencies(records: &[Record], path: &str) -> Result<(), TimelineError> {
    write_latencies(records, File::create(path)?)
}
