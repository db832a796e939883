//! Flow description and lifecycle.

use std::net::Ipv4Addr;

use serde::Serialize;

use cransim_network::NodeId;

/// Index of the flow in the traffic generator.
pub type FlowId = usize;

/// A request/response stream from a source node to a destination address.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Flow {
    /// Node sending the requests.
    pub source: NodeId,
    /// Address of the responding node.
    pub destination: Ipv4Addr,
    /// Destination port.
    pub port: u16,
    /// Maximum number of requests.
    pub max_packets: u64,
    /// Time between consecutive requests.
    pub interval: f64,
    /// Request payload size in bytes.
    pub payload_size: u32,
    /// Time of the first request.
    pub start_time: f64,
    /// Time after which no requests are sent and responses are ignored.
    pub stop_time: f64,
}

impl Flow {
    /// Time of the request with the given sequence number.
    ///
    /// Computed from the start time rather than accumulated, so long flows do not drift.
    pub fn send_time(&self, seq: u64) -> f64 {
        self.start_time + seq as f64 * self.interval
    }
}

/// Flow state. `Stopped` is terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FlowState {
    /// Waiting for the start time.
    Idle,
    /// Sending a request every interval.
    Sending,
    /// Stop time reached or all requests sent.
    Stopped,
}

/// Flow outcome, available during and after the run.
#[derive(Clone, Debug, Serialize)]
pub struct FlowStats {
    /// Flow description.
    pub flow: Flow,
    /// Current state.
    pub state: FlowState,
    /// Number of requests sent.
    pub packets_sent: u64,
    /// Number of responses received before the stop time.
    pub responses_received: u64,
}
