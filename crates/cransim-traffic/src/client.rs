//! Echo client: the requesting side of a flow.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use cransim_core::{cast, log_debug, log_error, log_info, Event, EventHandler, EventId, Id, SimulationContext, EPSILON};
use cransim_network::{Network, PacketDelivered};

use crate::flow::{Flow, FlowState, FlowStats};

/// Moves the flow from `Idle` to `Sending`.
#[derive(Clone, Serialize)]
pub struct StartFlow {}

/// Moves the flow to `Stopped` and cancels the pending request.
#[derive(Clone, Serialize)]
pub struct StopFlow {}

#[derive(Clone, Serialize)]
struct SendRequest {}

/// Sends one request per interval to the flow destination and counts the echoed responses.
pub struct EchoClient {
    flow: Flow,
    src_port: u16,
    state: FlowState,
    closed: bool,
    packets_sent: u64,
    responses_received: u64,
    pending_request: Option<EventId>,
    net: Rc<RefCell<Network>>,
    ctx: SimulationContext,
}

impl EchoClient {
    /// Creates an idle client for the flow, receiving responses on `src_port`.
    pub fn new(flow: Flow, src_port: u16, net: Rc<RefCell<Network>>, ctx: SimulationContext) -> Self {
        Self {
            flow,
            src_port,
            state: FlowState::Idle,
            closed: false,
            packets_sent: 0,
            responses_received: 0,
            pending_request: None,
            net,
            ctx,
        }
    }

    /// Returns the client component id.
    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Returns the flow state.
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Returns the flow statistics.
    pub fn stats(&self) -> FlowStats {
        FlowStats {
            flow: self.flow.clone(),
            state: self.state,
            packets_sent: self.packets_sent,
            responses_received: self.responses_received,
        }
    }

    fn on_start(&mut self) {
        if self.state != FlowState::Idle {
            return;
        }
        log_info!(
            self.ctx,
            "flow started: {} requests of {} bytes to {}:{} every {}s",
            self.flow.max_packets,
            self.flow.payload_size,
            self.flow.destination,
            self.flow.port,
            self.flow.interval
        );
        if self.ctx.time() >= self.flow.stop_time - EPSILON {
            self.state = FlowState::Stopped;
            return;
        }
        self.state = FlowState::Sending;
        self.send_request();
    }

    fn on_send_request(&mut self) {
        self.pending_request = None;
        if self.state == FlowState::Sending {
            self.send_request();
        }
    }

    fn send_request(&mut self) {
        let seq = self.packets_sent;
        let result = self.net.borrow_mut().send_packet(
            self.flow.source,
            self.src_port,
            self.flow.destination,
            self.flow.port,
            self.flow.payload_size,
            seq,
        );
        match result {
            Ok(uid) => {
                self.packets_sent += 1;
                log_debug!(self.ctx, "sent request {} (packet {})", seq, uid);
            }
            Err(e) => {
                log_error!(self.ctx, "failed to send request {}: {}", seq, e);
                self.state = FlowState::Stopped;
                return;
            }
        }
        self.schedule_next_request();
    }

    fn schedule_next_request(&mut self) {
        if self.packets_sent >= self.flow.max_packets {
            log_info!(self.ctx, "all {} requests sent", self.packets_sent);
            self.state = FlowState::Stopped;
            return;
        }
        let next_time = self.flow.send_time(self.packets_sent);
        // a request due at the stop time is not sent
        if next_time >= self.flow.stop_time - EPSILON {
            return;
        }
        match self.ctx.emit_self_at(SendRequest {}, next_time) {
            Ok(event_id) => self.pending_request = Some(event_id),
            Err(e) => {
                log_error!(self.ctx, "{}", e);
                self.state = FlowState::Stopped;
            }
        }
    }

    fn on_stop(&mut self) {
        if let Some(event_id) = self.pending_request.take() {
            self.ctx.cancel_event(event_id);
        }
        self.state = FlowState::Stopped;
        self.closed = true;
        log_info!(
            self.ctx,
            "flow stopped: {} requests sent, {} responses received",
            self.packets_sent,
            self.responses_received
        );
    }

    fn on_response(&mut self, delivered: PacketDelivered) {
        if self.closed {
            log_debug!(self.ctx, "response {} ignored: flow is closed", delivered.packet.seq);
            return;
        }
        self.responses_received += 1;
        log_debug!(
            self.ctx,
            "received response {} from {}, round trip {:.6}s",
            delivered.packet.seq,
            delivered.packet.src,
            self.ctx.time() - self.flow.send_time(delivered.packet.seq)
        );
    }
}

impl EventHandler for EchoClient {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            StartFlow {} => {
                self.on_start();
            }
            SendRequest {} => {
                self.on_send_request();
            }
            StopFlow {} => {
                self.on_stop();
            }
            PacketDelivered { packet, node } => {
                self.on_response(PacketDelivered { packet, node });
            }
        })
    }
}
