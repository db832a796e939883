//! Echo server: answers every request with a response of the same size.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use cransim_core::{cast, log_debug, log_info, log_warn, Event, EventHandler, SimulationContext};
use cransim_network::{Network, NodeId, Packet, PacketDelivered};

/// Starts answering requests.
#[derive(Clone, Serialize)]
pub struct StartServer {}

/// Stops answering requests.
#[derive(Clone, Serialize)]
pub struct StopServer {}

/// Echo server bound to a port of a node.
pub struct EchoServer {
    node: NodeId,
    port: u16,
    running: bool,
    requests_answered: u64,
    requests_dropped: u64,
    net: Rc<RefCell<Network>>,
    ctx: SimulationContext,
}

impl EchoServer {
    /// Creates a stopped server.
    pub fn new(node: NodeId, port: u16, net: Rc<RefCell<Network>>, ctx: SimulationContext) -> Self {
        Self {
            node,
            port,
            running: false,
            requests_answered: 0,
            requests_dropped: 0,
            net,
            ctx,
        }
    }

    /// Returns the number of answered requests.
    pub fn requests_answered(&self) -> u64 {
        self.requests_answered
    }

    /// Returns the number of requests that arrived while the server was not running.
    pub fn requests_dropped(&self) -> u64 {
        self.requests_dropped
    }

    fn on_request(&mut self, request: Packet) {
        if !self.running {
            self.requests_dropped += 1;
            log_debug!(self.ctx, "request {} from {} dropped: server is not running", request.seq, request.src);
            return;
        }
        let result = self.net.borrow_mut().send_packet(
            self.node,
            self.port,
            request.src,
            request.src_port,
            request.size,
            request.seq,
        );
        match result {
            Ok(_) => {
                self.requests_answered += 1;
                log_debug!(self.ctx, "echoed request {} of {} bytes to {}", request.seq, request.size, request.src);
            }
            Err(e) => log_warn!(self.ctx, "cannot answer {}: {}", request.src, e),
        }
    }
}

impl EventHandler for EchoServer {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            StartServer {} => {
                log_info!(self.ctx, "listening on port {}", self.port);
                self.running = true;
            }
            StopServer {} => {
                log_info!(self.ctx, "stopped after answering {} requests", self.requests_answered);
                self.running = false;
            }
            PacketDelivered { packet, node: _ } => {
                self.on_request(packet);
            }
        })
    }
}
