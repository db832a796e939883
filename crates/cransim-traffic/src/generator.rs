//! Traffic generator: creates flows and echo servers and schedules their start and stop.

use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use cransim_core::{log_debug, Id, SchedulingError, Simulation, SimulationContext, EPSILON};
use cransim_network::{Network, NetworkError, NodeId};

use crate::client::{EchoClient, StartFlow, StopFlow};
use crate::error::TrafficError;
use crate::flow::{Flow, FlowId, FlowStats};
use crate::server::{EchoServer, StartServer, StopServer};

/// First port used for the client side of flows.
pub const EPHEMERAL_PORT_START: u16 = 49153;

/// Owns the flows and applications of a run.
///
/// Flows refer to nodes and addresses by value only, the topology stays owned by the [`Network`].
pub struct TrafficGenerator {
    net: Rc<RefCell<Network>>,
    clients: Vec<Rc<RefCell<EchoClient>>>,
    servers: Vec<Rc<RefCell<EchoServer>>>,
    next_port: u16,
    ctx: SimulationContext,
}

impl TrafficGenerator {
    /// Creates a generator sending traffic through the network.
    pub fn new(net: Rc<RefCell<Network>>, ctx: SimulationContext) -> Self {
        Self {
            net,
            clients: Vec::new(),
            servers: Vec::new(),
            next_port: EPHEMERAL_PORT_START,
            ctx,
        }
    }

    /// Creates a flow and schedules its start and stop.
    pub fn create_flow(&mut self, sim: &mut Simulation, flow: Flow) -> Result<FlowId, TrafficError> {
        self.validate(&flow)?;
        let flow_id = self.clients.len();
        let source_name = self.net.borrow().topology().node(flow.source).name.clone();
        let src_port = self.allocate_port()?;
        let name = format!("client-{}-{}", flow_id, source_name);

        let client = rc!(refcell!(EchoClient::new(
            flow.clone(),
            src_port,
            self.net.clone(),
            sim.create_context(&name),
        )));
        let client_id = sim.add_handler(&name, client.clone());
        self.net.borrow_mut().bind(flow.source, src_port, client_id)?;
        self.ctx.emit_at(StartFlow {}, client_id, flow.start_time)?;
        self.ctx.emit_at(StopFlow {}, client_id, flow.stop_time)?;
        log_debug!(
            self.ctx,
            "created flow {} from {} to {}:{} in [{}, {})",
            flow_id,
            source_name,
            flow.destination,
            flow.port,
            flow.start_time,
            flow.stop_time
        );
        self.clients.push(client);
        Ok(flow_id)
    }

    /// Installs an echo server on the node port, running in `[start_time, stop_time)`.
    pub fn install_echo_server(
        &mut self,
        sim: &mut Simulation,
        node: NodeId,
        port: u16,
        start_time: f64,
        stop_time: f64,
    ) -> Result<Id, TrafficError> {
        if stop_time < start_time {
            return Err(TrafficError::Configuration(format!(
                "server stop time {} is before its start time {}",
                stop_time, start_time
            )));
        }
        if node >= self.net.borrow().topology().node_count() {
            return Err(NetworkError::UnknownNode(node).into());
        }
        self.check_not_in_past(start_time)?;
        let name = format!("server-{}-{}", self.net.borrow().topology().node(node).name, port);
        let server = rc!(refcell!(EchoServer::new(
            node,
            port,
            self.net.clone(),
            sim.create_context(&name)
        )));
        let server_id = sim.add_handler(&name, server.clone());
        self.net.borrow_mut().bind(node, port, server_id)?;
        self.ctx.emit_at(StartServer {}, server_id, start_time)?;
        self.ctx.emit_at(StopServer {}, server_id, stop_time)?;
        self.servers.push(server);
        Ok(server_id)
    }

    /// Returns the statistics of all flows in creation order.
    pub fn flow_stats(&self) -> Vec<FlowStats> {
        self.clients.iter().map(|client| client.borrow().stats()).collect()
    }

    /// Returns the component id of the flow's client.
    pub fn client_id(&self, flow: FlowId) -> Id {
        self.clients[flow].borrow().id()
    }

    /// Returns the installed echo servers.
    pub fn servers(&self) -> &[Rc<RefCell<EchoServer>>] {
        &self.servers
    }

    fn validate(&self, flow: &Flow) -> Result<(), TrafficError> {
        let net = self.net.borrow();
        if flow.source >= net.topology().node_count() {
            return Err(NetworkError::UnknownNode(flow.source).into());
        }
        if net.topology().address_owner(flow.destination).is_none() {
            return Err(TrafficError::Configuration(format!(
                "destination {} is not assigned to any node",
                flow.destination
            )));
        }
        if flow.max_packets == 0 {
            return Err(TrafficError::Configuration("flow max packets must be > 0".to_string()));
        }
        if flow.interval.is_nan() || flow.interval <= 0. {
            return Err(TrafficError::Configuration(format!(
                "flow interval must be > 0, got {}",
                flow.interval
            )));
        }
        if flow.stop_time < flow.start_time {
            return Err(TrafficError::Configuration(format!(
                "flow stop time {} is before its start time {}",
                flow.stop_time, flow.start_time
            )));
        }
        self.check_not_in_past(flow.start_time)
    }

    // Checked before any handler is registered or port is bound.
    fn check_not_in_past(&self, time: f64) -> Result<(), TrafficError> {
        let now = self.ctx.time();
        if time < now - EPSILON {
            return Err(SchedulingError { time, now }.into());
        }
        Ok(())
    }

    fn allocate_port(&mut self) -> Result<u16, TrafficError> {
        let port = self.next_port;
        self.next_port = self
            .next_port
            .checked_add(1)
            .ok_or_else(|| TrafficError::Configuration("ephemeral ports exhausted".to_string()))?;
        Ok(port)
    }
}
