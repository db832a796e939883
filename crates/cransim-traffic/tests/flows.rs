use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

use rstest::rstest;

use cransim_core::Simulation;
use cransim_network::{resolve, Network, NodeRole, Position, Topology};
use cransim_traffic::client::StopFlow;
use cransim_traffic::{Flow, FlowState, TrafficError, TrafficGenerator};

const PORT: u16 = 9;

fn addr(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

struct Setup {
    sim: Simulation,
    generator: TrafficGenerator,
}

// device - relay - cloud, 2 ms per link
fn setup() -> Setup {
    let mut topology = Topology::new();
    let device = topology.add_node("device", NodeRole::EndDevice, Position::default());
    let relay = topology.add_node("relay", NodeRole::Relay, Position::new(50., 0., 0.));
    let cloud = topology.add_node("cloud", NodeRole::Sink, Position::new(100., 0., 0.));
    let access = topology.allocate_segment(addr("10.2.0.0"), addr("255.255.255.0")).unwrap();
    let core = topology.allocate_segment(addr("10.3.0.0"), addr("255.255.255.0")).unwrap();
    let l1 = topology.connect(device, relay, 10e9, 0.002).unwrap();
    let l2 = topology.connect(relay, cloud, 10e9, 0.002).unwrap();
    topology.assign_link(access, l1).unwrap();
    topology.assign_link(core, l2).unwrap();
    let routes = resolve(&topology).unwrap();

    let mut sim = Simulation::new();
    let net = Rc::new(RefCell::new(Network::new(topology, routes, sim.create_context("net"))));
    sim.add_handler("net", net.clone());
    let generator = TrafficGenerator::new(net, sim.create_context("traffic"));
    Setup { sim, generator }
}

fn flow(max_packets: u64, interval: f64, start_time: f64, stop_time: f64) -> Flow {
    Flow {
        source: 0,
        destination: addr("10.3.0.2"),
        port: PORT,
        max_packets,
        interval,
        payload_size: 1024,
        start_time,
        stop_time,
    }
}

#[test]
fn stop_time_truncates_before_max_packets() {
    let Setup { mut sim, mut generator } = setup();
    generator.install_echo_server(&mut sim, 2, PORT, 1.0, 10.0).unwrap();
    generator.create_flow(&mut sim, flow(100, 0.1, 2.0, 10.0)).unwrap();
    sim.run_until(10.0);

    let stats = &generator.flow_stats()[0];
    assert_eq!(stats.packets_sent, 80);
    assert_eq!(stats.responses_received, 80);
    assert_eq!(stats.state, FlowState::Stopped);
    assert_eq!(generator.servers()[0].borrow().requests_answered(), 80);
}

#[rstest]
#[case(5, 5)]
#[case(1, 1)]
fn max_packets_ends_the_flow(#[case] max_packets: u64, #[case] expected_sent: u64) {
    let Setup { mut sim, mut generator } = setup();
    generator.install_echo_server(&mut sim, 2, PORT, 1.0, 10.0).unwrap();
    generator.create_flow(&mut sim, flow(max_packets, 0.1, 2.0, 10.0)).unwrap();
    sim.run_until(3.0);

    let stats = &generator.flow_stats()[0];
    assert_eq!(stats.packets_sent, expected_sent);
    assert_eq!(stats.responses_received, expected_sent);
    assert_eq!(stats.state, FlowState::Stopped);
}

#[test]
fn flow_is_idle_before_start() {
    let Setup { mut sim, mut generator } = setup();
    generator.create_flow(&mut sim, flow(10, 0.1, 2.0, 10.0)).unwrap();
    sim.run_until(1.5);
    let stats = &generator.flow_stats()[0];
    assert_eq!(stats.state, FlowState::Idle);
    assert_eq!(stats.packets_sent, 0);
}

#[test]
fn requests_before_server_start_are_dropped() {
    let Setup { mut sim, mut generator } = setup();
    generator.install_echo_server(&mut sim, 2, PORT, 5.0, 10.0).unwrap();
    generator.create_flow(&mut sim, flow(100, 1.0, 2.0, 10.0)).unwrap();
    sim.run_until(10.0);

    let stats = &generator.flow_stats()[0];
    assert_eq!(stats.packets_sent, 8);
    assert_eq!(stats.responses_received, 5);
    assert_eq!(generator.servers()[0].borrow().requests_dropped(), 3);
}

#[test]
fn early_stop_cancels_pending_request() {
    let Setup { mut sim, mut generator } = setup();
    generator.install_echo_server(&mut sim, 2, PORT, 1.0, 10.0).unwrap();
    let flow_id = generator.create_flow(&mut sim, flow(100, 0.1, 2.0, 10.0)).unwrap();
    let operator = sim.create_context("operator");
    operator.emit(StopFlow {}, generator.client_id(flow_id), 2.55);
    sim.run_until(10.0);

    let stats = &generator.flow_stats()[0];
    // requests at 2.0, 2.1, ..., 2.5
    assert_eq!(stats.packets_sent, 6);
    assert_eq!(stats.state, FlowState::Stopped);
    // the response to the request sent at 2.5 arrives at 2.508, before the stop
    assert_eq!(stats.responses_received, 6);
}

#[test]
fn invalid_flows_are_rejected() {
    let Setup { mut sim, mut generator } = setup();
    let mut unknown_destination = flow(10, 0.1, 2.0, 10.0);
    unknown_destination.destination = addr("10.9.0.1");
    assert!(matches!(
        generator.create_flow(&mut sim, unknown_destination),
        Err(TrafficError::Configuration(_))
    ));
    assert!(matches!(
        generator.create_flow(&mut sim, flow(10, 0.0, 2.0, 10.0)),
        Err(TrafficError::Configuration(_))
    ));
    assert!(matches!(
        generator.create_flow(&mut sim, flow(0, 0.1, 2.0, 10.0)),
        Err(TrafficError::Configuration(_))
    ));
    assert!(matches!(
        generator.create_flow(&mut sim, flow(10, 0.1, 5.0, 1.0)),
        Err(TrafficError::Configuration(_))
    ));
    let mut unknown_source = flow(10, 0.1, 2.0, 10.0);
    unknown_source.source = 42;
    assert!(matches!(
        generator.create_flow(&mut sim, unknown_source),
        Err(TrafficError::Network(_))
    ));
    assert!(generator.flow_stats().is_empty());
}

#[test]
fn flow_starting_in_the_past_is_rejected() {
    let Setup { mut sim, mut generator } = setup();
    sim.run_until(3.0);
    assert!(matches!(
        generator.create_flow(&mut sim, flow(10, 0.1, 2.0, 10.0)),
        Err(TrafficError::Scheduling(_))
    ));
    assert!(matches!(
        generator.install_echo_server(&mut sim, 2, PORT, 2.0, 10.0),
        Err(TrafficError::Scheduling(_))
    ));
    // rejected calls leave no client, handler or bound port behind
    assert!(generator.flow_stats().is_empty());
    assert!(generator.servers().is_empty());
    generator.install_echo_server(&mut sim, 2, PORT, 4.0, 10.0).unwrap();
    assert_eq!(generator.create_flow(&mut sim, flow(3, 0.1, 4.0, 10.0)).unwrap(), 0);
    assert_eq!(generator.client_id(0), sim.lookup_id("client-0-device"));
    sim.run_until(10.0);
    let stats = &generator.flow_stats()[0];
    assert_eq!(stats.packets_sent, 3);
    assert_eq!(stats.responses_received, 3);
}

#[test]
fn empty_window_sends_nothing() {
    let Setup { mut sim, mut generator } = setup();
    generator.create_flow(&mut sim, flow(10, 0.1, 4.0, 4.0)).unwrap();
    sim.run_until(10.0);
    let stats = &generator.flow_stats()[0];
    assert_eq!(stats.packets_sent, 0);
    assert_eq!(stats.state, FlowState::Stopped);
}

#[test]
fn server_port_can_be_bound_once() {
    let Setup { mut sim, mut generator } = setup();
    generator.install_echo_server(&mut sim, 2, PORT, 1.0, 10.0).unwrap();
    assert!(matches!(
        generator.install_echo_server(&mut sim, 2, PORT, 1.0, 10.0),
        Err(TrafficError::Network(_))
    ));
}
