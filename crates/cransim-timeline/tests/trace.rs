use std::net::Ipv4Addr;
use std::rc::Rc;

use sugars::{rc, refcell};

use cransim_core::Simulation;
use cransim_network::{resolve, Network, NodeRole, Position, Topology};
use cransim_timeline::{write_latencies, EventKind, Payload, Subject, Timeline, TraceSummary};

fn addr(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

// a - b - c chain, delays 1ms and 3ms
fn chain() -> Topology {
    let mut topology = Topology::new();
    let a = topology.add_node("a", NodeRole::EndDevice, Position::new(0., 0., 0.));
    let b = topology.add_node("b", NodeRole::Relay, Position::new(50., 0., 0.));
    let c = topology.add_node("c", NodeRole::Sink, Position::new(100., 0., 0.));
    let ab = topology.connect(a, b, 1e9, 0.001).unwrap();
    let bc = topology.connect(b, c, 1e9, 0.003).unwrap();
    let s1 = topology.allocate_segment(addr("10.0.0.0"), addr("255.255.255.0")).unwrap();
    let s2 = topology.allocate_segment(addr("10.1.0.0"), addr("255.255.255.0")).unwrap();
    topology.assign_link(s1, ab).unwrap();
    topology.assign_link(s2, bc).unwrap();
    topology
}

fn run() -> Timeline {
    let mut sim = Simulation::new();
    let topology = chain();
    let routes = resolve(&topology).unwrap();
    let mut timeline = Timeline::new(0.006);
    timeline.record_topology(&topology);
    let timeline = rc!(refcell!(timeline));
    let net = rc!(refcell!(Network::new(topology, routes, sim.create_context("net"))));
    sim.add_handler("net", net.clone());
    net.borrow_mut().add_observer(timeline.clone());

    net.borrow_mut().send_packet(0, 49153, addr("10.1.0.2"), 9, 1024, 0).unwrap();
    sim.step_until_no_events();
    // the second packet is still in flight when the run stops
    net.borrow_mut().send_packet(0, 49153, addr("10.1.0.2"), 9, 1024, 1).unwrap();
    sim.run_until(0.006);

    drop(sim);
    drop(net);
    match Rc::try_unwrap(timeline) {
        Ok(timeline) => timeline.into_inner(),
        Err(_) => panic!("timeline is still shared"),
    }
}

#[test]
fn packet_records_cover_nodes_and_hops() {
    let timeline = run();
    let records = timeline.records();
    assert_eq!(records.iter().filter(|r| r.kind == EventKind::PositionSet).count(), 3);

    let node_received: Vec<_> = records
        .iter()
        .filter(|r| r.kind == EventKind::PacketReceived && matches!(r.subject, Subject::Node(_)))
        .collect();
    assert_eq!(node_received.len(), 1);
    assert_eq!(node_received[0].subject, Subject::Node(2));
    assert!((node_received[0].timestamp - 0.004).abs() < 1e-12);

    let hops: Vec<_> = records
        .iter()
        .filter(|r| matches!(r.subject, Subject::Link(_)))
        .collect();
    assert_eq!(hops.len(), 7);
    match &hops[0].payload {
        Payload::Packet(packet) => {
            assert_eq!(packet.from, Some(0));
            assert_eq!(packet.to, Some(1));
            assert_eq!(packet.seq, 0);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn summary_counts_in_flight_packets_as_lost() {
    let timeline = run();
    let summary = TraceSummary::from_records(timeline.records());
    assert_eq!(summary.packets_sent, 2);
    assert_eq!(summary.packets_received, 1);
    assert_eq!(summary.packets_lost, 1);
    assert!((summary.average_latency - 0.004).abs() < 1e-12);
    assert!((summary.delivery_rate - 50.).abs() < 1e-12);
}

#[test]
fn empty_trace_summary() {
    let summary = TraceSummary::from_records(&[]);
    assert_eq!(summary.packets_sent, 0);
    assert_eq!(summary.average_latency, 0.);
    assert_eq!(summary.delivery_rate, 0.);
}

#[test]
fn latencies_csv() {
    let timeline = run();
    let mut out = Vec::new();
    write_latencies(timeline.records(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "uid,seq,src,dst,sent_at,received_at,latency");
    assert!(lines[1].starts_with("1,0,10.0.0.1,10.1.0.2,0.0,"));
}

#[test]
fn repeated_runs_produce_identical_traces() {
    let first = run().finalize().unwrap();
    let second = run().finalize().unwrap();
    assert_eq!(first, second);
}
