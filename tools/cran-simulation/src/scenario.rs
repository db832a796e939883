//! Construction and execution of the tiered scenario.

use std::net::Ipv4Addr;

use sugars::{rc, refcell};

use cransim_core::{log_info, Simulation};
use cransim_network::{resolve, Network, NodeId, NodeRole, Position, Topology};
use cransim_timeline::{Color, Record, Timeline, TraceSummary};
use cransim_traffic::{Flow, FlowStats, TrafficGenerator};

use crate::config::{ScenarioConfig, SegmentConfig};
use crate::error::ScenarioError;

/// Node ids of each tier.
#[derive(Clone, Debug)]
pub struct Tiers {
    pub devices: Vec<NodeId>,
    pub relays: Vec<NodeId>,
    pub aggregators: Vec<NodeId>,
    pub gateway: NodeId,
    pub sink: NodeId,
}

pub struct RunOutcome {
    /// JSON trace.
    pub trace: String,
    pub records: Vec<Record>,
    pub summary: TraceSummary,
    pub flow_stats: Vec<FlowStats>,
}

fn add_tier(
    topology: &mut Topology,
    count: u32,
    name: &str,
    role: NodeRole,
    position: impl Fn(f64) -> Position,
) -> Vec<NodeId> {
    (0..count)
        .map(|i| topology.add_node(&format!("{}-{}", name, i), role, position(i as f64)))
        .collect()
}

fn allocate(topology: &mut Topology, segment: SegmentConfig) -> Result<usize, ScenarioError> {
    Ok(topology.allocate_segment(segment.base, segment.mask)?)
}

/// Validates the config, then builds and numbers the tiered topology.
///
/// Node `i` of a tier is attached to node `i mod n` of the next tier, where `n` is that tier's size.
/// Links are created and numbered tier by tier from the gateway side:
/// aggregators to gateway, relays to aggregators, devices to relays, gateway to sink.
pub fn build_topology(config: &ScenarioConfig) -> Result<(Topology, Tiers), ScenarioError> {
    config.validate()?;
    let mut topology = Topology::new();
    let devices = add_tier(&mut topology, config.end_devices, "device", NodeRole::EndDevice, |i| {
        Position::new(10. * i, 0., 0.)
    });
    let relays = add_tier(&mut topology, config.relays, "relay", NodeRole::Relay, |i| {
        Position::new(50., 10. * i, 0.)
    });
    let aggregators = add_tier(&mut topology, config.aggregators, "aggregator", NodeRole::Aggregator, |i| {
        Position::new(100., 20. * i, 0.)
    });
    let gateway = topology.add_node("gateway", NodeRole::Gateway, Position::new(150., 50., 0.));
    let sink = topology.add_node("sink", NodeRole::Sink, Position::new(200., 50., 0.));

    let aggregator_gateway = allocate(&mut topology, config.aggregator_gateway_segment)?;
    let relay_aggregator = allocate(&mut topology, config.relay_aggregator_segment)?;
    let device_relay = allocate(&mut topology, config.device_relay_segment)?;
    let gateway_sink = allocate(&mut topology, config.gateway_sink_segment)?;

    for &aggregator in &aggregators {
        let link = topology.connect(aggregator, gateway, config.data_rate, config.delay)?;
        topology.assign_link(aggregator_gateway, link)?;
    }
    for (i, &relay) in relays.iter().enumerate() {
        let link = topology.connect(relay, aggregators[i % aggregators.len()], config.data_rate, config.delay)?;
        topology.assign_link(relay_aggregator, link)?;
    }
    for (i, &device) in devices.iter().enumerate() {
        let link = topology.connect(device, relays[i % relays.len()], config.data_rate, config.delay)?;
        topology.assign_link(device_relay, link)?;
    }
    let link = topology.connect(gateway, sink, config.data_rate, config.delay)?;
    topology.assign_link(gateway_sink, link)?;

    let tiers = Tiers {
        devices,
        relays,
        aggregators,
        gateway,
        sink,
    };
    Ok((topology, tiers))
}

fn decorate(timeline: &mut Timeline, tiers: &Tiers) -> Result<(), ScenarioError> {
    for (i, &node) in tiers.devices.iter().enumerate() {
        timeline.set_label(node, &format!("UE-{}", i))?;
        timeline.set_color(node, Color::new(0, 255, 0))?;
    }
    for (i, &node) in tiers.relays.iter().enumerate() {
        timeline.set_label(node, &format!("RRH-{}", i))?;
        timeline.set_color(node, Color::new(255, 0, 0))?;
    }
    for (i, &node) in tiers.aggregators.iter().enumerate() {
        timeline.set_label(node, &format!("ONU-{}", i))?;
    }
    timeline.set_label(tiers.gateway, "BaseStation")?;
    timeline.set_color(tiers.gateway, Color::new(0, 0, 255))?;
    timeline.set_label(tiers.sink, "Cloud")?;
    timeline.set_color(tiers.sink, Color::new(255, 255, 0))?;
    Ok(())
}

fn sink_address(topology: &Topology, tiers: &Tiers) -> Result<Ipv4Addr, ScenarioError> {
    topology
        .link_between(tiers.gateway, tiers.sink)
        .and_then(|link| topology.node(tiers.sink).address_on_link(link))
        .ok_or_else(|| ScenarioError::Configuration("sink has no address".to_string()))
}

/// Builds the scenario, runs it for the configured duration and exports its trace.
///
/// Nothing is simulated if the setup fails.
pub fn run(config: &ScenarioConfig) -> Result<RunOutcome, ScenarioError> {
    let (topology, tiers) = build_topology(config)?;
    let routes = resolve(&topology)?;
    let destination = match config.destination {
        Some(address) => address,
        None => sink_address(&topology, &tiers)?,
    };

    let mut timeline = Timeline::new(config.duration);
    timeline.record_topology(&topology);
    decorate(&mut timeline, &tiers)?;
    let timeline = rc!(refcell!(timeline));

    let mut sim = Simulation::new();
    let ctx = sim.create_context("scenario");
    log_info!(
        ctx,
        "topology built: {} nodes, {} links",
        topology.node_count(),
        topology.link_count()
    );
    let net = rc!(refcell!(Network::new(topology, routes, sim.create_context("net"))));
    sim.add_handler("net", net.clone());
    net.borrow_mut().add_observer(timeline.clone());

    let mut generator = TrafficGenerator::new(net.clone(), sim.create_context("traffic"));
    generator.install_echo_server(
        &mut sim,
        tiers.sink,
        config.echo_port,
        config.server_start,
        config.server_stop_time(),
    )?;
    for &device in &tiers.devices {
        generator.create_flow(
            &mut sim,
            Flow {
                source: device,
                destination,
                port: config.echo_port,
                max_packets: config.max_packets,
                interval: config.interval,
                payload_size: config.payload_size,
                start_time: config.client_start,
                stop_time: config.client_stop_time(),
            },
        )?;
    }

    sim.run_until(config.duration);
    log_info!(ctx, "simulation finished, {} events processed", sim.event_count());

    let mut timeline = timeline.borrow_mut();
    let trace = timeline.finalize()?;
    let records = timeline.records().to_vec();
    let summary = TraceSummary::from_records(&records);
    Ok(RunOutcome {
        trace,
        records,
        summary,
        flow_stats: generator.flow_stats(),
    })
}
