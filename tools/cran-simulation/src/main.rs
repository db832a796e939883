use std::fs::File;
use std::io::Write;
use std::process::exit;

use clap::Parser;
use env_logger::Builder;
use log::error;

use cran_simulation::{run, ScenarioConfig, ScenarioError};
use cransim_timeline::save_latencies;

/// Tiered C-RAN network simulation with echo traffic
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to YAML file with scenario configuration (defaults are used if absent)
    #[clap(short, long)]
    config: Option<String>,

    /// Path to produced JSON trace
    #[clap(short, long, default_value = "c-ran-simulation.json")]
    output: String,

    /// Path to CSV file with per-packet latencies
    #[clap(long)]
    latency_csv: Option<String>,

    /// Number of end devices
    #[clap(long)]
    end_devices: Option<u32>,

    /// Number of relays (radio heads)
    #[clap(long)]
    relays: Option<u32>,

    /// Number of aggregators (optical units)
    #[clap(long)]
    aggregators: Option<u32>,

    /// Simulation duration in seconds
    #[clap(long)]
    duration: Option<f64>,
}

fn load_config(args: &Args) -> Result<ScenarioConfig, ScenarioError> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(end_devices) = args.end_devices {
        config.end_devices = end_devices;
    }
    if let Some(relays) = args.relays {
        config.relays = relays;
    }
    if let Some(aggregators) = args.aggregators {
        config.aggregators = aggregators;
    }
    if let Some(duration) = args.duration {
        config.duration = duration;
    }
    Ok(config)
}

fn simulate(args: &Args) -> Result<(), ScenarioError> {
    let config = load_config(args)?;
    let outcome = run(&config)?;

    File::create(&args.output)?.write_all(outcome.trace.as_bytes())?;
    if let Some(path) = &args.latency_csv {
        save_latencies(&outcome.records, path)?;
    }

    let summary = &outcome.summary;
    println!("Packets sent: {}", summary.packets_sent);
    println!("Packets received: {}", summary.packets_received);
    println!("Packets lost: {}", summary.packets_lost);
    println!("Average latency: {:.4} s", summary.average_latency);
    println!("Delivery rate: {:.2}%", summary.delivery_rate);
    Ok(())
}

fn main() {
    Builder::from_default_env().init();
    let args = Args::parse();
    if let Err(e) = simulate(&args) {
        error!("{}", e);
        exit(e.exit_code());
    }
}
