//! Scenario configuration.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;

/// Address block of one tier.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub base: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl SegmentConfig {
    fn new(base: [u8; 4], mask: [u8; 4]) -> Self {
        Self {
            base: Ipv4Addr::from(base),
            mask: Ipv4Addr::from(mask),
        }
    }
}

/// YAML-serializable config, absent fields take default values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawScenarioConfig {
    pub end_devices: Option<u32>,
    pub relays: Option<u32>,
    pub aggregators: Option<u32>,
    pub gateways: Option<u32>,
    pub sinks: Option<u32>,
    /// link data rate in bits per second
    pub data_rate: Option<f64>,
    /// link propagation delay in seconds
    pub delay: Option<f64>,
    pub duration: Option<f64>,
    pub echo_port: Option<u16>,
    pub server_start: Option<f64>,
    pub server_stop: Option<f64>,
    pub client_start: Option<f64>,
    pub client_stop: Option<f64>,
    pub max_packets: Option<u64>,
    pub interval: Option<f64>,
    pub payload_size: Option<u32>,
    /// echo destination, the sink address on the gateway link by default
    pub destination: Option<Ipv4Addr>,
    pub aggregator_gateway_segment: Option<SegmentConfig>,
    pub relay_aggregator_segment: Option<SegmentConfig>,
    pub device_relay_segment: Option<SegmentConfig>,
    pub gateway_sink_segment: Option<SegmentConfig>,
}

/// Scenario configuration.
///
/// Server and client stop times follow the simulation duration unless set explicitly.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioConfig {
    pub end_devices: u32,
    pub relays: u32,
    pub aggregators: u32,
    pub gateways: u32,
    pub sinks: u32,
    pub data_rate: f64,
    pub delay: f64,
    pub duration: f64,
    pub echo_port: u16,
    pub server_start: f64,
    pub server_stop: Option<f64>,
    pub client_start: f64,
    pub client_stop: Option<f64>,
    pub max_packets: u64,
    pub interval: f64,
    pub payload_size: u32,
    pub destination: Option<Ipv4Addr>,
    pub aggregator_gateway_segment: SegmentConfig,
    pub relay_aggregator_segment: SegmentConfig,
    pub device_relay_segment: SegmentConfig,
    pub gateway_sink_segment: SegmentConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let mask = [255, 255, 255, 0];
        Self {
            end_devices: 20,
            relays: 5,
            aggregators: 5,
            gateways: 1,
            sinks: 1,
            data_rate: 10e9,
            delay: 0.002,
            duration: 10.,
            echo_port: 9,
            server_start: 1.,
            server_stop: None,
            client_start: 2.,
            client_stop: None,
            max_packets: 100,
            interval: 0.1,
            payload_size: 1024,
            destination: None,
            aggregator_gateway_segment: SegmentConfig::new([10, 0, 0, 0], mask),
            relay_aggregator_segment: SegmentConfig::new([10, 1, 0, 0], mask),
            device_relay_segment: SegmentConfig::new([10, 2, 0, 0], mask),
            gateway_sink_segment: SegmentConfig::new([10, 3, 0, 0], mask),
        }
    }
}

impl ScenarioConfig {
    pub fn from_raw(raw: RawScenarioConfig) -> Self {
        let default = Self::default();
        Self {
            end_devices: raw.end_devices.unwrap_or(default.end_devices),
            relays: raw.relays.unwrap_or(default.relays),
            aggregators: raw.aggregators.unwrap_or(default.aggregators),
            gateways: raw.gateways.unwrap_or(default.gateways),
            sinks: raw.sinks.unwrap_or(default.sinks),
            data_rate: raw.data_rate.unwrap_or(default.data_rate),
            delay: raw.delay.unwrap_or(default.delay),
            duration: raw.duration.unwrap_or(default.duration),
            echo_port: raw.echo_port.unwrap_or(default.echo_port),
            server_start: raw.server_start.unwrap_or(default.server_start),
            server_stop: raw.server_stop,
            client_start: raw.client_start.unwrap_or(default.client_start),
            client_stop: raw.client_stop,
            max_packets: raw.max_packets.unwrap_or(default.max_packets),
            interval: raw.interval.unwrap_or(default.interval),
            payload_size: raw.payload_size.unwrap_or(default.payload_size),
            destination: raw.destination,
            aggregator_gateway_segment: raw
                .aggregator_gateway_segment
                .unwrap_or(default.aggregator_gateway_segment),
            relay_aggregator_segment: raw.relay_aggregator_segment.unwrap_or(default.relay_aggregator_segment),
            device_relay_segment: raw.device_relay_segment.unwrap_or(default.device_relay_segment),
            gateway_sink_segment: raw.gateway_sink_segment.unwrap_or(default.gateway_sink_segment),
        }
    }

    /// Parses a YAML document, using default values for absent parameters.
    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        let raw: RawScenarioConfig = serde_yaml::from_str(yaml)?;
        Ok(Self::from_raw(raw))
    }

    /// Reads the config from a YAML file, using default values for absent parameters.
    pub fn from_file(path: &str) -> Result<Self, ScenarioError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ScenarioError::ConfigRead {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn server_stop_time(&self) -> f64 {
        self.server_stop.unwrap_or(self.duration)
    }

    pub fn client_stop_time(&self) -> f64 {
        self.client_stop.unwrap_or(self.duration)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        for (tier, count) in [
            ("end devices", self.end_devices),
            ("relays", self.relays),
            ("aggregators", self.aggregators),
            ("gateways", self.gateways),
            ("sinks", self.sinks),
        ] {
            if count == 0 {
                return Err(invalid(format!("number of {} must be > 0", tier)));
            }
        }
        if self.gateways > 1 || self.sinks > 1 {
            return Err(invalid("exactly one gateway and one sink are supported".to_string()));
        }
        for (name, value) in [
            ("data rate", self.data_rate),
            ("delay", self.delay),
            ("duration", self.duration),
            ("interval", self.interval),
        ] {
            if !value.is_finite() || value <= 0. {
                return Err(invalid(format!("{} must be > 0, got {}", name, value)));
            }
        }
        if self.max_packets == 0 {
            return Err(invalid("max packets must be > 0".to_string()));
        }
        for (app, start, stop) in [
            ("server", self.server_start, self.server_stop_time()),
            ("client", self.client_start, self.client_stop_time()),
        ] {
            if start.is_nan() || start < 0. || start >= self.duration {
                return Err(invalid(format!(
                    "{} start {} is outside of [0, {})",
                    app, start, self.duration
                )));
            }
            if stop.is_nan() || stop < start || stop > self.duration {
                return Err(invalid(format!(
                    "{} stop {} is outside of [{}, {}]",
                    app, stop, start, self.duration
                )));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> ScenarioError {
    ScenarioError::Configuration(message)
}
