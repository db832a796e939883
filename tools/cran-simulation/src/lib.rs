//! Tiered C-RAN scenario: end devices, radio heads, optical units, a base station and a cloud sink
//! exchanging echo traffic.

pub mod config;
pub mod error;
pub mod scenario;

pub use config::{RawScenarioConfig, ScenarioConfig, SegmentConfig};
pub use error::ScenarioError;
pub use scenario::{build_topology, run, RunOutcome, Tiers};
