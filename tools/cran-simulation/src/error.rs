//! Scenario errors and process exit codes.

use thiserror::Error;

use cransim_network::NetworkError;
use cransim_timeline::TimelineError;
use cransim_traffic::TrafficError;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to read config {path}: {source}")]
    ConfigRead { path: String, source: std::io::Error },
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Traffic(#[from] TrafficError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn network_exit_code(err: &NetworkError) -> i32 {
    match err {
        NetworkError::SegmentExhausted { .. } => 3,
        NetworkError::UnreachableNetwork { .. } => 4,
        _ => 2,
    }
}

impl ScenarioError {
    /// Process exit status: 2 for configuration errors, 3 for an exhausted address segment,
    /// 4 for an unreachable network and 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScenarioError::Configuration(_) | ScenarioError::ConfigRead { .. } | ScenarioError::ConfigParse(_) => 2,
            ScenarioError::Network(e) => network_exit_code(e),
            ScenarioError::Traffic(TrafficError::Network(e)) => network_exit_code(e),
            ScenarioError::Traffic(TrafficError::Configuration(_)) => 2,
            ScenarioError::Traffic(TrafficError::Scheduling(_)) => 1,
            ScenarioError::Timeline(_) | ScenarioError::Io(_) => 1,
        }
    }
}
