#![warn(missing_docs)]
//! Request/response traffic: echo clients driven by flows and echo servers answering them.

pub mod client;
pub mod error;
pub mod flow;
pub mod generator;
pub mod server;

pub use client::EchoClient;
pub use error::TrafficError;
pub use flow::{Flow, FlowId, FlowState, FlowStats};
pub use generator::TrafficGenerator;
pub use server::EchoServer;
