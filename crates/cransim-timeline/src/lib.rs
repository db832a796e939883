#![doc = include_str!("../readme.md")]

pub mod error;
pub mod record;
pub mod summary;
pub mod timeline;

pub use error::TimelineError;
pub use record::{Color, EventKind, PacketPayload, Payload, Record, Subject};
pub use summary::{packet_latencies, save_latencies, write_latencies, PacketLatency, TraceSummary};
pub use timeline::{LinkInfo, NodeInfo, Timeline};
