//! Decoder and state tracker for an RF home-automation protocol.
//!
//! The crate turns raw frame traffic, replayed from packet logs or read
//! live from a serial port, into typed messages and a per-device state
//! model, and can render the result as a JSON report:
//!
//! - [`protocol`] holds the wire grammar: addresses, verbs, frame
//!   parsing and the payload codec table.
//! - [`source`] lifts log files and byte-stream ports into a common
//!   stream of frame candidates.
//! - [`Pipeline`] wires parsing, tracking and subscriber dispatch
//!   together; [`analyze_log_file`] is the one-call entry point.
//! - [`CommandEncoder`] builds outbound frames from structured values.
//!
//! ```
//! use ramsgate_core::protocol::frame::parse_frame;
//!
//! let frame = parse_frame("--- I 01:123456 04:654321 1F09 003 0004B1 02").unwrap();
//! assert_eq!(frame.code.to_string(), "1F09");
//! assert_eq!(frame.payload, vec![0x00, 0x04, 0xB1]);
//! ```

pub mod protocol;
pub mod source;

mod command;
mod dispatch;
mod message;
mod pipeline;
mod tracker;

use serde::{Deserialize, Serialize};

pub use command::{CommandEncoder, EncodeError};
pub use dispatch::{Dispatcher, Event, SubscriberError, SubscriberId};
pub use message::{Message, Payload};
pub use pipeline::{Pipeline, PipelineError, TrafficStats, analyze_log_file};
pub use tracker::{
    Applied, Device, DeviceRegistry, HistoryRecord, KnownValue, StateChange, StateTracker,
};

/// Bumped whenever the report schema changes shape.
pub const REPORT_VERSION: u32 = 1;

/// Placeholder timestamp for reports built without a clock.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Top-level JSON report for one analyzed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_version: u32,
    pub tool: ToolInfo,
    pub generated_at: String,
    pub input: InputInfo,
    pub traffic: TrafficSummary,
    pub devices: Vec<DeviceSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputInfo {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSummary {
    pub frames_total: u64,
    pub malformed_frames: u64,
    pub checksum_failures: u64,
    pub length_mismatches: u64,
    pub unknown_verbs: u64,
    pub undecoded_payloads: u64,
    pub stale_writes: u64,
    pub state_changes: u64,
    pub idle_timeouts: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// One tracked device and its last known value per code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub address: String,
    pub class: String,
    pub codes: Vec<CodeState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeState {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    pub last_seen: String,
}

/// Minimal well-formed report, handy for tests and schema examples.
pub fn make_stub_report() -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "ramsgate".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: String::new(),
        },
        traffic: TrafficSummary {
            frames_total: 0,
            malformed_frames: 0,
            checksum_failures: 0,
            length_mismatches: 0,
            unknown_verbs: 0,
            undecoded_payloads: 0,
            stale_writes: 0,
            state_changes: 0,
            idle_timeouts: 0,
            first_seen: None,
            last_seen: None,
        },
        devices: Vec::new(),
    }
}
