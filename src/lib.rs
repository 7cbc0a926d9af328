pub mod actors;
pub mod config;
pub mod evaluate;
pub mod link;
pub mod protocol;
pub mod store;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of evaluating one polled value against the thresholds
/// configured for its (device, parameter) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReadingStatus {
    /// Value is within every enabled threshold.
    Ok,
    /// Value violates at least one enabled threshold.
    Alarm,
    /// No enabled threshold is configured for the pair.
    Unknown,
}

/// One evaluated parameter sample, produced once per parameter per poll
/// cycle and handed to the result sink. The core keeps no history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: i64,
    pub device_name: String,
    pub parameter_id: i64,
    pub parameter_name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub status: ReadingStatus,
    pub timestamp: DateTime<Utc>,
}
