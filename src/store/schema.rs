//! Entity structs read from the configuration store.
//!
//! These mirror the relational schema in `migrations/`: a `DeviceType`
//! owns the set of `Parameter` definitions that apply to every `Device`
//! of that type, and a `Threshold` is scoped to one specific
//! (device, parameter) pair. All of it is immutable from the polling
//! core's perspective.

use serde::{Deserialize, Serialize};

/// A class of devices sharing the same set of supported parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A physical sensor endpoint reachable via a TCP-to-serial gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    /// Gateway address: IP or resolvable host name.
    pub host: String,
    /// Gateway data port.
    pub port: u16,
    pub description: Option<String>,
    /// Toggling this flag is the sole device-lifecycle signal the
    /// polling core reacts to.
    pub enabled: bool,
    pub device_type_id: i64,
}

impl Device {
    /// `host:port`, for logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A named, commandable measurable quantity on a device type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub id: i64,
    pub name: String,
    /// Protocol command issued to read this parameter, e.g. `"TE"`.
    pub command: String,
    /// Unit-of-measure label, e.g. `"C"`.
    pub unit: Option<String>,
    pub description: Option<String>,
    pub device_type_id: i64,
}

/// Low/high alarm bounds for a specific (device, parameter) pair.
///
/// Either bound may be absent, which leaves that side unbounded. A pair
/// may have zero, one or several thresholds; only enabled ones are
/// evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    pub id: i64,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub enabled: bool,
    pub parameter_id: i64,
    pub device_id: i64,
}
