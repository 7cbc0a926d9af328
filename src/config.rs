use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

/// Configuration store backend selection
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-memory store (empty fleet unless seeded; dry runs only)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./fleet.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Configuration store (optional - defaults to SQLite at ./fleet.db)
    pub store: Option<StoreConfig>,

    /// Polling engine tunables (all optional, sensible defaults)
    #[serde(default)]
    pub poll: PollConfig,
}

/// Raw polling tunables as read from the config file. Every field has a
/// default; see [`PollTunables`] for the resolved form the actors use.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PollConfig {
    /// Pause between poll cycles on one device
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Deadline for establishing the data connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Deadline for one command/response exchange
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,

    /// Recovery pause after each exchange, for gateways that cannot take
    /// back-to-back commands
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Pause before retrying a failed connect
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,

    /// Reachability probe period while a device is reachable
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Reachability probe period while a device is unreachable
    #[serde(default = "default_probe_retry_delay")]
    pub probe_retry_delay_secs: u64,

    /// Deadline for one reachability probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Consecutive failed probes before the device's poller is stopped
    #[serde(default = "default_max_probe_failures")]
    pub max_probe_failures: u32,

    /// Period for re-fetching the enabled-device list
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            connect_timeout_secs: default_connect_timeout(),
            response_timeout_secs: default_response_timeout(),
            settle_delay_ms: default_settle_delay(),
            retry_backoff_secs: default_retry_backoff(),
            probe_interval_secs: default_probe_interval(),
            probe_retry_delay_secs: default_probe_retry_delay(),
            probe_timeout_secs: default_probe_timeout(),
            max_probe_failures: default_max_probe_failures(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl PollConfig {
    /// Resolve to the `Duration`-typed form the actors consume.
    pub fn tunables(&self) -> PollTunables {
        PollTunables {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            response_timeout: Duration::from_secs(self.response_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
            probe_interval: Duration::from_secs(self.probe_interval_secs),
            probe_retry_delay: Duration::from_secs(self.probe_retry_delay_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            max_probe_failures: self.max_probe_failures,
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
        }
    }
}

/// Resolved polling tunables shared by the orchestrator, supervisors and
/// pollers.
#[derive(Debug, Clone)]
pub struct PollTunables {
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub settle_delay: Duration,
    pub retry_backoff: Duration,
    pub probe_interval: Duration,
    pub probe_retry_delay: Duration,
    pub probe_timeout: Duration,
    pub max_probe_failures: u32,
    pub refresh_interval: Duration,
}

impl Default for PollTunables {
    fn default() -> Self {
        PollConfig::default().tunables()
    }
}

fn default_poll_interval() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_response_timeout() -> u64 {
    5
}

fn default_settle_delay() -> u64 {
    50
}

fn default_retry_backoff() -> u64 {
    5
}

fn default_probe_interval() -> u64 {
    30
}

fn default_probe_retry_delay() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_max_probe_failures() -> u32 {
    3
}

fn default_refresh_interval() -> u64 {
    60
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
