//! Message types for actor communication

use tokio::sync::oneshot;

use crate::store::StoreError;

/// Commands that can be sent to a ConnectivitySupervisorActor
#[derive(Debug)]
pub enum SupervisorCommand {
    /// Run a reachability probe immediately (bypassing the probe timer)
    /// and apply any resulting poller transition.
    ///
    /// Used for testing and manual refresh operations.
    ProbeNow {
        /// Channel to send the probe result (reachable?) back
        respond_to: oneshot::Sender<bool>,
    },

    /// Get a snapshot of the supervisor's state
    Status {
        respond_to: oneshot::Sender<SupervisorStatus>,
    },

    /// Gracefully shut down the supervisor and its poller
    Shutdown,
}

/// Snapshot of a supervisor's view of its device
#[derive(Debug, Clone)]
pub struct SupervisorStatus {
    /// Last probe outcome; `None` before the first probe completes
    pub reachable: Option<bool>,

    /// Whether a poller task currently exists for the device
    pub poller_running: bool,

    /// Consecutive failed probes so far
    pub consecutive_failures: u32,
}

/// Commands that can be sent to the FleetOrchestratorActor
#[derive(Debug)]
pub enum OrchestratorCommand {
    /// Re-fetch the enabled-device list immediately (bypassing the
    /// refresh timer).
    RefreshNow {
        respond_to: oneshot::Sender<Result<(), StoreError>>,
    },

    /// Get the ids of currently supervised devices
    GetFleet {
        respond_to: oneshot::Sender<Vec<i64>>,
    },

    /// Gracefully shut down the orchestrator, cascading to every
    /// supervisor and poller
    Shutdown,
}
