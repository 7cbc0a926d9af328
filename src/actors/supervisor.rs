//! ConnectivitySupervisorActor - Reachability probing for one device
//!
//! "Is this device reachable" is decoupled from "is this device being
//! actively polled for data": the data session may legitimately cycle
//! between Connecting and Polling without the device being down, so a
//! separate lightweight TCP probe decides when the heavier poller
//! lifecycle starts and stops. This avoids flapping the poller on
//! transient data-read hiccups.
//!
//! ## Lifecycle Rules
//!
//! - probe succeeds: failure counter resets; a poller is started if none
//!   is running
//! - probe fails `max_probe_failures` times in a row: the poller is
//!   stopped and discarded until the device comes back
//!
//! The supervisor owns the device's only [`PollerHandle`], which is what
//! makes a second concurrent poller for the same device impossible.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::PollTunables;
use crate::link;
use crate::store::{ConfigStore, Device};
use crate::Reading;

use super::messages::{SupervisorCommand, SupervisorStatus};
use super::poller::{PollerHandle, STOP_GRACE};

/// Actor that supervises connectivity for a single device.
pub struct ConnectivitySupervisorActor {
    /// Device under supervision
    device: Device,

    /// Configuration store, passed through to spawned pollers
    store: Arc<dyn ConfigStore>,

    /// Resolved tunables
    tunables: PollTunables,

    /// Broadcast sender, passed through to spawned pollers
    reading_tx: broadcast::Sender<Reading>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<SupervisorCommand>,

    /// The device's poller, when one is running
    poller: Option<PollerHandle>,

    /// Last probe outcome; `None` before the first probe
    reachable: Option<bool>,

    /// Consecutive failed probes
    consecutive_failures: u32,

    /// Display name for logging
    display_name: String,
}

impl ConnectivitySupervisorActor {
    fn new(
        device: Device,
        store: Arc<dyn ConfigStore>,
        tunables: PollTunables,
        reading_tx: broadcast::Sender<Reading>,
        command_rx: mpsc::Receiver<SupervisorCommand>,
    ) -> Self {
        let display_name = format!("{} ({})", device.name, device.address());

        Self {
            device,
            store,
            tunables,
            reading_tx,
            command_rx,
            poller: None,
            reachable: None,
            consecutive_failures: 0,
            display_name,
        }
    }

    /// Run the actor's main loop.
    ///
    /// Probes fire immediately on startup, then every probe interval
    /// while the device is reachable and every (shorter) retry delay
    /// while it is not. Runs until a Shutdown command arrives or the
    /// command channel closes; teardown stops the owned poller before
    /// the task exits.
    #[instrument(skip(self), fields(device = %self.display_name))]
    pub async fn run(mut self) {
        debug!("starting connectivity supervisor");

        loop {
            let delay = match self.reachable {
                None => Duration::ZERO,
                Some(true) => self.tunables.probe_interval,
                Some(false) => self.tunables.probe_retry_delay,
            };

            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SupervisorCommand::ProbeNow { respond_to } => {
                            debug!("received ProbeNow command");
                            let up = self.probe_and_transition().await;
                            let _ = respond_to.send(up);
                        }

                        SupervisorCommand::Status { respond_to } => {
                            let _ = respond_to.send(self.status());
                        }

                        SupervisorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                _ = sleep(delay) => {
                    self.probe_and_transition().await;
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }

        debug!("connectivity supervisor stopped");
    }

    /// Probe reachability and apply the resulting poller transition.
    async fn probe_and_transition(&mut self) -> bool {
        let up = link::probe(&self.device.host, self.device.port, self.tunables.probe_timeout).await;

        if up {
            if self.reachable != Some(true) {
                info!("device reachable");
            }
            self.reachable = Some(true);
            self.consecutive_failures = 0;
            self.ensure_poller();
        } else {
            if self.reachable != Some(false) {
                info!("device unreachable");
            }
            self.reachable = Some(false);
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);

            if self.consecutive_failures == self.tunables.max_probe_failures {
                warn!(
                    "device unreachable after {} consecutive probes",
                    self.consecutive_failures
                );
            }

            if self.consecutive_failures >= self.tunables.max_probe_failures {
                if let Some(poller) = self.poller.take() {
                    poller.stop().await;
                    debug!("poller stopped and discarded");
                }
            }
        }

        up
    }

    /// Start a poller if none is running. A finished handle is stale
    /// (its task already exited) and gets replaced.
    fn ensure_poller(&mut self) {
        if self.poller.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }

        self.poller = Some(PollerHandle::spawn(
            self.device.clone(),
            self.store.clone(),
            self.tunables.clone(),
            self.reading_tx.clone(),
        ));
        debug!("device poller started");
    }

    fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            reachable: self.reachable,
            poller_running: self.poller.as_ref().is_some_and(|p| !p.is_finished()),
            consecutive_failures: self.consecutive_failures,
        }
    }
}

/// Handle for controlling a ConnectivitySupervisorActor.
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorCommand>,
    join: JoinHandle<()>,
    pub device_id: i64,
    pub display_name: String,
}

impl SupervisorHandle {
    /// Spawn a supervisor for `device` as a tokio task and return its
    /// handle.
    pub fn spawn(
        device: Device,
        store: Arc<dyn ConfigStore>,
        tunables: PollTunables,
        reading_tx: broadcast::Sender<Reading>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let device_id = device.id;

        let actor = ConnectivitySupervisorActor::new(device, store, tunables, reading_tx, cmd_rx);
        let display_name = actor.display_name.clone();

        let join = tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            join,
            device_id,
            display_name,
        }
    }

    /// Probe immediately, bypassing the probe timer. Returns whether the
    /// device answered.
    pub async fn probe_now(&self) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SupervisorCommand::ProbeNow { respond_to: tx })
            .await
            .context("failed to send ProbeNow command")?;

        rx.await.context("failed to receive response")
    }

    /// Snapshot of the supervisor's state.
    pub async fn status(&self) -> Result<SupervisorStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SupervisorCommand::Status { respond_to: tx })
            .await
            .context("failed to send Status command")?;

        rx.await.context("failed to receive response")
    }

    /// Shut the supervisor down and wait for it, bounded by a grace
    /// period. Cascades to the owned poller. Safe when the actor has
    /// already exited.
    pub async fn shutdown(self) {
        let _ = self.sender.send(SupervisorCommand::Shutdown).await;
        if tokio::time::timeout(STOP_GRACE, self.join).await.is_err() {
            warn!(
                "supervisor for device {} did not stop within grace period",
                self.device_id
            );
        }
    }
}
