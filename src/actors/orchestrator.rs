//! FleetOrchestratorActor - Top-level device-set management
//!
//! The orchestrator owns one [`SupervisorHandle`] per enabled device,
//! keyed by device id. On every refresh interval it re-fetches the
//! enabled-device list from the configuration store and reconciles:
//! newly enabled devices get a supervisor, disabled or deleted devices
//! get theirs shut down. The ownership map is mutated only by the
//! orchestrator's own task.
//!
//! Store failures keep the previous device set and are retried on the
//! next refresh; the orchestrator never crashes over configuration
//! hiccups.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use crate::config::PollTunables;
use crate::store::{ConfigStore, StoreError};
use crate::Reading;

use super::messages::OrchestratorCommand;
use super::poller::STOP_GRACE;
use super::supervisor::SupervisorHandle;

/// Actor that keeps the supervisor set in sync with configuration.
pub struct FleetOrchestratorActor {
    /// Configuration store
    store: Arc<dyn ConfigStore>,

    /// Resolved tunables, passed down the tree
    tunables: PollTunables,

    /// Broadcast sender for readings, passed down the tree
    reading_tx: broadcast::Sender<Reading>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<OrchestratorCommand>,

    /// One supervisor per enabled device, keyed by device id
    supervisors: HashMap<i64, SupervisorHandle>,
}

impl FleetOrchestratorActor {
    fn new(
        store: Arc<dyn ConfigStore>,
        tunables: PollTunables,
        reading_tx: broadcast::Sender<Reading>,
        command_rx: mpsc::Receiver<OrchestratorCommand>,
    ) -> Self {
        Self {
            store,
            tunables,
            reading_tx,
            command_rx,
            supervisors: HashMap::new(),
        }
    }

    /// Run the actor's main loop.
    ///
    /// The first refresh happens immediately (the interval's first tick
    /// is instant); after that, every refresh interval. Runs until a
    /// Shutdown command arrives or the command channel closes; teardown
    /// cascades through every supervisor and, transitively, every
    /// poller.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting fleet orchestrator");

        let mut ticker = interval(self.tunables.refresh_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh_fleet().await {
                        warn!("fleet refresh failed: {e}; keeping previous device set");
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        OrchestratorCommand::RefreshNow { respond_to } => {
                            debug!("received RefreshNow command");
                            let result = self.refresh_fleet().await;
                            if let Err(e) = &result {
                                warn!("fleet refresh failed: {e}; keeping previous device set");
                            }
                            let _ = respond_to.send(result);
                        }

                        OrchestratorCommand::GetFleet { respond_to } => {
                            let mut ids: Vec<i64> = self.supervisors.keys().copied().collect();
                            ids.sort_unstable();
                            let _ = respond_to.send(ids);
                        }

                        OrchestratorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        let supervisors: Vec<SupervisorHandle> =
            self.supervisors.drain().map(|(_, handle)| handle).collect();
        join_all(supervisors.into_iter().map(|handle| handle.shutdown())).await;

        debug!("fleet orchestrator stopped");
    }

    /// Reconcile the supervisor set against the enabled-device list.
    async fn refresh_fleet(&mut self) -> Result<(), StoreError> {
        let devices = self.store.list_enabled_devices().await?;
        debug!("fleet refresh: {} enabled devices", devices.len());

        let current: HashMap<i64, _> = devices.into_iter().map(|d| (d.id, d)).collect();

        let stale: Vec<i64> = self
            .supervisors
            .keys()
            .filter(|id| !current.contains_key(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(handle) = self.supervisors.remove(&id) {
                info!("device {} no longer enabled, stopping supervisor", handle.display_name);
                handle.shutdown().await;
            }
        }

        for (id, device) in current {
            if !self.supervisors.contains_key(&id) {
                info!("supervising {} ({})", device.name, device.address());
                self.supervisors.insert(
                    id,
                    SupervisorHandle::spawn(
                        device,
                        self.store.clone(),
                        self.tunables.clone(),
                        self.reading_tx.clone(),
                    ),
                );
            }
        }

        Ok(())
    }
}

/// Handle for controlling a FleetOrchestratorActor.
pub struct OrchestratorHandle {
    sender: mpsc::Sender<OrchestratorCommand>,
    join: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Spawn the orchestrator as a tokio task and return its handle.
    pub fn spawn(
        store: Arc<dyn ConfigStore>,
        tunables: PollTunables,
        reading_tx: broadcast::Sender<Reading>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = FleetOrchestratorActor::new(store, tunables, reading_tx, cmd_rx);

        let join = tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            join,
        }
    }

    /// Refresh the device set immediately, bypassing the refresh timer.
    pub async fn refresh_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorCommand::RefreshNow { respond_to: tx })
            .await
            .context("failed to send RefreshNow command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    /// Ids of the currently supervised devices, sorted.
    pub async fn get_fleet(&self) -> Result<Vec<i64>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorCommand::GetFleet { respond_to: tx })
            .await
            .context("failed to send GetFleet command")?;

        rx.await.context("failed to receive response")
    }

    /// Shut the orchestrator down and wait for the cascade (every
    /// supervisor, every poller, every socket) to finish, bounded by a
    /// grace period. Safe when the actor has already exited.
    pub async fn shutdown(self) {
        let _ = self.sender.send(OrchestratorCommand::Shutdown).await;
        if tokio::time::timeout(STOP_GRACE * 2, self.join).await.is_err() {
            warn!("orchestrator did not stop within grace period");
        }
    }
}
