//! DevicePollerActor - Data-polling lifecycle for one device
//!
//! One poller task exists per actively polled device, started and
//! stopped by the device's ConnectivitySupervisor. The poller owns the
//! device's [`DeviceLink`] exclusively; no other task ever touches the
//! socket.
//!
//! ## State Machine
//!
//! ```text
//! Idle ──spawn──▶ Connecting ──connect ok──▶ Polling
//!                     ▲                         │
//!                     │    link error mid-cycle │
//!                     └─────────────────────────┘
//!
//! cancel (any state) ──▶ Stopping ──▶ Stopped (task exits, socket closed)
//! ```
//!
//! Connect failures are expected steady-state, not exceptional: the
//! poller retries with a fixed backoff indefinitely until cancelled. No
//! failure counter ever aborts polling; an unreachable device simply
//! stays in the connect-retry loop.
//!
//! Cancellation uses a [`CancellationToken`] raced against every
//! suspension point (connect, exchange, sleeps, store lookups), so
//! `stop()` aborts blocked I/O promptly instead of waiting out a
//! timeout; dropping the in-flight future closes the socket.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::PollTunables;
use crate::evaluate::ThresholdEvaluator;
use crate::link::DeviceLink;
use crate::store::{ConfigStore, Device, StoreResult};
use crate::{Reading, ReadingStatus};

use super::scheduler::{CycleOutcome, ParameterScheduler};

/// How long `stop()` waits for the cancelled task to finish.
pub(crate) const STOP_GRACE: Duration = Duration::from_secs(5);

/// Parameter set and threshold map for one polling session.
///
/// Loaded once per session (spawn → stop), not per cycle, to avoid
/// hammering the configuration store; the staleness window is one
/// session.
struct Session {
    scheduler: ParameterScheduler,
    evaluator: ThresholdEvaluator,
}

enum PollerState {
    Connecting,
    Polling(DeviceLink),
}

/// Actor that polls a single device over its data connection.
pub struct DevicePollerActor {
    /// Device under poll
    device: Device,

    /// Configuration store for the session snapshot
    store: Arc<dyn ConfigStore>,

    /// Resolved tunables
    tunables: PollTunables,

    /// Broadcast sender for publishing readings
    reading_tx: broadcast::Sender<Reading>,

    /// Cancellation signal shared with the handle
    cancel: CancellationToken,

    /// Display name for logging
    display_name: String,
}

impl DevicePollerActor {
    fn new(
        device: Device,
        store: Arc<dyn ConfigStore>,
        tunables: PollTunables,
        reading_tx: broadcast::Sender<Reading>,
        cancel: CancellationToken,
    ) -> Self {
        let display_name = format!("{} ({})", device.name, device.address());

        Self {
            device,
            store,
            tunables,
            reading_tx,
            cancel,
            display_name,
        }
    }

    /// Run the actor until cancelled.
    ///
    /// Everything after the `select!` is teardown: the in-flight state
    /// (including any open link) is dropped, which closes the socket.
    #[instrument(skip(self), fields(device = %self.display_name))]
    pub async fn run(self) {
        let cancel = self.cancel.clone();
        debug!("starting device poller");

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("device poller cancelled");
            }
            _ = self.drive() => {
                // drive() loops forever; only cancellation ends the task
            }
        }

        debug!("device poller stopped");
    }

    async fn drive(&self) {
        let session = self.load_session().await;
        let mut state = PollerState::Connecting;

        loop {
            state = match state {
                PollerState::Connecting => self.connect_step().await,
                PollerState::Polling(link) => self.poll_step(link, &session).await,
            };
        }
    }

    /// Load the parameter set and threshold map for this session,
    /// retrying with backoff until the store answers. Store failures are
    /// transient by contract, so they are logged and absorbed here.
    async fn load_session(&self) -> Session {
        loop {
            match self.try_load_session().await {
                Ok(session) => {
                    if session.scheduler.parameters().is_empty() {
                        warn!("no parameters registered for device type {}", self.device.device_type_id);
                    }
                    return session;
                }
                Err(e) => {
                    warn!("failed to load polling session: {e}; retrying");
                    sleep(self.tunables.retry_backoff).await;
                }
            }
        }
    }

    async fn try_load_session(&self) -> StoreResult<Session> {
        let parameters = self
            .store
            .list_parameters_by_device_type(self.device.device_type_id)
            .await?;
        let thresholds = self.store.list_active_thresholds_by_device(self.device.id).await?;

        debug!(
            "session snapshot: {} parameters, {} thresholds",
            parameters.len(),
            thresholds.len()
        );

        Ok(Session {
            scheduler: ParameterScheduler::new(parameters, self.tunables.response_timeout),
            evaluator: ThresholdEvaluator::new(thresholds),
        })
    }

    /// One connect attempt; on failure waits out the backoff and stays
    /// in Connecting.
    async fn connect_step(&self) -> PollerState {
        match DeviceLink::connect(
            &self.device.host,
            self.device.port,
            self.tunables.connect_timeout,
        )
        .await
        {
            Ok(link) => {
                info!("connected, starting poll cycles");
                PollerState::Polling(link.with_settle_delay(self.tunables.settle_delay))
            }
            Err(e) => {
                warn!("connect failed: {e}; retrying in {:?}", self.tunables.retry_backoff);
                sleep(self.tunables.retry_backoff).await;
                PollerState::Connecting
            }
        }
    }

    /// One poll cycle followed by the poll-interval pause. A dead
    /// connection sends the poller back to Connecting; the stale link is
    /// closed before the transition.
    async fn poll_step(&self, mut link: DeviceLink, session: &Session) -> PollerState {
        match session.scheduler.run_cycle(&mut link).await {
            Ok(outcomes) => {
                for outcome in outcomes {
                    self.emit(outcome, &session.evaluator);
                }
                sleep(self.tunables.poll_interval).await;
                PollerState::Polling(link)
            }
            Err(e) => {
                warn!("poll cycle failed: {e}; reconnecting");
                link.close().await;
                PollerState::Connecting
            }
        }
    }

    /// Evaluate one cycle outcome and hand the reading to the sink.
    ///
    /// Emission is fire-and-forget: send errors mean no subscriber is
    /// attached right now, and a lagging subscriber drops messages.
    /// Both are acceptable; the sink must never stall polling.
    fn emit(&self, outcome: CycleOutcome, evaluator: &ThresholdEvaluator) {
        let parameter = outcome.parameter;

        let value = match outcome.result {
            Ok(value) => value,
            Err(e) => {
                warn!("{}: skipping reading: {e}", parameter.name);
                return;
            }
        };

        let status = evaluator.evaluate(parameter.id, value);
        if status == ReadingStatus::Alarm {
            warn!("{}: value {value} outside threshold", parameter.name);
        }

        let reading = Reading {
            device_id: self.device.id,
            device_name: self.device.name.clone(),
            parameter_id: parameter.id,
            parameter_name: parameter.name,
            value,
            unit: parameter.unit,
            status,
            timestamp: Utc::now(),
        };

        let _ = self.reading_tx.send(reading);
    }
}

/// Handle for a running DevicePollerActor.
///
/// Owned by the device's supervisor; holding the only handle is what
/// guarantees at most one poller per device.
pub struct PollerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    pub device_id: i64,
    pub display_name: String,
}

impl PollerHandle {
    /// Spawn a poller for `device` as a tokio task and return its
    /// handle.
    pub fn spawn(
        device: Device,
        store: Arc<dyn ConfigStore>,
        tunables: PollTunables,
        reading_tx: broadcast::Sender<Reading>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let device_id = device.id;

        let actor = DevicePollerActor::new(device, store, tunables, reading_tx, cancel.clone());
        let display_name = actor.display_name.clone();

        let join = tokio::spawn(actor.run());

        Self {
            cancel,
            join,
            device_id,
            display_name,
        }
    }

    /// Signal the poller to stop without waiting for it. Idempotent:
    /// cancelling an already-cancelled (or already-finished) poller is a
    /// no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the poller task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the poller and wait for its task to finish, bounded by a
    /// grace period. Completes even when the device is unreachable,
    /// since cancellation aborts blocked connects and reads.
    pub async fn stop(self) {
        self.cancel.cancel();
        if tokio::time::timeout(STOP_GRACE, self.join).await.is_err() {
            warn!("poller for device {} did not stop within grace period", self.device_id);
        }
    }
}
