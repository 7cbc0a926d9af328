//! Helper functions for integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sensor_monitoring::config::PollTunables;
use sensor_monitoring::store::memory::MemoryStore;
use sensor_monitoring::store::{ConfigStore, Device, Parameter, StoreError, StoreResult, Threshold};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Tunables scaled down so whole lifecycles fit inside a test.
pub fn fast_tunables() -> PollTunables {
    PollTunables {
        poll_interval: Duration::from_millis(20),
        connect_timeout: Duration::from_millis(300),
        response_timeout: Duration::from_millis(300),
        settle_delay: Duration::ZERO,
        retry_backoff: Duration::from_millis(50),
        probe_interval: Duration::from_millis(50),
        probe_retry_delay: Duration::from_millis(50),
        probe_timeout: Duration::from_millis(300),
        max_probe_failures: 3,
        refresh_interval: Duration::from_secs(60),
    }
}

pub fn test_device(id: i64, host: &str, port: u16) -> Device {
    Device {
        id,
        name: format!("device-{id}"),
        host: host.to_string(),
        port,
        description: None,
        enabled: true,
        device_type_id: id,
    }
}

pub fn test_parameter(id: i64, device_type_id: i64, name: &str, command: &str, unit: &str) -> Parameter {
    Parameter {
        id,
        name: name.to_string(),
        command: command.to_string(),
        unit: Some(unit.to_string()),
        description: None,
        device_type_id,
    }
}

pub fn test_threshold(id: i64, device_id: i64, parameter_id: i64, low: f64, high: f64) -> Threshold {
    Threshold {
        id,
        low: Some(low),
        high: Some(high),
        enabled: true,
        parameter_id,
        device_id,
    }
}

/// A scripted sensor behind a local TCP listener.
///
/// Accepts any number of connections (probes open and immediately
/// close; the data session reads and writes). Commands found in the
/// script get their canned response; anything else gets silence, which
/// reads as a response timeout on the other side.
pub struct FakeDevice {
    pub host: String,
    pub port: u16,
    accept_task: JoinHandle<()>,
}

impl FakeDevice {
    pub async fn start(script: Vec<(&'static str, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::with_listener(listener, script)
    }

    pub fn with_listener(listener: TcpListener, script: Vec<(&'static str, &'static str)>) -> Self {
        let addr = listener.local_addr().unwrap();

        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let script = script.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 64];
                    loop {
                        let n = match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        let command = String::from_utf8_lossy(&buf[..n]).into_owned();
                        let command = command.trim_end();
                        if let Some((_, response)) = script.iter().find(|(c, _)| command == *c) {
                            let _ = socket.write_all(response.as_bytes()).await;
                        }
                    }
                });
            }
        });

        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
            accept_task,
        }
    }

    /// Take the device off the network. The port is freed; per-connection
    /// tasks die when their peers hang up.
    pub fn stop(self) {
        self.accept_task.abort();
    }
}

/// Store wrapper that can be switched into a failing mode, simulating
/// an unreachable configuration database.
pub struct FailingStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::ConnectionFailed("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ConfigStore for FailingStore {
    async fn list_enabled_devices(&self) -> StoreResult<Vec<Device>> {
        self.check()?;
        self.inner.list_enabled_devices().await
    }

    async fn list_parameters_by_device_type(&self, device_type_id: i64)
    -> StoreResult<Vec<Parameter>> {
        self.check()?;
        self.inner.list_parameters_by_device_type(device_type_id).await
    }

    async fn list_active_thresholds_by_device(&self, device_id: i64)
    -> StoreResult<Vec<Threshold>> {
        self.check()?;
        self.inner.list_active_thresholds_by_device(device_id).await
    }
}

/// Seed one device with one "temperature" parameter (`TE`, unit C) and
/// a 0..50 threshold: the canonical single-sensor fleet.
pub fn seed_weather_device(store: &MemoryStore, device_id: i64, host: &str, port: u16) {
    store.insert_device(test_device(device_id, host, port));
    store.insert_parameter(test_parameter(device_id * 10, device_id, "temperature", "TE", "C"));
    store.insert_threshold(test_threshold(
        device_id * 100,
        device_id,
        device_id * 10,
        0.0,
        50.0,
    ));
}
