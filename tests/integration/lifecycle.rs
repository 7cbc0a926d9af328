//! Lifecycle tests: idempotent stop, stop in every state, socket
//! release on teardown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sensor_monitoring::actors::poller::PollerHandle;
use sensor_monitoring::actors::supervisor::SupervisorHandle;
use sensor_monitoring::link::DeviceLink;
use sensor_monitoring::store::memory::MemoryStore;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::helpers::*;

#[tokio::test]
async fn stop_is_idempotent_in_any_state() {
    // while Connecting (nothing listens)
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let (reading_tx, _) = broadcast::channel(64);
    let poller = PollerHandle::spawn(
        test_device(1, &dead_addr.ip().to_string(), dead_addr.port()),
        Arc::new(MemoryStore::new()),
        fast_tunables(),
        reading_tx.clone(),
    );
    poller.cancel();
    poller.cancel();
    poller.stop().await;

    // while Polling (device answers)
    let device = FakeDevice::start(vec![("TE", "23.5\r")]).await;
    let store = Arc::new(MemoryStore::new());
    seed_weather_device(&store, 1, &device.host, device.port);

    let (reading_tx, mut reading_rx) = broadcast::channel(64);
    let poller = PollerHandle::spawn(
        test_device(1, &device.host, device.port),
        store,
        fast_tunables(),
        reading_tx,
    );
    timeout(Duration::from_secs(5), reading_rx.recv())
        .await
        .expect("poller must reach Polling before the stop check")
        .unwrap();

    poller.cancel();
    poller.cancel();
    poller.stop().await;
    device.stop();
}

#[tokio::test]
async fn stopped_poller_releases_its_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let device = FakeDevice::with_listener(listener, vec![("TE", "23.5\r")]);

    let store = Arc::new(MemoryStore::new());
    seed_weather_device(&store, 1, &addr.ip().to_string(), addr.port());

    let (reading_tx, mut reading_rx) = broadcast::channel(64);
    let poller = PollerHandle::spawn(
        test_device(1, &addr.ip().to_string(), addr.port()),
        store,
        fast_tunables(),
        reading_tx,
    );
    timeout(Duration::from_secs(5), reading_rx.recv())
        .await
        .expect("poller must connect first")
        .unwrap();

    poller.stop().await;

    // the port is still usable after teardown
    let link = DeviceLink::connect(&addr.ip().to_string(), addr.port(), Duration::from_millis(500))
        .await
        .expect("socket must be released by the stopped poller");
    link.close().await;
    device.stop();
}

#[tokio::test]
async fn supervisor_survives_repeated_probe_cycles() {
    let device = FakeDevice::start(vec![("TE", "23.5\r")]).await;
    let store = Arc::new(MemoryStore::new());
    seed_weather_device(&store, 1, &device.host, device.port);

    let (reading_tx, _) = broadcast::channel(64);
    let supervisor = SupervisorHandle::spawn(
        test_device(1, &device.host, device.port),
        store,
        fast_tunables(),
        reading_tx,
    );

    for _ in 0..5 {
        assert!(supervisor.probe_now().await.unwrap());
    }
    let status = supervisor.status().await.unwrap();
    assert_eq!(status.reachable, Some(true));
    assert!(status.poller_running);

    let started = Instant::now();
    supervisor.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(2));
    device.stop();
}
