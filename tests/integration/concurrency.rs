//! Concurrency tests: per-device isolation, bounded cancellation and
//! cascading shutdown across many devices.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sensor_monitoring::actors::orchestrator::OrchestratorHandle;
use sensor_monitoring::actors::poller::PollerHandle;
use sensor_monitoring::config::PollTunables;
use sensor_monitoring::store::memory::MemoryStore;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::helpers::*;

#[tokio::test]
async fn one_dead_device_does_not_block_the_other() {
    let healthy = FakeDevice::start(vec![("TE", "23.5\r")]).await;

    // dead port for device 2
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let store = Arc::new(MemoryStore::new());
    seed_weather_device(&store, 1, &healthy.host, healthy.port);
    seed_weather_device(&store, 2, &dead_addr.ip().to_string(), dead_addr.port());

    let (reading_tx, mut reading_rx) = broadcast::channel(256);
    let orchestrator = OrchestratorHandle::spawn(store, fast_tunables(), reading_tx);
    orchestrator.refresh_now().await.unwrap();
    assert_eq!(orchestrator.get_fleet().await.unwrap(), vec![1, 2]);

    // the healthy device keeps producing; nothing arrives from the dead one
    for _ in 0..3 {
        let reading = timeout(Duration::from_secs(5), reading_rx.recv())
            .await
            .expect("healthy device must not be starved by the dead one")
            .unwrap();
        assert_eq!(reading.device_id, 1);
    }

    orchestrator.shutdown().await;
    healthy.stop();
}

#[tokio::test]
async fn stop_aborts_a_blocked_read_within_bounds() {
    // accepts the data connection, then never responds; a long response
    // timeout means only cancellation can end the read early
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 64];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        return;
                    }
                    // swallow the command, answer nothing
                }
            });
        }
    });

    let store = Arc::new(MemoryStore::new());
    seed_weather_device(&store, 1, &addr.ip().to_string(), addr.port());

    let tunables = PollTunables {
        response_timeout: Duration::from_secs(30),
        ..fast_tunables()
    };

    let (reading_tx, _reading_rx) = broadcast::channel(256);
    let poller = PollerHandle::spawn(
        test_device(1, &addr.ip().to_string(), addr.port()),
        store,
        tunables,
        reading_tx,
    );

    // let the poller connect and block inside the first exchange
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!poller.is_finished());

    let started = Instant::now();
    poller.stop().await;
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "stop must abort the blocked read, not wait out the 30s response timeout"
    );
}

#[tokio::test]
async fn shutdown_cascades_over_a_mixed_fleet() {
    let healthy_1 = FakeDevice::start(vec![("TE", "23.5\r")]).await;
    let healthy_2 = FakeDevice::start(vec![("TE", "7\r")]).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let store = Arc::new(MemoryStore::new());
    seed_weather_device(&store, 1, &healthy_1.host, healthy_1.port);
    seed_weather_device(&store, 2, &healthy_2.host, healthy_2.port);
    seed_weather_device(&store, 3, &dead_addr.ip().to_string(), dead_addr.port());

    let (reading_tx, mut reading_rx) = broadcast::channel(256);
    let orchestrator = OrchestratorHandle::spawn(store, fast_tunables(), reading_tx);
    orchestrator.refresh_now().await.unwrap();
    assert_eq!(orchestrator.get_fleet().await.unwrap(), vec![1, 2, 3]);

    // wait for the pipeline to produce before tearing everything down
    timeout(Duration::from_secs(5), reading_rx.recv())
        .await
        .expect("fleet must be live before the shutdown check")
        .unwrap();

    let started = Instant::now();
    orchestrator.shutdown().await;
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "cascade must stop supervisors and pollers concurrently"
    );

    healthy_1.stop();
    healthy_2.stop();
}

#[tokio::test]
async fn disabling_a_device_stops_only_its_readings() {
    let device_1 = FakeDevice::start(vec![("TE", "1\r")]).await;
    let device_2 = FakeDevice::start(vec![("TE", "2\r")]).await;

    let store = Arc::new(MemoryStore::new());
    seed_weather_device(&store, 1, &device_1.host, device_1.port);
    seed_weather_device(&store, 2, &device_2.host, device_2.port);

    let (reading_tx, mut reading_rx) = broadcast::channel(256);
    let orchestrator = OrchestratorHandle::spawn(store.clone(), fast_tunables(), reading_tx);
    orchestrator.refresh_now().await.unwrap();

    // both devices report
    let mut seen = [false, false];
    while seen != [true, true] {
        let reading = timeout(Duration::from_secs(5), reading_rx.recv())
            .await
            .expect("both devices must report")
            .unwrap();
        seen[(reading.device_id - 1) as usize] = true;
    }

    store.set_device_enabled(1, false);
    orchestrator.refresh_now().await.unwrap();
    assert_eq!(orchestrator.get_fleet().await.unwrap(), vec![2]);

    // drain whatever was in flight, then expect only device 2
    tokio::time::sleep(Duration::from_millis(100)).await;
    while let Ok(reading) = reading_rx.try_recv() {
        let _ = reading;
    }
    for _ in 0..3 {
        let reading = timeout(Duration::from_secs(5), reading_rx.recv())
            .await
            .expect("device 2 must keep reporting")
            .unwrap();
        assert_eq!(reading.device_id, 2);
    }

    orchestrator.shutdown().await;
    device_1.stop();
    device_2.stop();
}
