//! Poll loop driven against a live ingest service.

use std::time::Duration;

use relay_client::address::{AddressSource, IngestAddress};
use relay_client::buffer::HistoryDelta;
use relay_client::export::export_session;
use relay_client::{HttpSnapshotSource, LogRenderer, PollConfig, PollLoop, TickOutcome};
use relay_core::config::IngestConfig;
use relay_core::HistoryPolicy;
use relay_server::{IngestStore, RelayServer, ServerHandle, SharedIngestStore};
use serde_json::{json, Value};

const BASE_NS: i64 = 1_714_564_800_000_000_000;

async fn start() -> (ServerHandle, SharedIngestStore) {
    let store = IngestStore::shared();
    let server = RelayServer::bind("127.0.0.1:0", store.clone(), &IngestConfig::default())
        .await
        .expect("bind");
    (server.spawn().expect("spawn"), store)
}

fn source_for(base_url: &str) -> HttpSnapshotSource {
    let address = IngestAddress::parse(base_url, AddressSource::UserInput).unwrap();
    HttpSnapshotSource::new(&address, Duration::from_secs(2)).unwrap()
}

fn config(window: usize, policy: HistoryPolicy) -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(20),
        fetch_timeout: Duration::from_secs(2),
        window_capacity: window,
        history: Some(policy),
    }
}

fn motion(offset: i64) -> Value {
    json!({
        "name": "wrist motion",
        "time": BASE_NS + offset,
        "values": {"accelerationX": offset as f64, "accelerationY": 0.0, "accelerationZ": 9.8}
    })
}

fn audio(offset: i64, db: f64) -> Value {
    json!({"name": "microphone", "time": BASE_NS + offset, "values": {"dBFS": db}})
}

async fn post(base_url: &str, records: Vec<Value>) {
    let response = reqwest::Client::new()
        .post(format!("{base_url}/data"))
        .body(json!({ "payload": records }).to_string())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn ticks_follow_server_state_without_duplicates() {
    let (server, _store) = start().await;
    let base = server.base_url();
    let mut poll = PollLoop::new(source_for(&base), LogRenderer, config(2, HistoryPolicy::Delta));

    post(&base, vec![motion(1), motion(2), motion(3), audio(1, -40.0)]).await;
    let first = poll.tick().await;
    assert_eq!(
        first,
        TickOutcome::Applied {
            motion: 2,
            audio: 1,
            history_added: Some(HistoryDelta {
                motion_added: 3,
                audio_added: 1
            }),
        }
    );

    // A stale sample is rejected server-side; a newer one is accepted.
    post(&base, vec![motion(2), motion(4), audio(2, -38.0)]).await;
    poll.tick().await;
    poll.tick().await;

    let history = poll.buffer().history().unwrap();
    let xs: Vec<f64> = history.motion().iter().map(|s| s.ax).collect();
    assert_eq!(xs, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(history.audio().len(), 2);

    let window = poll.buffer().window();
    assert_eq!(window.accel_series()[0], vec![3.0, 4.0]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn full_snapshot_policy_repeats_rows() {
    let (server, _store) = start().await;
    let base = server.base_url();
    let mut poll = PollLoop::new(
        source_for(&base),
        LogRenderer,
        config(10, HistoryPolicy::FullSnapshot),
    );

    post(&base, vec![motion(1), motion(2)]).await;
    poll.tick().await;
    poll.tick().await;

    assert_eq!(poll.buffer().history().unwrap().motion().len(), 4);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn loop_survives_service_going_away() {
    let (server, _store) = start().await;
    let base = server.base_url();
    let mut poll = PollLoop::new(source_for(&base), LogRenderer, config(10, HistoryPolicy::Delta));

    post(&base, vec![motion(1), motion(2)]).await;
    poll.tick().await;
    server.shutdown().await.unwrap();

    assert_eq!(poll.tick().await, TickOutcome::TransportFailed);
    assert!(!poll.link().is_connected());
    assert_eq!(poll.buffer().window().motion().len(), 2);
    assert_eq!(poll.buffer().history().unwrap().motion().len(), 2);
}

#[tokio::test]
async fn spawned_loop_exports_session_on_stop() {
    let (server, store) = start().await;
    let base = server.base_url();
    let handle = PollLoop::new(source_for(&base), LogRenderer, config(5, HistoryPolicy::Delta)).spawn();

    post(&base, vec![motion(1), motion(2), audio(1, -50.0)]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    post(&base, vec![motion(3)]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let report = handle.stop().await.unwrap();
    assert!(report.stats.applied >= 2);
    assert_eq!(store.motion_len(), 3);

    let history = report.buffer.history().unwrap();
    assert_eq!(history.motion().len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let summary = export_session(dir.path().join("activity_data.csv"), history).unwrap();
    assert_eq!(summary.motion_rows, 3);
    assert_eq!(summary.audio_rows, 1);

    let text = std::fs::read_to_string(summary.motion_path).unwrap();
    assert_eq!(text.lines().next(), Some("time,accel_x,accel_y,accel_z"));

    server.shutdown().await.unwrap();
}
