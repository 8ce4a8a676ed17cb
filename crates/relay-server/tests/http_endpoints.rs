//! HTTP-level tests for the ingest service.

use relay_core::config::IngestConfig;
use relay_core::SnapshotPayload;
use relay_server::{IngestResponse, IngestStore, RelayServer, ServerHandle};
use serde_json::{json, Value};

const BASE_NS: i64 = 1_714_564_800_000_000_000;

async fn start() -> ServerHandle {
    let server = RelayServer::bind("127.0.0.1:0", IngestStore::shared(), &IngestConfig::default())
        .await
        .expect("bind");
    server.spawn().expect("spawn")
}

fn motion(offset_ns: i64) -> Value {
    json!({
        "name": "wrist motion",
        "time": BASE_NS + offset_ns,
        "values": {"accelerationX": 0.1, "accelerationY": 0.2, "accelerationZ": 9.8}
    })
}

#[tokio::test]
async fn post_data_acknowledges_batch() {
    let server = start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/data", server.base_url()))
        .body(json!({"payload": [motion(1), motion(2)]}).to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: IngestResponse = response.json().await.unwrap();
    assert_eq!(body, IngestResponse::success());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn post_data_rejects_missing_payload() {
    let server = start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/data", server.base_url()))
        .body(r#"{"records": []}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: IngestResponse = response.json().await.unwrap();
    assert_eq!(body.status, "error");
    assert_eq!(body.message.as_deref(), Some("Payload not found"));

    let snapshot: SnapshotPayload = client
        .get(format!("{}/data-snapshot", server.base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(snapshot.is_empty());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn post_data_rejects_garbage() {
    let server = start().await;
    let response = reqwest::Client::new()
        .post(format!("{}/data", server.base_url()))
        .body("definitely not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn partial_batch_still_succeeds() {
    let server = start().await;
    let client = reqwest::Client::new();

    let batch = json!({"payload": [
        motion(1),
        {"name": "wrist motion", "time": BASE_NS + 2, "values": {"accelerationX": 1.0}},
        motion(3),
        {"name": "microphone", "time": BASE_NS, "values": {}},
        {"name": "microphone", "time": BASE_NS, "values": {"dBFS": -22.5}},
    ]});
    let response = client
        .post(format!("{}/data", server.base_url()))
        .body(batch.to_string())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let snapshot: SnapshotPayload = client
        .get(format!("{}/data-snapshot", server.base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot.motion_len(), 2);
    assert_eq!(snapshot.db, vec![-22.5]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn snapshot_refetch_is_byte_identical() {
    let server = start().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/data", server.base_url()))
        .body(json!({"payload": [motion(1), motion(2), motion(3)]}).to_string())
        .send()
        .await
        .unwrap();

    let first = client
        .get(format!("{}/data-snapshot", server.base_url()))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let second = client
        .get(format!("{}/get_data", server.base_url()))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    assert_eq!(first, second);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn health_reports_store_sizes() {
    let server = start().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/data", server.base_url()))
        .body(json!({"payload": [motion(1)]}).to_string())
        .send()
        .await
        .unwrap();

    let health: Value = client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["motion_samples"], 1);
    assert_eq!(health["audio_samples"], 0);

    server.shutdown().await.unwrap();
}
