//! ---
//! iotlab_section: "15-testing-qa-runbook"
//! iotlab_subsection: "tests"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "End-to-end HTTP scenarios against a disk-backed daemon state."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::Arc;

use iotlab_api::{spawn_api_server, ApiServer, ApiState};
use iotlab_common::config::{StorageBackend, StorageConfig};
use iotlab_sensor::SensorReader;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::tempdir;

fn storage_in(root: &Path) -> StorageConfig {
    StorageConfig {
        backend: StorageBackend::Filesystem,
        sensors_dir: root.join("sensors"),
        files_dir: root.join("files"),
    }
}

fn start(storage: &StorageConfig) -> (ApiServer, String) {
    let state = Arc::new(ApiState::from_storage(storage).expect("storage opens"));
    let server = spawn_api_server(state, "127.0.0.1:0".parse().unwrap()).expect("server starts");
    let base = format!("http://{}", server.addr());
    (server, base)
}

#[tokio::test]
async fn sensor_configuration_scenario_on_disk() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path());
    let (server, base) = start(&storage);
    let client = Client::new();

    let reading: Value = client
        .get(format!("{base}/sensor/temp01"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let offline = SensorReader::new().read("temp01");
    assert_eq!(reading["sensor_id"], "temp01");
    assert!((reading["value"].as_f64().unwrap() - offline.value).abs() < 1e-9);

    let created = client
        .post(format!("{base}/sensor/temp01/config"))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let on_disk = storage.sensors_dir.join("temp01").join("config.json");
    let stored: Value = serde_json::from_slice(&std::fs::read(&on_disk).unwrap()).unwrap();
    assert_eq!(stored, json!({"scale": "Celsius", "frequency": "1Hz"}));

    let updated = client
        .put(format!("{base}/sensor/temp01/config/config.json"))
        .json(&json!({"scale": "Kelvin", "frequency": "5Hz"}))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);

    let conflict = client
        .post(format!("{base}/sensor/temp01/config"))
        .json(&json!({"scale": "Fahrenheit"}))
        .send()
        .await
        .unwrap();
    assert_eq!(conflict.status(), StatusCode::CONFLICT);

    let stored: Value = serde_json::from_slice(&std::fs::read(&on_disk).unwrap()).unwrap();
    assert_eq!(stored, json!({"scale": "Kelvin", "frequency": "5Hz"}));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn resources_survive_a_restart() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path());

    let (server, base) = start(&storage);
    let client = Client::new();
    client
        .post(format!("{base}/sensor/hum02/config"))
        .json(&json!({"frequency": "10Hz"}))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{base}/files"))
        .json(&json!({"filename": "log.txt", "content": "boot"}))
        .send()
        .await
        .unwrap();
    server.shutdown().await.unwrap();

    let (server, base) = start(&storage);
    let config: Value = client
        .get(format!("{base}/sensor/hum02/config/config.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(config, json!({"scale": "Celsius", "frequency": "10Hz"}));

    let file: Value = client
        .get(format!("{base}/files/log.txt"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(file["content"], "boot");
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn traversal_never_escapes_storage_root() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path());
    let (server, base) = start(&storage);
    let client = Client::new();

    let resp = client
        .post(format!("{base}/files"))
        .json(&json!({"filename": "../outside.txt", "content": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("outside.txt").exists());

    let resp = client
        .post(format!("{base}/sensor/..%2F..%2Fescape/config"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("escape").exists());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn docs_endpoints_are_served() {
    let (server, base) = start(&StorageConfig {
        backend: StorageBackend::Memory,
        ..StorageConfig::default()
    });
    let client = Client::new();

    let index = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(index.status(), StatusCode::OK);
    assert!(index.text().await.unwrap().contains("/apidocs/"));

    let ui = client.get(format!("{base}/apidocs/")).send().await.unwrap();
    assert_eq!(ui.status(), StatusCode::OK);

    let spec: Value = client
        .get(format!("{base}/apispec.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        spec,
        serde_json::to_value(iotlab_api::openapi_document()).unwrap()
    );
    assert_eq!(
        spec["paths"]["/files/{filename}"]["delete"]["responses"]["400"]["description"],
        "Invalid file name"
    );

    let health = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "ok");

    server.shutdown().await.unwrap();
}
