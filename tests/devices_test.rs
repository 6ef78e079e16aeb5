use reqwest::Client;
use serde_json::json;

mod common;
use common::utils::{mint_token, post_sample, sample_payload, spawn_app, TEST_API_KEY};

#[tokio::test]
async fn register_then_ingest_round_trip() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = mint_token(&app, "provisioner");

    let response = client
        .post(format!("{}/devices/register", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "device_id": "ESP32-001",
            "device_name": "ESP32 ECG Monitor",
            "patient_id": "P1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let device: serde_json::Value = response.json().await.unwrap();
    assert_eq!(device["device_id"], json!("ESP32-001"));
    assert_eq!(device["patient_id"], json!("P1"));
    assert_eq!(device["is_active"], json!(true));

    let response = post_sample(
        &client,
        &app,
        &sample_payload("ESP32-001", "P1", 72),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn duplicate_device_id_is_a_conflict() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = mint_token(&app, "provisioner");

    let request = json!({ "device_id": "ESP32-001", "patient_id": "P1" });
    let first = client
        .post(format!("{}/devices/register", app.address))
        .bearer_auth(&token)
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let second = client
        .post(format!("{}/devices/register", app.address))
        .bearer_auth(&token)
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["error"], json!("Device already registered"));
}

#[tokio::test]
async fn deactivated_device_is_invisible_to_ingestion() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = mint_token(&app, "provisioner");

    client
        .post(format!("{}/devices/register", app.address))
        .bearer_auth(&token)
        .json(&json!({ "device_id": "ESP32-001", "patient_id": "P1" }))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/devices/ESP32-001/deactivate", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = post_sample(
        &client,
        &app,
        &sample_payload("ESP32-001", "P1", 72),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn deactivating_an_unknown_device_is_404() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = mint_token(&app, "provisioner");

    let response = client
        .post(format!("{}/devices/ESP32-404/deactivate", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn patient_devices_lists_all_bound_devices() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = mint_token(&app, "dr_jones");

    for device_id in ["ESP32-001", "ESP32-002"] {
        client
            .post(format!("{}/devices/register", app.address))
            .bearer_auth(&token)
            .json(&json!({ "device_id": device_id, "patient_id": "P1" }))
            .send()
            .await
            .unwrap();
    }

    let response = client
        .get(format!("{}/devices/P1", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let devices: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(devices.len(), 2);
}

#[tokio::test]
async fn device_routes_require_a_valid_bearer_token() {
    let app = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/devices/register", app.address))
        .json(&json!({ "device_id": "ESP32-001", "patient_id": "P1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}
