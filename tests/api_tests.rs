//! API Integration Tests
//!
//! Drives the REST API over a real listener: health, model lifecycle, error
//! statuses, concurrency and restart recovery.

mod common;

use common::{assert_status, assert_success, fixtures, TestApp};
use config_model_compiler::ArtifactLoader;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn push(app: &TestApp, body: &impl serde::Serialize) -> reqwest::Response {
    app.client()
        .post(format!("{}/v1/models", app.url()))
        .json(body)
        .send()
        .await
        .expect("Failed to send request")
}

async fn get(app: &TestApp, path: &str) -> reqwest::Response {
    app.client()
        .get(format!("{}{}", app.url(), path))
        .send()
        .await
        .expect("Failed to send request")
}

async fn delete(app: &TestApp, path: &str) -> reqwest::Response {
    app.client()
        .delete(format!("{}{}", app.url(), path))
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new().await;

    let response = get(&app, "/health").await;
    assert_success(&response);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_version_endpoint() {
    let app = TestApp::new().await;

    let response = get(&app, "/version").await;
    assert_success(&response);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["version"].is_string());
    assert_eq!(body["api_version"], "v1");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new().await;

    let response = get(&app, "/metrics").await;
    assert_success(&response);
    assert!(response.text().await.is_ok());
}

#[tokio::test]
async fn test_not_found_endpoint() {
    let app = TestApp::new().await;
    assert_status(&get(&app, "/nonexistent").await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_is_empty_initially() {
    let app = TestApp::new().await;

    let response = get(&app, "/v1/models").await;
    assert_status(&response, StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"models": []}));
}

#[tokio::test]
async fn test_model_lifecycle() {
    let app = TestApp::new().await;

    let response = push(&app, &fixtures::push_request("testdevice", "1.0.0")).await;
    assert_status(&response, StatusCode::CREATED);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({}));

    let artifact = app.artifact("testdevice-1.0.0.so");
    let plugin = ArtifactLoader::new().load(&artifact).await.unwrap();
    assert_eq!(plugin.identity().to_string(), "testdevice@1.0.0");
    assert_eq!(plugin.module_source("test1"), Some("module test1 {}"));

    let response = get(&app, "/v1/models/testdevice/1.0.0").await;
    assert_status(&response, StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"model": {
            "name": "testdevice",
            "version": "1.0.0",
            "modules": [{
                "name": "test1",
                "organization": "ONF",
                "version": "2018-02-20",
                "data": "bW9kdWxlIHRlc3QxIHt9"
            }]
        }})
    );

    let body: Value = get(&app, "/v1/models").await.json().await.unwrap();
    assert_eq!(body["models"].as_array().unwrap().len(), 1);

    let response = delete(&app, "/v1/models/testdevice/1.0.0").await;
    assert_status(&response, StatusCode::OK);
    assert!(!artifact.exists());

    assert_status(
        &get(&app, "/v1/models/testdevice/1.0.0").await,
        StatusCode::NOT_FOUND,
    );
}

#[tokio::test]
async fn test_push_error_statuses() {
    let app = TestApp::new().await;

    assert_status(
        &push(&app, &fixtures::push_request("dup", "1.0")).await,
        StatusCode::CREATED,
    );
    let response = push(&app, &fixtures::push_request("dup", "1.0")).await;
    assert_status(&response, StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_EXISTS");

    let mut empty = fixtures::push_request("empty", "1.0");
    empty.modules.clear();
    assert_status(&push(&app, &empty).await, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!app.artifact("empty-1.0.so").exists());

    assert_status(
        &push(&app, &fixtures::push_request("bad/name", "1.0")).await,
        StatusCode::BAD_REQUEST,
    );
    assert_status(
        &push(&app, &json!({"name": "x", "version": "1", "modules": [{"name": "m", "version": "1", "data": "%%%"}]})).await,
        StatusCode::BAD_REQUEST,
    );

    let body: Value = get(&app, "/v1/models").await.json().await.unwrap();
    assert_eq!(body["models"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_unknown_model() {
    let app = TestApp::new().await;
    assert_status(
        &delete(&app, "/v1/models/missing/1.0").await,
        StatusCode::NOT_FOUND,
    );
}

#[tokio::test]
async fn test_artifact_file_collision_is_rejected() {
    let app = TestApp::new().await;

    // Both identities derive "a-b-c.so"
    assert_status(
        &push(&app, &fixtures::push_request("a-b", "c")).await,
        StatusCode::CREATED,
    );
    let response = push(&app, &fixtures::push_request("a", "b-c")).await;
    assert_status(&response, StatusCode::CONFLICT);

    let plugin = ArtifactLoader::new()
        .load(app.artifact("a-b-c.so"))
        .await
        .unwrap();
    assert_eq!(plugin.identity().to_string(), "a-b@c");
}

#[tokio::test]
async fn test_concurrent_duplicate_pushes() {
    let app = TestApp::new().await;

    let request = fixtures::push_request("racer", "1.0");
    let responses = futures::future::join_all((0..8).map(|_| push(&app, &request))).await;

    let created = responses
        .iter()
        .filter(|r| r.status() == StatusCode::CREATED)
        .count();
    let conflicts = responses
        .iter()
        .filter(|r| r.status() == StatusCode::CONFLICT)
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(app.services.models().count_models().await.unwrap(), 1);
}

#[tokio::test]
async fn test_restart_repairs_state() {
    let app = TestApp::new().await;

    push(&app, &fixtures::push_request("kept", "1.0")).await;
    push(&app, &fixtures::push_request("lost", "1.0")).await;

    // Simulate a lost artifact and a stray file from an earlier run
    std::fs::remove_file(app.artifact("lost-1.0.so")).unwrap();
    std::fs::write(app.artifact("stray-9.so"), b"junk").unwrap();

    let app = app.restart().await;
    let report = app.services.models().reconcile().await.unwrap();
    assert_eq!(report.recompiled, vec!["lost@1.0".to_string()]);
    assert_eq!(report.orphans_removed, vec!["stray-9.so".to_string()]);

    assert!(app.artifact("lost-1.0.so").exists());
    assert!(!app.artifact("stray-9.so").exists());

    let body: Value = get(&app, "/v1/models").await.json().await.unwrap();
    assert_eq!(body["models"].as_array().unwrap().len(), 2);
}
