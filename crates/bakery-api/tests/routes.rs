//! ---
//! bakery_section: "05-http-interface"
//! bakery_subsection: "tests"
//! bakery_type: "test"
//! bakery_scope: "code"
//! bakery_description: "Live HTTP tests for the bakery API routes."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use bakery_api::{spawn_api_server, ApiServer, ApiState};
use bakery_metrics::{new_registry, ReportMetrics};
use bakery_persistence::ArtifactStore;
use bakery_report::{NarrativeSummarizer, ReportService, ReportSettings};
use bakery_sim::{RandomReadingSource, Reading};
use serde_json::Value;
use tempfile::tempdir;

fn start(data_dir: &Path, with_metrics: bool) -> ApiServer {
    let mut reports = ReportService::new(
        Arc::new(RandomReadingSource::seeded(42)),
        Arc::new(ArtifactStore::new(data_dir, "bakery_data", "bakery_data.csv")),
        NarrativeSummarizer::local(),
        ReportSettings::default(),
    );
    let registry = if with_metrics {
        let registry = new_registry();
        reports = reports.with_metrics(ReportMetrics::new(registry.clone()).unwrap());
        Some(registry)
    } else {
        None
    };
    let state = Arc::new(ApiState::new(reports, registry));
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    spawn_api_server(state, addr, &["*".to_owned()]).unwrap()
}

fn url(server: &ApiServer, path: &str) -> String {
    format!("http://{}{}", server.addr(), path)
}

#[tokio::test]
async fn sensors_return_in_range_readings() {
    let dir = tempdir().unwrap();
    let server = start(dir.path(), false);
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let response = client.get(url(&server, "/api/sensors")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let reading: Reading = response.json().await.unwrap();
        assert!(reading.in_range(), "{reading:?}");
        assert_eq!(reading.timestamp.len(), 19);
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn generate_report_then_download_artifact() {
    let dir = tempdir().unwrap();
    let server = start(dir.path(), false);
    let client = reqwest::Client::new();

    let body: Value = client
        .post(url(&server, "/api/generate_report?n=7"))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["rows"], 7);
    assert_eq!(body["narrative_source"], "local");
    let path = body["path"].as_str().unwrap().to_owned();
    assert_eq!(path, format!("/data/{}", body["filename"].as_str().unwrap()));

    let download = client.get(url(&server, &path)).send().await.unwrap();
    assert_eq!(download.status(), reqwest::StatusCode::OK);
    let text = download.text().await.unwrap();
    assert_eq!(text.lines().count(), 8);
    assert!(text.starts_with(&Reading::FIELDS.join(",")));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn garbage_batch_size_falls_back_to_default() {
    let dir = tempdir().unwrap();
    let server = start(dir.path(), false);

    let body: Value = reqwest::get(url(&server, "/api/generate_report?n=abc"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["rows"], 50);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_artifact_is_not_found() {
    let dir = tempdir().unwrap();
    let server = start(dir.path(), false);

    let response = reqwest::get(url(&server, "/data/bakery_data_19700101_000000.csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn export_is_an_attachment_and_writes_nothing() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let server = start(&data_dir, false);

    let response = reqwest::get(url(&server, "/api/export_csv")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert_eq!(disposition, "attachment; filename=bakery_data.csv");
    let text = response.text().await.unwrap();
    assert_eq!(text.lines().count(), 21);
    assert!(!data_dir.exists());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn persistence_failure_maps_to_server_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"x").unwrap();
    let server = start(&blocker, true);

    let response = reqwest::get(url(&server, "/api/generate_report"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("persistence"));

    let metrics = reqwest::get(url(&server, "/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("bakery_report_failures_total 1"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn health_and_disabled_metrics() {
    let dir = tempdir().unwrap();
    let server = start(dir.path(), false);

    let health = reqwest::get(url(&server, "/healthz")).await.unwrap();
    assert_eq!(health.text().await.unwrap(), "ok");

    let metrics = reqwest::get(url(&server, "/metrics")).await.unwrap();
    assert_eq!(metrics.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    server.shutdown().await.unwrap();
}
