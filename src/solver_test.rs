// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for solver module

use super::solver::*;
use crate::{
    test_support::{challenge_request, default_secret_store, FakeZone, TEST_ZONE},
    types::SolverError,
};
use serial_test::serial;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn solver() -> OvhSolver {
    OvhSolver::with_secret_store(default_secret_store())
}

/// Fail the test if the solver reaches the OVH API at all
async fn mount_no_calls(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_present_then_clean_up() {
    let mock_server = MockServer::start().await;
    let zone = FakeZone::new(TEST_ZONE);
    zone.mount(&mock_server).await;

    let solver = solver();
    let request = challenge_request(&mock_server.uri(), "token-1");

    solver.present(&request).await.unwrap();
    let records = zone.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].field_type, "TXT");
    assert_eq!(records[0].sub_domain, "_acme-challenge");
    assert_eq!(records[0].target, "token-1");

    solver.clean_up(&request).await.unwrap();
    assert!(zone.records().is_empty());
    assert_eq!(zone.refreshes(), 2);
}

#[tokio::test]
async fn test_clean_up_without_present() {
    let mock_server = MockServer::start().await;
    let zone = FakeZone::new(TEST_ZONE);
    zone.mount(&mock_server).await;

    let request = challenge_request(&mock_server.uri(), "token-1");
    solver().clean_up(&request).await.unwrap();

    assert!(zone.records().is_empty());
}

#[tokio::test]
async fn test_clean_up_keeps_concurrent_challenge() {
    let mock_server = MockServer::start().await;
    let zone = FakeZone::new(TEST_ZONE);
    zone.mount(&mock_server).await;

    let solver = solver();
    let wildcard = challenge_request(&mock_server.uri(), "wildcard-token");
    let apex = challenge_request(&mock_server.uri(), "apex-token");

    solver.present(&wildcard).await.unwrap();
    solver.present(&apex).await.unwrap();
    assert_eq!(zone.records().len(), 2);

    solver.clean_up(&apex).await.unwrap();

    let records = zone.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target, "wildcard-token");
}

#[tokio::test]
async fn test_present_nested_subdomain() {
    let mock_server = MockServer::start().await;
    let zone = FakeZone::new(TEST_ZONE);
    zone.mount(&mock_server).await;

    let mut request = challenge_request(&mock_server.uri(), "token");
    request.resolved_fqdn = "_acme-challenge.sub.example.com.".to_string();

    solver().present(&request).await.unwrap();

    assert_eq!(zone.records()[0].sub_domain, "_acme-challenge.sub");
}

#[tokio::test]
async fn test_present_zone_not_deployed() {
    let mock_server = MockServer::start().await;
    let zone = FakeZone::new(TEST_ZONE);
    zone.set_deployed(false);
    zone.mount(&mock_server).await;

    let request = challenge_request(&mock_server.uri(), "token");
    let err = solver().present(&request).await.unwrap_err();

    assert!(matches!(err, SolverError::ZoneNotDeployed { .. }));
    assert!(zone.records().is_empty());
    assert_eq!(zone.refreshes(), 0);
}

#[tokio::test]
async fn test_present_invalid_config_touches_nothing() {
    let mock_server = MockServer::start().await;
    mount_no_calls(&mock_server).await;

    let mut request = challenge_request(&mock_server.uri(), "token");
    request.config = Some(serde_json::json!({ "endpoint": mock_server.uri() }));

    let err = solver().present(&request).await.unwrap_err();
    assert!(matches!(
        err,
        SolverError::ConfigValidation {
            field: "application key"
        }
    ));
}

#[tokio::test]
async fn test_present_malformed_config() {
    let mock_server = MockServer::start().await;
    mount_no_calls(&mock_server).await;

    let mut request = challenge_request(&mock_server.uri(), "token");
    request.config = Some(serde_json::json!(["not", "an", "object"]));

    let err = solver().present(&request).await.unwrap_err();
    assert!(matches!(err, SolverError::ConfigDecode(_)));
}

#[tokio::test]
async fn test_present_missing_secret_key() {
    let mock_server = MockServer::start().await;
    mount_no_calls(&mock_server).await;

    let mut request = challenge_request(&mock_server.uri(), "token");
    request.config = Some(serde_json::json!({
        "endpoint": mock_server.uri(),
        "applicationKey": "app-key",
        "applicationSecretRef": { "name": "ovh-credentials", "key": "wrong" },
        "consumerKey": "consumer-key"
    }));

    let err = solver().clean_up(&request).await.unwrap_err();
    assert!(matches!(err, SolverError::SecretKeyMissing { .. }));
}

#[tokio::test]
async fn test_present_not_initialized() {
    let mock_server = MockServer::start().await;
    mount_no_calls(&mock_server).await;

    let request = challenge_request(&mock_server.uri(), "token");
    let err = OvhSolver::new().present(&request).await.unwrap_err();

    assert!(matches!(err, SolverError::NotInitialized));
}

#[tokio::test]
#[serial]
async fn test_present_with_ambient_credentials() {
    let mock_server = MockServer::start().await;
    let zone = FakeZone::new(TEST_ZONE);
    zone.mount(&mock_server).await;

    std::env::set_var("OVH_APPLICATION_KEY", "env-app-key");
    std::env::set_var("OVH_APPLICATION_SECRET", "env-app-secret");
    std::env::set_var("OVH_CONSUMER_KEY", "env-consumer-key");

    let mut request = challenge_request(&mock_server.uri(), "token");
    request.allow_ambient_credentials = true;
    request.config = Some(serde_json::json!({ "endpoint": mock_server.uri() }));

    // no secret store needed when no secret is referenced
    let result = OvhSolver::new()
        .with_config_paths(Vec::new())
        .present(&request)
        .await;

    std::env::remove_var("OVH_APPLICATION_KEY");
    std::env::remove_var("OVH_APPLICATION_SECRET");
    std::env::remove_var("OVH_CONSUMER_KEY");

    result.unwrap();
    assert_eq!(zone.records().len(), 1);
}

#[tokio::test]
#[serial]
async fn test_ambient_credentials_still_need_application_key() {
    let mock_server = MockServer::start().await;
    mount_no_calls(&mock_server).await;

    std::env::remove_var("OVH_APPLICATION_KEY");
    std::env::remove_var("OVH_APPLICATION_SECRET");

    let mut request = challenge_request(&mock_server.uri(), "token");
    request.allow_ambient_credentials = true;
    request.config = None;

    let err = OvhSolver::new()
        .with_config_paths(Vec::new())
        .present(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, SolverError::ClientConfig(_)));
}

#[tokio::test]
#[serial]
async fn test_present_with_config_file_credentials() {
    let mock_server = MockServer::start().await;
    let zone = FakeZone::new(TEST_ZONE);
    zone.mount(&mock_server).await;

    for var in [
        "OVH_ENDPOINT",
        "OVH_APPLICATION_KEY",
        "OVH_APPLICATION_SECRET",
        "OVH_CONSUMER_KEY",
    ] {
        std::env::remove_var(var);
    }

    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("ovh.conf");
    std::fs::write(
        &conf,
        format!(
            "[default]\nendpoint={uri}\n\n[{uri}]\napplication_key=file-key\napplication_secret=file-secret\nconsumer_key=file-consumer\n",
            uri = mock_server.uri()
        ),
    )
    .unwrap();

    let mut request = challenge_request(&mock_server.uri(), "token");
    request.allow_ambient_credentials = true;
    request.config = None;

    OvhSolver::new()
        .with_config_paths(vec![conf])
        .present(&request)
        .await
        .unwrap();

    let records = zone.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target, "token");
}

#[tokio::test]
#[serial]
async fn test_config_file_ignored_without_ambient_credentials() {
    let mock_server = MockServer::start().await;
    mount_no_calls(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("ovh.conf");
    std::fs::write(&conf, "[ovh-eu]\napplication_key=file-key\n").unwrap();

    let mut request = challenge_request(&mock_server.uri(), "token");
    request.config = None;

    let err = OvhSolver::with_secret_store(default_secret_store())
        .with_config_paths(vec![conf])
        .present(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, SolverError::ConfigValidation { field: "endpoint" }));
}
