// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Webhook HTTP API handlers
//!
//! cert-manager reaches the solver through the Kubernetes API aggregation
//! layer. This module implements that surface:
//! - `POST /apis/{group}/v1alpha1/{solver}` runs a challenge action
//! - `GET /apis/{group}/v1alpha1` serves API discovery
//! - Health, readiness and metrics endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    challenge::{ChallengeAction, ChallengePayload, ChallengeResponse, KIND_CHALLENGE_PAYLOAD},
    metrics, middleware,
    solver::Solver,
    types::{ApiError, AppState, ErrorResponse},
};

/// Version of the webhook API group
pub const WEBHOOK_API_VERSION: &str = "v1alpha1";

/// Default listen port
pub const DEFAULT_API_PORT: u16 = 8443;

/// Process-wide server configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// API group the webhook serves (GROUP_NAME)
    pub group_name: String,
    /// Listen port
    pub api_port: u16,
    /// OVH API request timeout in seconds
    pub ovh_timeout_secs: u64,
    /// PEM certificate chain served to the API server
    pub tls_cert_file: Option<PathBuf>,
    /// PEM private key for `tls_cert_file`
    pub tls_key_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `GROUP_NAME`: API group name (required)
    /// - `API_PORT`: Listen port (default: 8443)
    /// - `OVH_REQUEST_TIMEOUT_SECS`: OVH API timeout (default: 30)
    /// - `TLS_CERT_FILE`, `TLS_KEY_FILE`: serving certificate and key (set both
    ///   to serve HTTPS)
    pub fn from_env() -> Result<Self, String> {
        let group_name = std::env::var("GROUP_NAME").unwrap_or_default();

        let api_port = std::env::var("API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_API_PORT);

        let ovh_timeout_secs = std::env::var("OVH_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(crate::ovh::DEFAULT_TIMEOUT_SECS);

        let path_var = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        let config = Self {
            group_name,
            api_port,
            ovh_timeout_secs,
            tls_cert_file: path_var("TLS_CERT_FILE"),
            tls_key_file: path_var("TLS_KEY_FILE"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.group_name.is_empty() {
            return Err("GROUP_NAME must be specified".to_string());
        }

        if self.ovh_timeout_secs == 0 {
            return Err("OVH_REQUEST_TIMEOUT_SECS must be greater than 0".to_string());
        }

        if self.tls_cert_file.is_some() != self.tls_key_file.is_some() {
            return Err("TLS_CERT_FILE and TLS_KEY_FILE must be set together".to_string());
        }

        Ok(())
    }

    /// Certificate and key paths, when TLS is configured
    pub fn tls_files(&self) -> Option<(&std::path::Path, &std::path::Path)> {
        match (&self.tls_cert_file, &self.tls_key_file) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Readiness check response
#[derive(Serialize)]
struct ReadyResponse {
    ready: bool,
    checks: Vec<String>,
}

/// Build the webhook router for `solver` under `group_name`
pub fn router(group_name: &str, solver: Arc<dyn Solver>) -> Router {
    let state = AppState {
        solver,
        group_name: group_name.to_string(),
    };

    Router::new()
        .route("/apis/{group}/{version}", get(discovery))
        .route("/apis/{group}/{version}/{solver}", post(solve))
        .route("/healthz", get(health_check))
        .route("/readyz", get(ready_check))
        .route("/metrics", get(metrics_handler))
        .route_layer(axum_middleware::from_fn(middleware::track_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn check_group_version(state: &AppState, group: &str, version: &str) -> Result<(), ApiError> {
    if group != state.group_name || version != WEBHOOK_API_VERSION {
        return Err(ApiError::NotFound(format!("{}/{}", group, version)));
    }
    Ok(())
}

/// Run a challenge action
///
/// Solver failures are reported inside the returned payload with
/// `success: false`; the HTTP status stays `201 Created`.
pub async fn solve(
    State(state): State<AppState>,
    Path((group, version, solver_name)): Path<(String, String, String)>,
    Json(payload): Json<ChallengePayload>,
) -> Result<(StatusCode, Json<ChallengePayload>), ApiError> {
    check_group_version(&state, &group, &version)?;

    if solver_name != state.solver.name() {
        return Err(ApiError::NotFound(format!(
            "solver {} in group {}",
            solver_name, group
        )));
    }

    if !payload.kind.is_empty() && payload.kind != KIND_CHALLENGE_PAYLOAD {
        return Err(ApiError::InvalidRequest(format!(
            "unexpected kind '{}', expected {}",
            payload.kind, KIND_CHALLENGE_PAYLOAD
        )));
    }

    let request = payload
        .request
        .ok_or_else(|| ApiError::InvalidRequest("missing challenge request".to_string()))?;

    let action = request.action.ok_or_else(|| {
        ApiError::InvalidRequest(format!("unknown action for challenge {}", request.uid))
    })?;

    info!(
        "{} challenge {} for {} (zone {})",
        action.as_str(),
        request.uid,
        request.resolved_fqdn,
        request.resolved_zone
    );

    let result = match action {
        ChallengeAction::Present => state.solver.present(&request).await,
        ChallengeAction::CleanUp => state.solver.clean_up(&request).await,
    };

    metrics::record_challenge_operation(action.as_str(), result.is_ok());

    let response = match result {
        Ok(()) => {
            info!("{} challenge {} succeeded", action.as_str(), request.uid);
            ChallengeResponse::success(&request.uid)
        }
        Err(e) => {
            error!(
                "{} challenge {} failed: {}",
                action.as_str(),
                request.uid,
                e
            );
            ChallengeResponse::failure(&request.uid, e.to_string())
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(ChallengePayload::from_response(response)),
    ))
}

/// API discovery for the webhook group
pub async fn discovery(
    State(state): State<AppState>,
    Path((group, version)): Path<(String, String)>,
) -> Result<Json<APIResourceList>, ApiError> {
    check_group_version(&state, &group, &version)?;

    let name = state.solver.name().to_string();
    Ok(Json(APIResourceList {
        group_version: format!("{}/{}", state.group_name, WEBHOOK_API_VERSION),
        resources: vec![APIResource {
            name: name.clone(),
            singular_name: name,
            namespaced: false,
            kind: KIND_CHALLENGE_PAYLOAD.to_string(),
            verbs: vec!["create".to_string()],
            ..Default::default()
        }],
    }))
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint
async fn ready_check(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let ready = state.solver.is_ready();
    let checks = vec![format!("solver_{}_initialized: {}", state.solver.name(), ready)];

    if !ready {
        warn!("solver {} not initialized", state.solver.name());
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadyResponse { ready, checks }))
}

/// Metrics endpoint for Prometheus scraping
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            metrics_text,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to gather metrics: {}", e),
                details: None,
            }),
        )
            .into_response(),
    }
}
