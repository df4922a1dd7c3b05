// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common types and errors used throughout the ovh-webhook library

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::solver::Solver;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// DNS-01 solver served by this webhook
    pub solver: Arc<dyn Solver>,
    /// API group the webhook is registered under (GROUP_NAME)
    pub group_name: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Result type for solver operations
pub type SolverResult<T> = Result<T, SolverError>;

/// Errors raised while presenting or cleaning up a challenge record
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("error decoding OVH config: {0}")]
    ConfigDecode(#[from] serde_json::Error),

    #[error("no {field} provided in OVH config")]
    ConfigValidation { field: &'static str },

    #[error("secret '{namespace}/{name}' not found")]
    SecretNotFound { namespace: String, name: String },

    #[error("key not found {key:?} in secret '{namespace}/{name}'")]
    SecretKeyMissing {
        key: String,
        namespace: String,
        name: String,
    },

    #[error("credential store error: {0}")]
    CredentialStore(String),

    #[error("OVH zone not deployed for domain {domain}")]
    ZoneNotDeployed { domain: String },

    #[error("OVH API call failed: {method} {path} - {message}")]
    RemoteApi {
        method: String,
        path: String,
        message: String,
    },

    #[error("invalid OVH client configuration: {0}")]
    ClientConfig(String),

    #[error("solver has not been initialized")]
    NotInitialized,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details: None,
        });

        (status, body).into_response()
    }
}
