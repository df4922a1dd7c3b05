// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-issuer OVH solver configuration
//!
//! cert-manager passes the `config` block of the issuer's webhook solver
//! through to us untouched. This module decodes it into [`OvhProviderConfig`]
//! and checks that everything needed to talk to OVH is present when ambient
//! credentials are not allowed.
//!
//! Example issuer configuration:
//!
//! ```yaml
//! config:
//!   endpoint: ovh-eu
//!   applicationKey: my-app-key
//!   applicationSecretRef:
//!     name: ovh-credentials
//!     key: applicationSecret
//!   consumerKey: my-consumer-key
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{SolverError, SolverResult};

/// Reference to a single key inside a namespaced Kubernetes Secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecretKeySelector {
    /// Secret name (empty means no secret configured)
    #[serde(default)]
    pub name: String,

    /// Key inside the secret's data map
    #[serde(default)]
    pub key: String,
}

/// Decoded solver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OvhProviderConfig {
    /// OVH endpoint name (e.g., "ovh-eu") or base URL
    #[serde(default)]
    pub endpoint: String,

    /// OVH application key
    #[serde(default)]
    pub application_key: String,

    /// Secret holding the OVH application secret
    #[serde(default)]
    pub application_secret_ref: SecretKeySelector,

    /// OVH consumer key
    #[serde(default)]
    pub consumer_key: String,
}

/// Decode the raw solver configuration
///
/// A missing (or `null`) configuration is the base case and yields an empty
/// config; validation is left to [`validate`].
///
/// # Errors
///
/// Returns [`SolverError::ConfigDecode`] if the payload is not a valid config object.
pub fn load_config(raw: Option<&Value>) -> SolverResult<OvhProviderConfig> {
    match raw {
        None | Some(Value::Null) => Ok(OvhProviderConfig::default()),
        Some(value) => Ok(OvhProviderConfig::deserialize(value)?),
    }
}

/// Check that all required fields are set
///
/// When `allow_ambient_credentials` is true nothing is checked: the OVH client
/// fills missing values from the environment instead.
///
/// # Errors
///
/// Returns [`SolverError::ConfigValidation`] naming the first missing field.
pub fn validate(cfg: &OvhProviderConfig, allow_ambient_credentials: bool) -> SolverResult<()> {
    if allow_ambient_credentials {
        return Ok(());
    }

    let required = [
        ("endpoint", cfg.endpoint.as_str()),
        ("application key", cfg.application_key.as_str()),
        ("application secret", cfg.application_secret_ref.name.as_str()),
        ("consumer key", cfg.consumer_key.as_str()),
    ];

    match required.iter().find(|(_, value)| value.is_empty()) {
        Some(&(field, _)) => Err(SolverError::ConfigValidation { field }),
        None => Ok(()),
    }
}
