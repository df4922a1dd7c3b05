// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! cert-manager webhook API types (`acme.cert-manager.io/v1alpha1`)
//!
//! cert-manager talks to DNS-01 webhooks by creating a `ChallengePayload`
//! resource whose `request` describes the challenge. The webhook answers with
//! the same kind, filling in `response`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API version of the webhook payloads
pub const API_VERSION: &str = "acme.cert-manager.io/v1alpha1";

/// Kind of the webhook payloads
pub const KIND_CHALLENGE_PAYLOAD: &str = "ChallengePayload";

/// Challenge action requested by cert-manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChallengeAction {
    Present,
    CleanUp,
}

impl ChallengeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeAction::Present => "present",
            ChallengeAction::CleanUp => "cleanup",
        }
    }
}

/// Description of a single DNS-01 challenge
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// Unique identifier of this request, echoed in the response
    #[serde(default)]
    pub uid: String,

    /// Requested action; unknown values are left as `None`
    #[serde(default, deserialize_with = "lenient_action")]
    pub action: Option<ChallengeAction>,

    /// Challenge type (always "dns-01")
    #[serde(default, rename = "type")]
    pub challenge_type: String,

    /// Name being validated (e.g., "example.com" or "*.example.com")
    #[serde(default)]
    pub dns_name: String,

    /// Expected TXT record value
    #[serde(default)]
    pub key: String,

    /// Namespace used to look up referenced secrets
    #[serde(default)]
    pub resource_namespace: String,

    /// Fully qualified record name (e.g., "_acme-challenge.example.com.")
    #[serde(default, rename = "resolvedFQDN")]
    pub resolved_fqdn: String,

    /// Zone owning the record (e.g., "example.com.")
    #[serde(default)]
    pub resolved_zone: String,

    /// Whether credentials may be sourced from the environment
    #[serde(default)]
    pub allow_ambient_credentials: bool,

    /// Opaque solver configuration from the issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

fn lenient_action<'de, D>(deserializer: D) -> Result<Option<ChallengeAction>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("Present") => Some(ChallengeAction::Present),
        Some("CleanUp") => Some(ChallengeAction::CleanUp),
        _ => None,
    })
}

/// Failure details attached to a challenge response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChallengeStatus {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default)]
    pub code: u16,
}

/// Result of a challenge request
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChallengeResponse {
    pub uid: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChallengeStatus>,
}

impl ChallengeResponse {
    pub fn success(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            success: true,
            status: None,
        }
    }

    pub fn failure(uid: &str, message: String) -> Self {
        Self {
            uid: uid.to_string(),
            success: false,
            status: Some(ChallengeStatus {
                status: "Failure".to_string(),
                message,
                reason: "InternalError".to_string(),
                code: 500,
            }),
        }
    }
}

/// Envelope exchanged with cert-manager
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePayload {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ChallengeRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChallengeResponse>,
}

impl ChallengePayload {
    /// Wrap a response in a payload envelope
    pub fn from_response(response: ChallengeResponse) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND_CHALLENGE_PAYLOAD.to_string(),
            request: None,
            response: Some(response),
        }
    }
}
