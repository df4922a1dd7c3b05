// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ovh-webhook - cert-manager DNS-01 webhook solver for OVH
//!
//! Presents and cleans up ACME DNS-01 challenge TXT records in OVH DNS zones.
//!
//! # Features
//!
//! - cert-manager webhook API (`acme.cert-manager.io/v1alpha1` ChallengePayload)
//! - Signed OVH API client with endpoint aliases and clock-offset handling
//! - OVH credentials resolved per challenge from Kubernetes Secrets
//! - Targeted cleanup: only records whose value matches the challenge key are removed
//! - Prometheus metrics integration
//!
//! # Usage
//!
//! ## As a Library
//!
//! ```rust,no_run
//! use ovh_webhook::{ChallengeRequest, OvhSolver, Solver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut solver = OvhSolver::new();
//!     solver.initialize(kube::Config::infer().await?).await?;
//!
//!     let request = ChallengeRequest {
//!         resolved_fqdn: "_acme-challenge.example.com.".to_string(),
//!         resolved_zone: "example.com.".to_string(),
//!         key: "challenge-token".to_string(),
//!         resource_namespace: "cert-manager".to_string(),
//!         config: Some(serde_json::json!({
//!             "endpoint": "ovh-eu",
//!             "applicationKey": "app-key",
//!             "applicationSecretRef": { "name": "ovh-credentials", "key": "applicationSecret" },
//!             "consumerKey": "consumer-key"
//!         })),
//!         ..Default::default()
//!     };
//!
//!     solver.present(&request).await?;
//!     solver.clean_up(&request).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## As a Binary
//!
//! ```bash
//! GROUP_NAME=acme.example.com ovh-webhook
//! ```
//!
//! ## Subdomain computation
//!
//! ```rust
//! use ovh_webhook::solver::sub_domain;
//!
//! assert_eq!(
//!     sub_domain("example.com.", "_acme-challenge.sub.example.com."),
//!     "_acme-challenge.sub"
//! );
//! ```

// Re-export public modules
pub mod challenge;
pub mod config;
pub mod credentials;
pub mod metrics;
pub mod middleware;
pub mod ovh;
pub mod solver;
pub mod tls;
pub mod types;
pub mod webhook;
pub mod zone;

// Re-export commonly used types

// Solver
pub use solver::{OvhSolver, Solver, SOLVER_NAME};

// Error types
pub use types::{ApiError, AppState, ErrorResponse, SolverError, SolverResult};

// Webhook payload types
pub use challenge::{ChallengeAction, ChallengePayload, ChallengeRequest, ChallengeResponse};

// Configuration
pub use config::{OvhProviderConfig, SecretKeySelector};

// OVH client and zone records
pub use ovh::{OvhClient, OvhConfigFiles, OvhCredentials};
pub use zone::{ZoneRecord, ZoneStatus};

#[cfg(test)]
mod solver_test;
#[cfg(test)]
mod test_support;
