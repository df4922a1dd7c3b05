// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS-01 challenge solver for OVH
//!
//! [`OvhSolver`] implements the [`Solver`] contract cert-manager expects from a
//! webhook: a name, one-time initialization, and the `present`/`clean_up`
//! lifecycle calls. Every call decodes the issuer config, resolves the
//! application secret and builds a fresh [`OvhClient`], so credential rotation
//! never requires a restart.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    challenge::ChallengeRequest,
    config,
    credentials::{self, KubeSecretStore, SecretStore},
    ovh::{self, OvhClient, OvhCredentials, DEFAULT_TIMEOUT_SECS},
    types::{SolverError, SolverResult},
    zone,
};

/// Name of this solver, referenced as `solverName` on the issuer
pub const SOLVER_NAME: &str = "ovh";

/// Operations a cert-manager DNS-01 webhook solver provides
#[async_trait]
pub trait Solver: Send + Sync {
    /// Solver name, unique within the webhook's API group
    fn name(&self) -> &str;

    /// Build the cluster client used for secret lookups
    async fn initialize(&mut self, kube_config: kube::Config) -> SolverResult<()>;

    /// Whether [`Solver::initialize`] has completed
    fn is_ready(&self) -> bool;

    /// Create the challenge TXT record
    ///
    /// May be called several times with the same request.
    async fn present(&self, ch: &ChallengeRequest) -> SolverResult<()>;

    /// Delete the challenge TXT record matching `ch.key`
    async fn clean_up(&self, ch: &ChallengeRequest) -> SolverResult<()>;
}

/// OVH implementation of [`Solver`]
#[derive(Clone)]
pub struct OvhSolver {
    secrets: Option<Arc<dyn SecretStore>>,
    timeout: Duration,
    /// `ovh.conf` files consulted for ambient credentials
    config_paths: Vec<PathBuf>,
}

impl Default for OvhSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl OvhSolver {
    /// Create an uninitialized solver
    pub fn new() -> Self {
        Self {
            secrets: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            config_paths: ovh::default_config_paths(),
        }
    }

    /// Create a solver reading secrets from `store`
    pub fn with_secret_store(store: Arc<dyn SecretStore>) -> Self {
        Self {
            secrets: Some(store),
            ..Self::new()
        }
    }

    /// Set the OVH request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the `ovh.conf` locations used for ambient credentials
    pub fn with_config_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config_paths = paths;
        self
    }

    /// Build an OVH client from the challenge's config and referenced secret
    pub async fn ovh_client(&self, ch: &ChallengeRequest) -> SolverResult<OvhClient> {
        let cfg = config::load_config(ch.config.as_ref())?;
        config::validate(&cfg, ch.allow_ambient_credentials)?;

        let application_secret = match self.secrets.as_deref() {
            Some(store) => {
                credentials::resolve_secret(
                    store,
                    &cfg.application_secret_ref,
                    &ch.resource_namespace,
                )
                .await?
            }
            None if cfg.application_secret_ref.name.is_empty() => String::new(),
            None => return Err(SolverError::NotInitialized),
        };

        let credentials = OvhCredentials {
            endpoint: cfg.endpoint,
            application_key: cfg.application_key,
            application_secret,
            consumer_key: cfg.consumer_key,
        };
        let credentials = if ch.allow_ambient_credentials {
            credentials.with_ambient_fallback(&self.config_paths)?
        } else {
            credentials
        };

        OvhClient::new(credentials, self.timeout)
    }
}

#[async_trait]
impl Solver for OvhSolver {
    fn name(&self) -> &str {
        SOLVER_NAME
    }

    async fn initialize(&mut self, kube_config: kube::Config) -> SolverResult<()> {
        let client = kube::Client::try_from(kube_config).map_err(|e| {
            SolverError::CredentialStore(format!("failed to create kubernetes client: {}", e))
        })?;

        self.secrets = Some(Arc::new(KubeSecretStore::new(client)));
        info!("{} solver initialized", SOLVER_NAME);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.secrets.is_some()
    }

    async fn present(&self, ch: &ChallengeRequest) -> SolverResult<()> {
        let client = self.ovh_client(ch).await?;
        let domain = un_fqdn(&ch.resolved_zone);
        let sub_domain = sub_domain(domain, &ch.resolved_fqdn);

        debug!("presenting TXT record {} in zone {}", sub_domain, domain);
        zone::add_txt_record(&client, domain, &sub_domain, &ch.key).await
    }

    async fn clean_up(&self, ch: &ChallengeRequest) -> SolverResult<()> {
        let client = self.ovh_client(ch).await?;
        let domain = un_fqdn(&ch.resolved_zone);
        let sub_domain = sub_domain(domain, &ch.resolved_fqdn);

        debug!("cleaning up TXT record {} in zone {}", sub_domain, domain);
        zone::remove_txt_record(&client, domain, &sub_domain, &ch.key).await
    }
}

/// Strip the trailing root dot from a domain name
pub fn un_fqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Record label of `fqdn` relative to `domain`
///
/// Everything before the first `"." + domain` in `fqdn`; when `fqdn` does not
/// contain the zone, the un-rooted `fqdn` itself.
pub fn sub_domain(domain: &str, fqdn: &str) -> String {
    let domain = un_fqdn(domain);
    match fqdn.find(&format!(".{}", domain)) {
        Some(idx) => fqdn[..idx].to_string(),
        None => un_fqdn(fqdn).to_string(),
    }
}
