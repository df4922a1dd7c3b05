// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes Secret lookup for OVH credentials
//!
//! The OVH application secret never travels in the issuer config itself; the
//! config only references a key in a Secret living in the challenge's resource
//! namespace. This module fetches that Secret on every call (no caching, so a
//! rotated secret is picked up on the next challenge).

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

use crate::{
    config::SecretKeySelector,
    types::{SolverError, SolverResult},
};

/// Read access to namespaced secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the data map of secret `name` in `namespace`
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::SecretNotFound`] if the secret does not exist and
    /// [`SolverError::CredentialStore`] for any other failure.
    async fn get_secret(&self, namespace: &str, name: &str)
        -> SolverResult<BTreeMap<String, Vec<u8>>>;
}

/// [`SecretStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> SolverResult<BTreeMap<String, Vec<u8>>> {
        let secret_api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        let secret = secret_api.get(name).await.map_err(|e| match e {
            kube::Error::Api(ref response) if response.code == 404 => SolverError::SecretNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            other => SolverError::CredentialStore(format!(
                "failed to get secret {name} in namespace {namespace}: {other}"
            )),
        })?;

        // Convert ByteString to Vec<u8>
        let data = secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.0))
            .collect();

        Ok(data)
    }
}

/// Resolve the value referenced by `selector` in `namespace`
///
/// An empty selector name means no secret is configured and resolves to an
/// empty string.
///
/// # Errors
///
/// Returns [`SolverError::SecretNotFound`] when the secret is missing and
/// [`SolverError::SecretKeyMissing`] when it lacks the requested key.
pub async fn resolve_secret(
    store: &dyn SecretStore,
    selector: &SecretKeySelector,
    namespace: &str,
) -> SolverResult<String> {
    if selector.name.is_empty() {
        return Ok(String::new());
    }

    debug!(
        "resolving key {} from secret {}/{}",
        selector.key, namespace, selector.name
    );

    let data = store.get_secret(namespace, &selector.name).await?;

    let bytes = data
        .get(&selector.key)
        .ok_or_else(|| SolverError::SecretKeyMissing {
            key: selector.key.clone(),
            namespace: namespace.to_string(),
            name: selector.name.clone(),
        })?;

    Ok(String::from_utf8_lossy(bytes).into_owned())
}
