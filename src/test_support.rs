// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests: an in-memory secret store and a fake OVH
//! zone served through wiremock.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Match, Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::{
    challenge::ChallengeRequest,
    credentials::SecretStore,
    ovh,
    types::{SolverError, SolverResult},
    zone::ZoneRecord,
};

pub const TEST_NAMESPACE: &str = "cert-manager";
pub const TEST_SECRET_NAME: &str = "ovh-credentials";
pub const TEST_SECRET_KEY: &str = "applicationSecret";
pub const TEST_ZONE: &str = "example.com";

/// Secret store backed by a map of `(namespace, name)` to secret data
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: BTreeMap<(String, String), BTreeMap<String, Vec<u8>>>,
}

impl InMemorySecretStore {
    pub fn with_secret(mut self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        let data = data
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect();
        self.secrets
            .insert((namespace.to_string(), name.to_string()), data);
        self
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> SolverResult<BTreeMap<String, Vec<u8>>> {
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SolverError::SecretNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}

/// Matches requests whose `X-Ovh-Signature` is valid for the URL, body and
/// timestamp actually received
///
/// wiremock rewrites the request authority, so the signed URL is rebuilt from
/// `base_url` plus the received path and raw query.
pub struct ValidSignature {
    pub base_url: String,
    pub application_secret: String,
    pub consumer_key: String,
}

impl ValidSignature {
    pub fn new(server: &MockServer, application_secret: &str, consumer_key: &str) -> Self {
        Self {
            base_url: server.uri(),
            application_secret: application_secret.to_string(),
            consumer_key: consumer_key.to_string(),
        }
    }
}

impl Match for ValidSignature {
    fn matches(&self, request: &Request) -> bool {
        let header = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let (Some(signature), Some(timestamp), Some(consumer)) = (
            header("X-Ovh-Signature"),
            header("X-Ovh-Timestamp"),
            header("X-Ovh-Consumer"),
        ) else {
            return false;
        };
        let Ok(timestamp) = timestamp.parse::<i64>() else {
            return false;
        };

        let mut url = format!("{}{}", self.base_url, request.url.path());
        if let Some(query) = request.url.query() {
            url.push('?');
            url.push_str(query);
        }
        let body = String::from_utf8_lossy(&request.body);

        consumer == self.consumer_key
            && signature
                == ovh::sign(
                    &self.application_secret,
                    &self.consumer_key,
                    request.method.as_str(),
                    &url,
                    &body,
                    timestamp,
                )
    }
}

/// Secret store holding the default test credentials
pub fn default_secret_store() -> Arc<InMemorySecretStore> {
    Arc::new(InMemorySecretStore::default().with_secret(
        TEST_NAMESPACE,
        TEST_SECRET_NAME,
        &[(TEST_SECRET_KEY, "app-secret")],
    ))
}

/// Challenge request whose config points at `endpoint`
pub fn challenge_request(endpoint: &str, key: &str) -> ChallengeRequest {
    ChallengeRequest {
        uid: "test-uid".to_string(),
        challenge_type: "dns-01".to_string(),
        dns_name: TEST_ZONE.to_string(),
        key: key.to_string(),
        resource_namespace: TEST_NAMESPACE.to_string(),
        resolved_fqdn: format!("_acme-challenge.{}.", TEST_ZONE),
        resolved_zone: format!("{}.", TEST_ZONE),
        allow_ambient_credentials: false,
        config: Some(serde_json::json!({
            "endpoint": endpoint,
            "applicationKey": "app-key",
            "applicationSecretRef": { "name": TEST_SECRET_NAME, "key": TEST_SECRET_KEY },
            "consumerKey": "consumer-key"
        })),
        ..Default::default()
    }
}

/// Mount a `/auth/time` mock answering with the current time
pub async fn mount_auth_time(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chrono::Utc::now().timestamp()))
        .mount(server)
        .await;
}

#[derive(Default)]
struct FakeZoneState {
    deployed: bool,
    next_id: i64,
    records: BTreeMap<i64, ZoneRecord>,
    refreshes: usize,
}

/// Stateful stand-in for an OVH zone's record API
#[derive(Clone)]
pub struct FakeZone {
    domain: String,
    state: Arc<Mutex<FakeZoneState>>,
}

impl FakeZone {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            state: Arc::new(Mutex::new(FakeZoneState {
                deployed: true,
                next_id: 1,
                ..Default::default()
            })),
        }
    }

    /// Mount the fake zone (and `/auth/time`) on `server`
    pub async fn mount(&self, server: &MockServer) {
        mount_auth_time(server).await;
        Mock::given(path_regex(format!("^/domain/zone/{}/", self.domain)))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    pub fn set_deployed(&self, deployed: bool) {
        self.state.lock().unwrap().deployed = deployed;
    }

    pub fn insert(&self, sub_domain: &str, target: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.records.insert(
            id,
            ZoneRecord {
                id: Some(id),
                field_type: "TXT".to_string(),
                sub_domain: sub_domain.to_string(),
                target: target.to_string(),
                ttl: Some(60),
            },
        );
        id
    }

    pub fn records(&self) -> Vec<ZoneRecord> {
        self.state.lock().unwrap().records.values().cloned().collect()
    }

    pub fn refreshes(&self) -> usize {
        self.state.lock().unwrap().refreshes
    }
}

impl Respond for FakeZone {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let prefix = format!("/domain/zone/{}", self.domain);
        let rest = match request.url.path().strip_prefix(&prefix) {
            Some(rest) => rest.to_string(),
            None => return ResponseTemplate::new(404),
        };
        let mut state = self.state.lock().unwrap();

        match (request.method.as_str(), rest.as_str()) {
            ("GET", "/status") => ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "isDeployed": state.deployed })),
            ("GET", "/record") => {
                let query: BTreeMap<String, String> =
                    request.url.query_pairs().into_owned().collect();
                let ids: Vec<i64> = state
                    .records
                    .values()
                    .filter(|r| query.get("fieldType").map_or(true, |t| *t == r.field_type))
                    .filter(|r| query.get("subDomain").map_or(true, |s| *s == r.sub_domain))
                    .filter_map(|r| r.id)
                    .collect();
                ResponseTemplate::new(200).set_body_json(ids)
            }
            ("POST", "/record") => match serde_json::from_slice::<ZoneRecord>(&request.body) {
                Ok(mut record) => {
                    let id = state.next_id;
                    state.next_id += 1;
                    record.id = Some(id);
                    state.records.insert(id, record.clone());
                    ResponseTemplate::new(200).set_body_json(record)
                }
                Err(_) => ResponseTemplate::new(400),
            },
            ("POST", "/refresh") => {
                state.refreshes += 1;
                ResponseTemplate::new(200)
            }
            (verb, other) => {
                let id = other
                    .strip_prefix("/record/")
                    .and_then(|id| id.parse::<i64>().ok());
                match (verb, id) {
                    ("GET", Some(id)) => match state.records.get(&id) {
                        Some(record) => ResponseTemplate::new(200).set_body_json(record),
                        None => ResponseTemplate::new(404),
                    },
                    ("DELETE", Some(id)) => match state.records.remove(&id) {
                        Some(_) => ResponseTemplate::new(200).set_body_string("null"),
                        None => ResponseTemplate::new(404),
                    },
                    _ => ResponseTemplate::new(404),
                }
            }
        }
    }
}
