// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Minimal signed client for the OVH REST API
//!
//! Only what the zone operations in [`crate::zone`] need: JSON GET/POST/DELETE
//! with OVH's application/consumer key signing scheme.
//!
//! # Signing
//!
//! Authenticated calls carry `X-Ovh-Consumer`, `X-Ovh-Timestamp` and
//! `X-Ovh-Signature`, where the signature is
//! `"$1$" + hex(sha1(secret + consumer + method + url + body + timestamp))`
//! joined with `+`. The timestamp must track OVH's clock, so the first signed
//! call fetches `/auth/time` and keeps the offset for the lifetime of the client.
//!
//! # Ambient credentials
//!
//! Empty credential fields can be filled from `OVH_*` environment variables and
//! then from `ovh.conf` INI files (`/etc/ovh.conf`, `~/.ovh.conf`, `./ovh.conf`,
//! later files taking precedence). The endpoint comes from `[default] endpoint`
//! and the keys from the section named after the endpoint.

use ini::Ini;
use reqwest::{header, Method, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::{
    metrics,
    types::{SolverError, SolverResult},
};

/// Endpoint used when neither config nor environment names one
pub const DEFAULT_ENDPOINT: &str = "ovh-eu";

/// Default request timeout for OVH API calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Known OVH API endpoints
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// Resolve an endpoint name or URL to an API base URL
///
/// # Errors
///
/// Returns [`SolverError::ClientConfig`] for unknown endpoint names.
pub fn resolve_endpoint(endpoint: &str) -> SolverResult<String> {
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        return Ok(endpoint.trim_end_matches('/').to_string());
    }

    ENDPOINTS
        .iter()
        .find(|(name, _)| *name == endpoint)
        .map(|(_, url)| (*url).to_string())
        .ok_or_else(|| SolverError::ClientConfig(format!("unknown endpoint '{}'", endpoint)))
}

/// Credentials used to build an [`OvhClient`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OvhCredentials {
    pub endpoint: String,
    pub application_key: String,
    pub application_secret: String,
    pub consumer_key: String,
}

impl OvhCredentials {
    /// Fill empty fields from the process environment, then from `ovh.conf` files
    ///
    /// Environment variables:
    /// - `OVH_ENDPOINT`
    /// - `OVH_APPLICATION_KEY`
    /// - `OVH_APPLICATION_SECRET`
    /// - `OVH_CONSUMER_KEY`
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ClientConfig`] if an existing config file cannot be parsed.
    pub fn with_ambient_fallback(self, config_paths: &[PathBuf]) -> SolverResult<Self> {
        let files = OvhConfigFiles::load(config_paths)?;
        Ok(self
            .fill_from(|name| std::env::var(name).ok())
            .fill_from_config(&files))
    }

    /// Fill empty fields using `lookup`
    pub fn fill_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            (&mut self.endpoint, "OVH_ENDPOINT"),
            (&mut self.application_key, "OVH_APPLICATION_KEY"),
            (&mut self.application_secret, "OVH_APPLICATION_SECRET"),
            (&mut self.consumer_key, "OVH_CONSUMER_KEY"),
        ];

        for (field, var) in fields {
            if field.is_empty() {
                if let Some(value) = lookup(var) {
                    *field = value;
                }
            }
        }

        self
    }

    /// Fill empty fields from `ovh.conf` files
    ///
    /// An endpoint missing everywhere becomes [`DEFAULT_ENDPOINT`] so its
    /// section can still supply the keys.
    pub fn fill_from_config(mut self, files: &OvhConfigFiles) -> Self {
        if self.endpoint.is_empty() {
            self.endpoint = files
                .get("default", "endpoint")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        }

        let section = self.endpoint.clone();
        let fields = [
            (&mut self.application_key, "application_key"),
            (&mut self.application_secret, "application_secret"),
            (&mut self.consumer_key, "consumer_key"),
        ];

        for (field, key) in fields {
            if field.is_empty() {
                if let Some(value) = files.get(&section, key) {
                    *field = value;
                }
            }
        }

        self
    }
}

/// Standard `ovh.conf` locations, lowest precedence first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/ovh.conf")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".ovh.conf"));
    }
    paths.push(PathBuf::from("ovh.conf"));
    paths
}

/// Parsed `ovh.conf` files, highest precedence first
#[derive(Debug, Default)]
pub struct OvhConfigFiles {
    files: Vec<Ini>,
}

impl OvhConfigFiles {
    /// Load the files in `paths` that exist; later paths take precedence
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ClientConfig`] if an existing file is not valid INI.
    pub fn load(paths: &[PathBuf]) -> SolverResult<Self> {
        let mut files = Vec::new();

        for path in paths.iter().rev() {
            if !path.is_file() {
                continue;
            }

            let ini = Ini::load_from_file(path).map_err(|e| {
                SolverError::ClientConfig(format!("failed to read {}: {}", path.display(), e))
            })?;
            debug!("loaded OVH config file {}", path.display());
            files.push(ini);
        }

        Ok(Self { files })
    }

    /// Look up `key` in `section`
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.files
            .iter()
            .find_map(|ini| ini.get_from(Some(section), key))
            .map(str::to_string)
    }
}

/// OVH API error body
#[derive(Debug, Deserialize)]
struct OvhErrorBody {
    message: String,
}

/// Signed OVH API client
pub struct OvhClient {
    base_url: String,
    application_key: String,
    application_secret: String,
    consumer_key: String,
    http: reqwest::Client,
    /// Server time minus local time, in seconds
    time_delta: OnceCell<i64>,
}

impl std::fmt::Debug for OvhClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OvhClient")
            .field("base_url", &self.base_url)
            .field("application_key", &self.application_key)
            .finish_non_exhaustive()
    }
}

impl OvhClient {
    /// Create a new OVH client
    ///
    /// An empty endpoint defaults to [`DEFAULT_ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ClientConfig`] if the endpoint is unknown, the
    /// application key or secret is missing, or the HTTP client cannot be built.
    pub fn new(credentials: OvhCredentials, timeout: Duration) -> SolverResult<Self> {
        let endpoint = if credentials.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            credentials.endpoint.as_str()
        };
        let base_url = resolve_endpoint(endpoint)?;

        if credentials.application_key.is_empty() {
            return Err(SolverError::ClientConfig(
                "missing application key".to_string(),
            ));
        }
        if credentials.application_secret.is_empty() {
            return Err(SolverError::ClientConfig(
                "missing application secret".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SolverError::ClientConfig(format!("failed to create HTTP client: {}", e)))?;

        debug!("created OVH client for {}", base_url);

        Ok(Self {
            base_url,
            application_key: credentials.application_key,
            application_secret: credentials.application_secret,
            consumer_key: credentials.consumer_key,
            http,
            time_delta: OnceCell::new(),
        })
    }

    /// API base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON response
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> SolverResult<T> {
        self.call(Method::GET, path, &[], None::<&()>).await
    }

    /// GET `path` with URL-encoded `query` parameters
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> SolverResult<T> {
        self.call(Method::GET, path, query, None::<&()>).await
    }

    /// POST `body` (if any) to `path` and decode the JSON response
    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> SolverResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::POST, path, &[], body).await
    }

    /// DELETE `path` and decode the JSON response
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> SolverResult<T> {
        self.call(Method::DELETE, path, &[], None::<&()>).await
    }

    async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> SolverResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let result = self.send(&method, path, query, body).await;
        metrics::record_ovh_api_call(
            method.as_str(),
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );

        result.map_err(|message| {
            error!("OVH API call failed: {} {} - {}", method, path, message);
            SolverError::RemoteApi {
                method: method.to_string(),
                path: path.to_string(),
                message,
            }
        })
    }

    async fn send<B, T>(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, String>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // the signature covers the exact URL sent, query encoding included
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| format!("invalid URL: {}", e))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let body = match body {
            Some(body) => serde_json::to_string(body).map_err(|e| e.to_string())?,
            None => String::new(),
        };

        debug!("OVH API call: {} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(header::ACCEPT, "application/json")
            .header("X-Ovh-Application", &self.application_key);

        if !body.is_empty() {
            request = request
                .header(header::CONTENT_TYPE, "application/json;charset=utf-8")
                .body(body.clone());
        }

        if !self.consumer_key.is_empty() {
            let timestamp = chrono::Utc::now().timestamp() + self.time_delta().await?;
            let signature = sign(
                &self.application_secret,
                &self.consumer_key,
                method.as_str(),
                url.as_str(),
                &body,
                timestamp,
            );
            request = request
                .header("X-Ovh-Consumer", &self.consumer_key)
                .header("X-Ovh-Timestamp", timestamp.to_string())
                .header("X-Ovh-Signature", signature);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            let message = serde_json::from_str::<OvhErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            return Err(format!("HTTP {} - {}", status, message));
        }

        // DELETE and refresh answer with an empty body or `null`
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| format!("invalid response body: {}", e))
    }

    /// Offset between OVH's clock and ours, fetched once per client
    async fn time_delta(&self) -> Result<i64, String> {
        self.time_delta
            .get_or_try_init(|| async {
                let url = format!("{}/auth/time", self.base_url);
                let response = self
                    .http
                    .get(&url)
                    .header(header::ACCEPT, "application/json")
                    .send()
                    .await
                    .map_err(|e| format!("failed to fetch OVH server time: {}", e))?;

                if !response.status().is_success() {
                    return Err(format!(
                        "failed to fetch OVH server time: HTTP {}",
                        response.status()
                    ));
                }

                let server_time: i64 = response
                    .json()
                    .await
                    .map_err(|e| format!("invalid OVH server time: {}", e))?;
                let delta = server_time - chrono::Utc::now().timestamp();
                debug!("OVH clock delta: {}s", delta);
                Ok::<i64, String>(delta)
            })
            .await
            .copied()
    }
}

/// Compute the `X-Ovh-Signature` header value
pub fn sign(
    application_secret: &str,
    consumer_key: &str,
    method: &str,
    url: &str,
    body: &str,
    timestamp: i64,
) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!(
        "{}+{}+{}+{}+{}+{}",
        application_secret, consumer_key, method, url, body, timestamp
    ));
    format!("$1${:x}", hasher.finalize())
}
