// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TLS for the webhook listener
//!
//! The Kubernetes API server only talks to aggregated API backends over HTTPS,
//! so the webhook serves the certificate mounted for its Service (usually
//! issued by cert-manager itself).

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// TLS setup errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to load certificate: {0}")]
    CertificateLoad(String),

    #[error("failed to load private key: {0}")]
    KeyLoad(String),

    #[error("invalid TLS configuration: {0}")]
    Config(String),
}

/// Build a rustls server config from PEM certificate chain and key files
///
/// # Errors
///
/// Returns [`TlsError`] if either file is unreadable, holds no usable PEM
/// item, or the key does not match the certificate.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<ServerConfig, TlsError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| TlsError::Config(format!("{}: {}", cert_path.display(), e)))?;

    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    info!(
        "loaded TLS certificate {} and key {}",
        cert_path.display(),
        key_path.display()
    );
    Ok(config)
}

/// [`load_server_config`] wrapped for `axum_server::bind_rustls`
pub fn rustls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    let config = load_server_config(cert_path, key_path)?;
    Ok(RustlsConfig::from_config(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = File::open(path)
        .map_err(|e| TlsError::CertificateLoad(format!("{}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::CertificateLoad(format!("{}: {}", path.display(), e)))?;

    if certs.is_empty() {
        return Err(TlsError::CertificateLoad(format!(
            "{}: no certificates found in file",
            path.display()
        )));
    }

    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let file =
        File::open(path).map_err(|e| TlsError::KeyLoad(format!("{}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| TlsError::KeyLoad(format!("{}: {}", path.display(), e)))?
        .ok_or_else(|| {
            TlsError::KeyLoad(format!("{}: no private key found in file", path.display()))
        })
}
