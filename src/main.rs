// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! cert-manager OVH DNS-01 webhook server
//!
//! Serves the cert-manager webhook API for the `ovh` solver under the API
//! group given by `GROUP_NAME`. OVH credentials are read per challenge from
//! Kubernetes Secrets in the challenge's namespace. HTTPS is served when
//! `TLS_CERT_FILE` and `TLS_KEY_FILE` are set.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use ovh_webhook::{
    metrics,
    solver::{OvhSolver, Solver},
    tls,
    webhook::{self, ServerConfig},
};

/// Time allowed for in-flight requests once shutdown starts
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("starting ovh dns01 webhook v{}", env!("CARGO_PKG_VERSION"));

    // reqwest and the listener both use ring; make it the process default too
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    // the group name is required; refuse to serve without it
    let config = ServerConfig::from_env().map_err(|e| {
        error!("invalid configuration: {}", e);
        anyhow::anyhow!(e)
    })?;

    info!("group name: {}", config.group_name);
    info!("api port: {}", config.api_port);

    metrics::init_metrics();

    let kube_config = kube::Config::infer()
        .await
        .context("failed to load kubernetes configuration")?;

    let mut solver =
        OvhSolver::new().with_timeout(Duration::from_secs(config.ovh_timeout_secs));
    solver
        .initialize(kube_config)
        .await
        .context("failed to initialize solver")?;

    let app = webhook::router(&config.group_name, Arc::new(solver));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));

    match config.tls_files() {
        Some((cert, key)) => {
            let tls_config =
                tls::rustls_config(cert, key).context("failed to load TLS configuration")?;

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            info!("ovh dns01 webhook listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("server error")?;
        }
        None => {
            warn!("TLS_CERT_FILE and TLS_KEY_FILE not set, serving plain HTTP");
            info!("ovh dns01 webhook listening on http://{}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
        }
    }

    info!("ovh dns01 webhook stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
    }
}
