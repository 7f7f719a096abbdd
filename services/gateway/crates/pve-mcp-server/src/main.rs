//! Proxmox VE MCP gateway entry point.
//!
//! Initialises tracing, loads configuration from `PROXMOX_*` environment
//! variables, authenticates once against the Proxmox API and serves the
//! operation catalog over stdio or Streamable HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum_server::tls_rustls::RustlsConfig;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};

use pve_common::{GatewayConfig, TransportKind};
use pve_mcp_server::{dispatch::Dispatcher, session::Session, tools::ProxmoxTools};

// ===================================================================
// Health endpoint
// ===================================================================

/// Liveness probe for the HTTP transport.
async fn health() -> StatusCode {
    StatusCode::OK
}

// ===================================================================
// Entry point
// ===================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // rustls needs a process-wide crypto provider before any TLS use.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // 1. Tracing goes to stderr; stdout belongs to the stdio transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("pve-mcp starting");

    // 2. Load configuration from PROXMOX_* env vars.
    let config: GatewayConfig = envy::prefixed("PROXMOX_").from_env().context(
        "failed to load config from PROXMOX_* env vars (PROXMOX_URL is required)",
    )?;

    tracing::info!(
        url = %config.url,
        transport = ?config.transport,
        timeout_secs = config.timeout_secs,
        "configuration loaded",
    );
    tracing::warn!("TLS certificate verification is disabled for Proxmox API calls");

    // 3. Authenticate once; the session lives for the whole process.
    let session = Session::establish(&config)
        .await
        .context("failed to establish Proxmox session")?;
    let dispatcher = Arc::new(Dispatcher::new(session));
    tracing::info!(
        operations = dispatcher.catalog().len(),
        "operation catalog loaded",
    );

    // 4. Serve.
    match config.transport {
        TransportKind::Stdio => serve_stdio(dispatcher).await?,
        TransportKind::Http => serve_http(&config, dispatcher).await?,
    }

    tracing::info!("pve-mcp shut down");
    Ok(())
}

async fn serve_stdio(dispatcher: Arc<Dispatcher<Session>>) -> Result<()> {
    tracing::info!("MCP server ready on stdio");
    let server = ProxmoxTools::new(dispatcher)
        .serve(stdio())
        .await
        .context("failed to start stdio MCP server")?;
    let reason = server.waiting().await.context("stdio MCP server task failed")?;
    tracing::info!(?reason, "stdio session closed");
    Ok(())
}

async fn serve_http(config: &GatewayConfig, dispatcher: Arc<Dispatcher<Session>>) -> Result<()> {
    // One ProxmoxTools per MCP session, all sharing the dispatcher.
    let service = StreamableHttpService::new(
        move || Ok(ProxmoxTools::new(dispatcher.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    //    - `/mcp`    → MCP Streamable-HTTP transport
    //    - `/health` → liveness probe
    let router = axum::Router::new()
        .nest_service("/mcp", service)
        .route("/health", axum::routing::get(health));

    let addr = config.listen_addr;
    if let (Some(cert_path), Some(key_path)) = (&config.tls_cert, &config.tls_key) {
        tracing::info!("TLS enabled, loading cert from {}", cert_path);
        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .context("failed to load TLS certificates")?;

        tracing::info!("MCP server ready at https://{addr}/mcp");

        axum_server::bind_rustls(addr, tls_config)
            .serve(router.into_make_service())
            .await
            .context("HTTPS server error")?;
    } else {
        tracing::info!("MCP server ready at http://{addr}/mcp (TLS disabled)");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("failed to bind TCP listener")?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;
    }
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
