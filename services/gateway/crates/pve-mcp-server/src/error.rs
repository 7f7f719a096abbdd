//! Error taxonomy for the gateway.
//!
//! [`SessionError`] covers startup and is fatal. [`DispatchError`] is per call
//! and is turned into an error-flagged tool result at the MCP boundary.

use thiserror::Error;

use pve_common::ConfigError;

// ── Startup errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    /// Missing or invalid credential configuration.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Ticket request failed or returned an unusable reply.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),
}

// ── Per-operation errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid parameters: {0}")]
    Validation(String),

    /// Non-success HTTP response from Proxmox.
    #[error("Proxmox API error {status}: {body}")]
    RemoteApi { status: u16, body: String },

    /// Network unreachable, timeout, or any other transport failure.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}
