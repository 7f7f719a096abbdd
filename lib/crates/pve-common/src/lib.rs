//! Shared building blocks for the Proxmox VE MCP gateway: configuration,
//! presentation helpers and the Terraform translator.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod format;
pub mod kvlist;
pub mod terraform;

pub use config::{ConfigError, Credentials, GatewayConfig, TransportKind, normalize_api_url};
pub use format::{format_bytes, format_percent, format_uptime};
pub use terraform::{ConfigRecord, ProviderAuth, ProviderProfile, provider_document, translate};
