//! Proxmox VE MCP gateway.
//!
//! Translates MCP tool calls into single Proxmox API requests through an
//! authenticated [`session::Session`]. The binary in `main.rs` wires the
//! configuration, session and transport together.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod api;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod resources;
pub mod session;
pub mod tools;
