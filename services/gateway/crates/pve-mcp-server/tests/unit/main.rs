//! Unit tests for the Proxmox MCP gateway
//!
//! Most tests use a recording transport; `session` talks to a loopback
//! fake of the Proxmox API.

mod mocks;
mod session;
mod terraform;
mod tools;
