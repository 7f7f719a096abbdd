//! The outbound seam: one [`ApiRequest`] in, one JSON body out.
//!
//! The dispatcher only ever talks to an [`ApiTransport`]. The production
//! implementation is [`crate::session::Session`]; tests substitute a recorder.

use std::fmt;
use std::future::Future;

use serde_json::{Map, Value};

use pve_common::ProviderProfile;

use crate::error::DispatchError;

/// HTTP methods the catalog uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        })
    }
}

/// A single Proxmox API call, relative to the `/api2/json` base.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path with parameters already substituted; may carry a fixed query string.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// JSON body for POST; `None` otherwise.
    pub body: Option<Map<String, Value>>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }
}

/// Sends requests against an authenticated Proxmox API.
pub trait ApiTransport: Send + Sync {
    /// Issue exactly one HTTP call and return the decoded response body
    /// (the full envelope, including `data`).
    ///
    /// Non-success statuses must map to [`DispatchError::RemoteApi`].
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<Value, DispatchError>> + Send;

    /// Connection details used by the provider document generator.
    fn provider_profile(&self) -> ProviderProfile;
}
