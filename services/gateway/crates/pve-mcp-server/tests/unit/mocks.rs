//! Shared mock infrastructure for unit tests.
//!
//! [`RecordingTransport`] stands in for the authenticated session: it records
//! every request it receives and answers with a canned envelope or status.

#![allow(clippy::expect_used)]

use std::sync::Mutex;

use serde_json::{json, Map, Value};

use pve_common::{ProviderAuth, ProviderProfile};
use pve_mcp_server::api::{ApiRequest, ApiTransport};
use pve_mcp_server::dispatch::Dispatcher;
use pve_mcp_server::error::DispatchError;

pub const UPID: &str = "UPID:pve1:0003F1A2:01B2C3D4:6650A1B2:qmstart:100:root@pam:";

// ── Canned replies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Reply {
    /// `{"data": <value>}` with a 200 status.
    Data(Value),
    /// A non-success status with a raw body.
    Status(u16, String),
}

// ── Mock: recording transport ────────────────────────────────────────────────

#[derive(Debug)]
pub struct RecordingTransport {
    reply: Reply,
    requests: Mutex<Vec<ApiRequest>>,
    profile: ProviderProfile,
}

impl RecordingTransport {
    pub fn replying(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
            profile: ProviderProfile {
                api_url: "https://pve.lab:8006/api2/json".to_string(),
                auth: ProviderAuth::Token {
                    token_id: "terraform@pve!iac".to_string(),
                },
            },
        }
    }

    pub fn with_data(data: Value) -> Self {
        Self::replying(Reply::Data(data))
    }

    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("lock").clone()
    }

    pub fn single_request(&self) -> ApiRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one API call");
        requests.into_iter().next().expect("one request")
    }
}

impl ApiTransport for RecordingTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value, DispatchError> {
        self.requests.lock().expect("lock").push(request.clone());
        match &self.reply {
            Reply::Data(data) => Ok(json!({ "data": data })),
            Reply::Status(status, body) => Err(DispatchError::RemoteApi {
                status: *status,
                body: body.clone(),
            }),
        }
    }

    fn provider_profile(&self) -> ProviderProfile {
        self.profile.clone()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub fn dispatcher(reply: Reply) -> Dispatcher<RecordingTransport> {
    Dispatcher::new(RecordingTransport::replying(reply))
}

pub fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("params must be an object, got {other}"),
    }
}
