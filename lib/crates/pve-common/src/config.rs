use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

/// Path suffix every Proxmox VE JSON API call lives under.
pub const API_PATH: &str = "/api2/json";

/// Gateway configuration, loaded from `PROXMOX_*` environment variables.
///
/// Credential material is optional at the type level; [`GatewayConfig::credentials`]
/// decides which authentication strategy applies.
#[derive(Deserialize)]
pub struct GatewayConfig {
    /// Proxmox VE endpoint, e.g. `https://pve.example.com:8006`.
    pub url: String,

    /// User including realm, e.g. `root@pam`.
    #[serde(default)]
    pub user: Option<String>,

    /// API token id (the part after `!`), or a full `user@realm!token` id.
    #[serde(default)]
    pub token_id: Option<String>,

    #[serde(default)]
    pub token_secret: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout for every outbound API call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// MCP transport the server speaks.
    #[serde(default)]
    pub transport: TransportKind,

    /// Listen address for the HTTP transport (default: 127.0.0.1:8080).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Path to TLS certificate (enables HTTPS for the HTTP transport).
    #[serde(default)]
    pub tls_cert: Option<String>,

    /// Path to TLS private key.
    #[serde(default)]
    pub tls_key: Option<String>,
}

/// MCP transport selection.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Line-delimited JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// Streamable HTTP at `/mcp`.
    Http,
}

/// Resolved credential material. Token takes precedence over password.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token {
        /// Full `user@realm!token` identifier.
        token_id: String,
        secret: String,
    },
    Password {
        user: String,
        password: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no authentication configured: set PROXMOX_TOKEN_ID and PROXMOX_TOKEN_SECRET, or PROXMOX_PASSWORD")]
    NoAuthentication,

    #[error("PROXMOX_USER is required for {0} authentication")]
    MissingUser(&'static str),

    #[error("PROXMOX_URL must not be empty")]
    MissingUrl,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Treat empty strings the same as unset variables.
fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl GatewayConfig {
    /// Build a config with only the URL set; everything else defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            token_id: None,
            token_secret: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            transport: TransportKind::default(),
            listen_addr: default_listen_addr(),
            tls_cert: None,
            tls_key: None,
        }
    }

    /// Pick the authentication strategy from the configured material.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let user = present(self.user.as_ref());

        if let (Some(token_id), Some(secret)) = (
            present(self.token_id.as_ref()),
            present(self.token_secret.as_ref()),
        ) {
            let token_id = if token_id.contains('!') {
                token_id.to_string()
            } else {
                let user = user.ok_or(ConfigError::MissingUser("token"))?;
                format!("{user}!{token_id}")
            };
            return Ok(Credentials::Token {
                token_id,
                secret: secret.to_string(),
            });
        }

        if let Some(password) = present(self.password.as_ref()) {
            let user = user.ok_or(ConfigError::MissingUser("password"))?;
            return Ok(Credentials::Password {
                user: user.to_string(),
                password: password.to_string(),
            });
        }

        Err(ConfigError::NoAuthentication)
    }

    /// The API base URL, always ending in `/api2/json`.
    pub fn api_url(&self) -> Result<String, ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        Ok(normalize_api_url(&self.url))
    }
}

/// Strip trailing slashes and append `/api2/json` unless already present.
pub fn normalize_api_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with(API_PATH) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{API_PATH}")
    }
}

fn redact(value: Option<&String>) -> &'static str {
    if present(value).is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("token_id", &self.token_id)
            .field("token_secret", &redact(self.token_secret.as_ref()))
            .field("password", &redact(self.password.as_ref()))
            .field("timeout_secs", &self.timeout_secs)
            .field("transport", &self.transport)
            .field("listen_addr", &self.listen_addr)
            .field("tls_cert", &self.tls_cert)
            .field("tls_key", &self.tls_key)
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { token_id, .. } => f
                .debug_struct("Token")
                .field("token_id", token_id)
                .finish_non_exhaustive(),
            Self::Password { user, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .finish_non_exhaustive(),
        }
    }
}
