//! Authenticated Proxmox VE API client.
//!
//! A [`Session`] is created once at startup and shared read-only for the
//! process lifetime. Two strategies exist:
//!
//! - **API token**: a static `Authorization: PVEAPIToken=...` header. No
//!   network call.
//! - **Ticket**: one `POST /access/ticket`; the returned ticket is sent as the
//!   `PVEAuthCookie` cookie and the CSRF token as `CSRFPreventionToken` on
//!   every later request.
//!
//! Tickets are never renewed. Once Proxmox expires one (two hours by default),
//! subsequent calls fail with `401` until the process is restarted.
//!
//! **TLS**: certificate verification is disabled. Proxmox installs a
//! self-signed certificate by default and this client accepts it. Anyone able
//! to intercept traffic between the gateway and the API can read credentials;
//! run the gateway on a trusted network path.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::Client;
use serde_json::Value;

use pve_common::{Credentials, GatewayConfig, ProviderAuth, ProviderProfile};

use crate::api::{ApiRequest, ApiTransport, Method};
use crate::error::{DispatchError, SessionError};

/// Header carrying the anti-forgery token for ticket sessions.
pub const CSRF_HEADER: &str = "CSRFPreventionToken";

/// Cookie name Proxmox expects the ticket under.
pub const AUTH_COOKIE: &str = "PVEAuthCookie";

/// The authenticated client context.
pub struct Session {
    client: Client,
    api_url: String,
    headers: HeaderMap,
    profile: ProviderProfile,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_url", &self.api_url)
            .field("auth", &self.profile.auth)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Pick a strategy from `config` and authenticate.
    ///
    /// Fails with [`SessionError::Configuration`] when no credentials are
    /// configured and [`SessionError::Auth`] when the ticket request fails.
    /// There is no retry.
    pub async fn establish(config: &GatewayConfig) -> Result<Self, SessionError> {
        let api_url = config.api_url()?;
        let timeout = Duration::from_secs(config.timeout_secs);

        match config.credentials()? {
            Credentials::Token { token_id, secret } => {
                tracing::info!(%token_id, "using API token authentication");
                Self::with_token(&api_url, &token_id, &secret, timeout)
            }
            Credentials::Password { user, password } => {
                tracing::info!(%user, "requesting authentication ticket");
                Self::with_ticket(&api_url, &user, &password, timeout).await
            }
        }
    }

    /// Token strategy. Synchronous; only builds the header and client.
    ///
    /// `token_id` is the full `user@realm!token` identifier.
    pub fn with_token(
        api_url: &str,
        token_id: &str,
        secret: &str,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, sensitive(&token_header(token_id, secret))?);

        let profile = ProviderProfile {
            api_url: api_url.to_string(),
            auth: ProviderAuth::Token {
                token_id: token_id.to_string(),
            },
        };
        Self::from_parts(api_url, headers, timeout, profile)
    }

    /// Ticket strategy. Performs exactly one login call.
    pub async fn with_ticket(
        api_url: &str,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let login = build_client(HeaderMap::new(), timeout)?;
        let response = login
            .post(format!("{api_url}/access/ticket"))
            .form(&[("username", user), ("password", password)])
            .send()
            .await
            .map_err(|e| SessionError::Auth(format!("ticket request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Auth(format!(
                "ticket request returned {}: {body}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| {
                SessionError::Auth(format!("ticket response is not valid JSON: {e}"))
            })?;
        let ticket = Ticket::from_response(&body)?;
        tracing::info!(%user, "authentication ticket acquired");

        let profile = ProviderProfile {
            api_url: api_url.to_string(),
            auth: ProviderAuth::Password {
                user: user.to_string(),
            },
        };
        Self::from_parts(api_url, ticket.headers()?, timeout, profile)
    }

    fn from_parts(
        api_url: &str,
        headers: HeaderMap,
        timeout: Duration,
        profile: ProviderProfile,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            client: build_client(headers.clone(), timeout)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            headers,
            profile,
        })
    }

    /// Base URL every request path is appended to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Credential headers attached to every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl ApiTransport for Session {
    async fn send(&self, request: &ApiRequest) -> Result<Value, DispatchError> {
        let url = format!("{}{}", self.api_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, path = %request.path, "sending Proxmox API request");
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                "Proxmox API returned an error",
            );
            return Err(DispatchError::RemoteApi {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn provider_profile(&self) -> ProviderProfile {
        self.profile.clone()
    }
}

/// `PVEAPIToken=<user@realm!token>=<secret>`
pub fn token_header(token_id: &str, secret: &str) -> String {
    format!("PVEAPIToken={token_id}={secret}")
}

/// The two values a ticket login yields.
#[derive(Clone, PartialEq, Eq)]
pub struct Ticket {
    pub ticket: String,
    pub csrf_token: String,
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ticket(<redacted>)")
    }
}

impl Ticket {
    /// Extract `data.ticket` and `data.CSRFPreventionToken` from a login reply.
    pub fn from_response(body: &Value) -> Result<Self, SessionError> {
        let field = |name: &str| {
            body.pointer(&format!("/data/{name}"))
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| SessionError::Auth(format!("ticket response missing {name}")))
        };
        Ok(Self {
            ticket: field("ticket")?,
            csrf_token: field(CSRF_HEADER)?,
        })
    }

    /// Cookie and CSRF headers carrying this ticket verbatim.
    pub fn headers(&self) -> Result<HeaderMap, SessionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            sensitive(&format!("{AUTH_COOKIE}={}", self.ticket))?,
        );
        headers.insert(
            HeaderName::from_static("csrfpreventiontoken"),
            sensitive(&self.csrf_token)?,
        );
        Ok(headers)
    }
}

fn sensitive(value: &str) -> Result<HeaderValue, SessionError> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|e| SessionError::Auth(format!("credential is not a valid header value: {e}")))?;
    header.set_sensitive(true);
    Ok(header)
}

fn build_client(headers: HeaderMap, timeout: Duration) -> Result<Client, SessionError> {
    Ok(Client::builder()
        .danger_accept_invalid_certs(true)
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}
