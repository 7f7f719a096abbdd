//! `Session` against a loopback fake of the Proxmox API.
//!
//! These tests exercise the real reqwest client: ticket login, the headers
//! it attaches afterwards, query construction and status mapping.

#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Form;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use pve_mcp_server::api::{ApiRequest, ApiTransport};
use pve_mcp_server::error::{DispatchError, SessionError};
use pve_mcp_server::session::Session;

const TIMEOUT: Duration = Duration::from_secs(5);
const TICKET: &str = "PVE:root@pam:6650A1B2::c2lnbmF0dXJl";
const CSRF: &str = "6650A1B2:Y3NyZg";
const ERROR_BODY: &str = r#"{"errors":{"vmid":"value does not look like a valid VM ID"}}"#;

// ── Fake Proxmox API ──────────────────────────────────────────────────────────

async fn login(Form(form): Form<HashMap<String, String>>) -> (StatusCode, String) {
    let valid = form.get("username").map(String::as_str) == Some("root@pam")
        && form.get("password").map(String::as_str) == Some("secret");
    if valid {
        let body = json!({
            "data": {
                "ticket": TICKET,
                "CSRFPreventionToken": CSRF,
                "username": "root@pam"
            }
        });
        (StatusCode::OK, body.to_string())
    } else {
        (StatusCode::UNAUTHORIZED, "authentication failure".to_string())
    }
}

/// Reflects the credential headers and request URI back as `data`.
async fn echo(headers: HeaderMap, uri: Uri) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "data": {
            "cookie": header("cookie"),
            "csrf": header("csrfpreventiontoken"),
            "authorization": header("authorization"),
            "uri": uri.to_string()
        }
    }))
}

async fn fail() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY)
}

fn fake_proxmox() -> Router {
    Router::new()
        .route("/api2/json/access/ticket", post(login))
        .route("/api2/json/echo", get(echo))
        .route("/api2/json/fail", get(fail))
}

/// Serve `router` on an ephemeral loopback port; returns the API base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake server");
    });
    format!("http://{addr}/api2/json")
}

async fn ticket_session(base: &str) -> Session {
    Session::with_ticket(base, "root@pam", "secret", TIMEOUT)
        .await
        .expect("ticket login")
}

fn data(reply: &Value) -> &Value {
    reply.get("data").expect("data envelope")
}

// ── Ticket login ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn ticket_login_attaches_cookie_and_csrf_to_later_requests() {
    let base = spawn(fake_proxmox()).await;
    let session = ticket_session(&base).await;

    let reply = session
        .send(&ApiRequest::get("/echo"))
        .await
        .expect("echo");
    let echoed = data(&reply);
    assert_eq!(echoed["cookie"], format!("PVEAuthCookie={TICKET}"));
    assert_eq!(echoed["csrf"], CSRF);
    assert_eq!(echoed["authorization"], Value::Null);
}

#[tokio::test]
async fn rejected_login_is_auth_error() {
    let base = spawn(fake_proxmox()).await;
    let err = Session::with_ticket(&base, "root@pam", "wrong", TIMEOUT)
        .await
        .expect_err("must fail");
    match err {
        SessionError::Auth(message) => {
            assert!(message.contains("401"), "{message}");
            assert!(message.contains("authentication failure"), "{message}");
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_login_reply_is_auth_error() {
    let router = Router::new().route(
        "/api2/json/access/ticket",
        post(|| async { "<html>maintenance</html>" }),
    );
    let base = spawn(router).await;
    let err = Session::with_ticket(&base, "root@pam", "secret", TIMEOUT)
        .await
        .expect_err("must fail");
    assert!(matches!(err, SessionError::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_login_is_auth_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let base = format!("http://{addr}/api2/json");
    let err = Session::with_ticket(&base, "root@pam", "secret", TIMEOUT)
        .await
        .expect_err("must fail");
    assert!(matches!(err, SessionError::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn token_session_sends_authorization_header() {
    let base = spawn(fake_proxmox()).await;
    let session = Session::with_token(&base, "root@pam!ci", "abc", TIMEOUT).expect("session");

    let reply = session
        .send(&ApiRequest::get("/echo"))
        .await
        .expect("echo");
    let echoed = data(&reply);
    assert_eq!(echoed["authorization"], "PVEAPIToken=root@pam!ci=abc");
    assert_eq!(echoed["cookie"], Value::Null);
}

// ── Requests and status mapping ───────────────────────────────────────────────

#[tokio::test]
async fn query_is_appended_after_fixed_template_query() {
    let base = spawn(fake_proxmox()).await;
    let session = ticket_session(&base).await;

    let mut request = ApiRequest::get("/echo?content=backup");
    request.query = vec![("vmid".to_string(), "100".to_string())];
    let reply = session.send(&request).await.expect("echo");

    assert_eq!(
        data(&reply)["uri"],
        "/api2/json/echo?content=backup&vmid=100"
    );
}

#[tokio::test]
async fn server_error_keeps_status_and_body_verbatim() {
    let base = spawn(fake_proxmox()).await;
    let session = ticket_session(&base).await;

    let err = session
        .send(&ApiRequest::get("/fail"))
        .await
        .expect_err("must fail");
    match &err {
        DispatchError::RemoteApi { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, ERROR_BODY);
        }
        other => panic!("expected remote API error, got {other:?}"),
    }
    assert_eq!(err.to_string(), format!("Proxmox API error 500: {ERROR_BODY}"));
}

#[tokio::test]
async fn unknown_path_maps_to_remote_api_error() {
    let base = spawn(fake_proxmox()).await;
    let session = ticket_session(&base).await;

    let err = session
        .send(&ApiRequest::get("/nodes/pve1/qemu/999/config"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, DispatchError::RemoteApi { status: 404, .. }), "{err:?}");
}
