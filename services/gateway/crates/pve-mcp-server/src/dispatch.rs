//! Routes an operation name and parameter bag to exactly one API call.
//!
//! The dispatcher owns no per-call state. It looks the operation up in the
//! [`Catalog`], builds one [`ApiRequest`], sends it through the injected
//! [`ApiTransport`] and renders the reply to text. Mutating operations return
//! the task UPID immediately; nothing here polls for completion.
//!
//! Path parameters are interpolated verbatim. A value containing `/` changes
//! the route; this is accepted, not guarded against.

use serde_json::{Map, Value};

use pve_common::{provider_document, translate, ConfigRecord};

use crate::api::{ApiRequest, ApiTransport, Method};
use crate::catalog::{placeholders, present, Catalog, Endpoint, Operation, Render};
use crate::error::DispatchError;
use crate::resources;

pub struct Dispatcher<T> {
    transport: T,
    catalog: Catalog,
}

impl<T: ApiTransport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            catalog: Catalog::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run `name` with `params` and return the rendered text.
    pub async fn dispatch(
        &self,
        name: &str,
        params: &Map<String, Value>,
    ) -> Result<String, DispatchError> {
        let op = self
            .catalog
            .get(name)
            .ok_or_else(|| DispatchError::UnknownOperation(name.to_string()))?;
        check_params(op, params)?;

        let (data, fallback) = match op.route.resolve(params) {
            Some(endpoint) => {
                let request = build_request(op, &endpoint, params)?;
                tracing::info!(
                    operation = op.name,
                    method = %request.method,
                    path = %request.path,
                    "dispatching operation",
                );
                let envelope = self.transport.send(&request).await?;
                (unwrap_data(envelope), endpoint.fallback)
            }
            None => {
                tracing::info!(operation = op.name, "rendering local operation");
                (Value::Null, false)
            }
        };
        self.render(op, params, data, fallback)
    }

    /// `fallback` is true when a scoped route used its cluster-wide endpoint.
    fn render(
        &self,
        op: &Operation,
        params: &Map<String, Value>,
        data: Value,
        fallback: bool,
    ) -> Result<String, DispatchError> {
        match op.render {
            Render::Json => Ok(serde_json::to_string_pretty(&data)?),
            Render::Task(label) => Ok(task_message(label, &data)),
            Render::NodeResources => {
                let summary = resources::summarize(&param_text(params, "node"), &data);
                Ok(serde_json::to_string_pretty(&summary)?)
            }
            Render::Terraform => Ok(translate(
                &param_text(params, "node"),
                &param_text(params, "vmid"),
                &ConfigRecord::from_value(data),
            )),
            Render::TerraformProvider => {
                Ok(provider_document(&self.transport.provider_profile()))
            }
            Render::FilterType(kind) => {
                let data = if fallback { filter_type(data, kind) } else { data };
                Ok(serde_json::to_string_pretty(&data)?)
            }
        }
    }
}

/// Required parameters must be present; supplied ones must be scalars.
fn check_params(op: &Operation, params: &Map<String, Value>) -> Result<(), DispatchError> {
    for spec in op.params {
        match present(params.get(spec.name)) {
            None if spec.required => {
                return Err(DispatchError::Validation(format!(
                    "missing required parameter '{}' for {}",
                    spec.name, op.name
                )));
            }
            Some(Value::Array(_) | Value::Object(_)) => {
                return Err(DispatchError::Validation(format!(
                    "parameter '{}' must be a string, number or boolean",
                    spec.name
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Build the single request for `op` at `endpoint`.
///
/// Placeholders are filled from `params`. The remaining declared parameters
/// that were supplied go into the JSON body for POST and the query string
/// otherwise. Absent parameters are omitted, never sent as null.
pub fn build_request(
    op: &Operation,
    endpoint: &Endpoint,
    params: &Map<String, Value>,
) -> Result<ApiRequest, DispatchError> {
    let path = substitute(endpoint.template, params)?;
    let in_path: Vec<&str> = placeholders(endpoint.template).collect();

    let extra = op
        .params
        .iter()
        .filter(|spec| !in_path.contains(&spec.name))
        .filter_map(|spec| present(params.get(spec.name)).map(|value| (spec, value)));

    let request = match endpoint.method {
        Method::Post => ApiRequest {
            method: Method::Post,
            path,
            query: Vec::new(),
            body: Some(
                extra
                    .map(|(spec, value)| (spec.wire_name().to_string(), body_value(value)))
                    .collect(),
            ),
        },
        method @ (Method::Get | Method::Delete) => ApiRequest {
            method,
            path,
            query: extra
                .map(|(spec, value)| (spec.wire_name().to_string(), scalar_text(value)))
                .collect(),
            body: None,
        },
    };
    Ok(request)
}

/// Replace each `{name}` with the literal text of `params[name]`.
fn substitute(template: &str, params: &Map<String, Value>) -> Result<String, DispatchError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &after[..end];
        let value = present(params.get(name)).ok_or_else(|| {
            DispatchError::Validation(format!("missing required parameter '{name}'"))
        })?;
        out.push_str(&scalar_text(value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Text form used for paths and query strings. Booleans become `1`/`0`.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => u8::from(*b).to_string(),
        other => other.to_string(),
    }
}

/// Proxmox booleans are integers on the wire.
fn body_value(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::from(u8::from(*b)),
        other => other.clone(),
    }
}

/// Proxmox wraps every reply as `{"data": ...}`.
fn unwrap_data(envelope: Value) -> Value {
    match envelope {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}

fn param_text(params: &Map<String, Value>, name: &str) -> String {
    present(params.get(name)).map(scalar_text).unwrap_or_default()
}

/// Acknowledge a submitted task without waiting for it.
pub fn task_message(label: &str, data: &Value) -> String {
    let upid = match data {
        Value::String(s) => s.clone(),
        Value::Null => "(none returned)".to_string(),
        other => other.to_string(),
    };
    format!("{label}: task submitted. Task ID: {upid}\nUse pve_get_task_status to follow progress.")
}

/// Keep entries of the cluster resource list whose `type` is `kind`.
fn filter_type(data: Value, kind: &str) -> Value {
    match data {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some(kind))
                .collect(),
        ),
        other => other,
    }
}
