//! Node resource summary derived from `GET /nodes/{node}/status`.
//!
//! Every subfield of the status payload is optional in practice (older
//! releases omit `cpuinfo`, some omit `swap`). Missing input yields a missing
//! output field, never an error.

use serde::Serialize;
use serde_json::Value;

use pve_common::{format_bytes, format_percent, format_uptime};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResourceSummary {
    pub node: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<UsageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<UsageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_disk: Option<UsageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_average: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pve_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sockets: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total: String,
    pub used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

/// Numeric field at a JSON pointer. Floats are truncated.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn number(status: &Value, pointer: &str) -> Option<u64> {
    let v = status.pointer(pointer)?;
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn text(status: &Value, pointer: &str) -> Option<String> {
    status
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn usage(status: &Value, key: &str) -> Option<UsageSummary> {
    let total = number(status, &format!("/{key}/total"))?;
    let used = number(status, &format!("/{key}/used"))?;
    Some(UsageSummary {
        total: format_bytes(total),
        used: format_bytes(used),
        free: number(status, &format!("/{key}/free")).map(format_bytes),
        usage: format_percent(used, total),
    })
}

fn cpu(status: &Value) -> Option<CpuSummary> {
    let summary = CpuSummary {
        usage: status
            .get("cpu")
            .and_then(Value::as_f64)
            .map(|load| format!("{:.2}%", load * 100.0)),
        model: text(status, "/cpuinfo/model"),
        cpus: number(status, "/cpuinfo/cpus"),
        cores: number(status, "/cpuinfo/cores"),
        sockets: number(status, "/cpuinfo/sockets"),
    };
    let empty = summary.usage.is_none()
        && summary.model.is_none()
        && summary.cpus.is_none()
        && summary.cores.is_none()
        && summary.sockets.is_none();
    (!empty).then_some(summary)
}

/// Build the summary for `node` from the `data` of a node status reply.
pub fn summarize(node: &str, status: &Value) -> NodeResourceSummary {
    NodeResourceSummary {
        node: node.to_string(),
        cpu: cpu(status),
        memory: usage(status, "memory"),
        swap: usage(status, "swap"),
        root_disk: usage(status, "rootfs"),
        uptime: number(status, "/uptime").map(format_uptime),
        load_average: status.get("loadavg").and_then(Value::as_array).map(|avg| {
            avg.iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        }),
        pve_version: text(status, "/pveversion"),
        kernel_version: text(status, "/kversion"),
    }
}
