//! MCP-facing behaviour of `ProxmoxTools`.

#![allow(clippy::expect_used)]

use std::sync::Arc;

use serde_json::{json, Value};

use pve_mcp_server::tools::ProxmoxTools;
use rmcp::model::CallToolResult;
use rmcp::ServerHandler;

use crate::mocks::{dispatcher, params, RecordingTransport, Reply, UPID};

fn tools(reply: Reply) -> ProxmoxTools<RecordingTransport> {
    ProxmoxTools::new(Arc::new(dispatcher(reply)))
}

fn text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.clone()))
        .collect()
}

#[test]
fn lists_every_catalog_operation() {
    let t = tools(Reply::Data(Value::Null));
    let defs = t.tool_definitions();
    assert_eq!(defs.len(), 32);
    assert_eq!(defs[0].name, "pve_list_nodes");
    assert!(defs.iter().any(|d| d.name == "pve_generate_terraform_provider"));
}

#[test]
fn tool_schema_matches_catalog() {
    let t = tools(Reply::Data(Value::Null));
    let clone = t
        .tool_definitions()
        .into_iter()
        .find(|d| d.name == "pve_clone_vm")
        .expect("clone tool");
    let schema = Value::Object((*clone.input_schema).clone());
    assert_eq!(schema["required"], json!(["node", "vmid", "newid"]));
    assert_eq!(schema["properties"]["full"]["type"], "boolean");
}

#[test]
fn server_info_advertises_tools() {
    let info = tools(Reply::Data(Value::Null)).get_info();
    assert!(info.capabilities.tools.is_some());
    assert!(info
        .instructions
        .as_deref()
        .is_some_and(|i| i.contains("pve_get_task_status")));
}

#[tokio::test]
async fn successful_call_returns_text() {
    let t = tools(Reply::Data(json!(UPID)));
    let result = t
        .invoke("pve_reboot_vm", Some(params(json!({ "node": "pve1", "vmid": 100 }))))
        .await;
    assert_ne!(result.is_error, Some(true));
    assert!(text(&result).contains(UPID));
}

#[tokio::test]
async fn unknown_tool_is_error_flagged() {
    let t = tools(Reply::Data(Value::Null));
    let result = t.invoke("pve_format_disk", None).await;
    assert_eq!(result.is_error, Some(true));
    assert_eq!(text(&result), "Unknown operation: pve_format_disk");
}

#[tokio::test]
async fn remote_error_is_error_flagged_with_status() {
    let t = tools(Reply::Status(403, "Permission check failed (/vms/100, VM.PowerMgmt)".into()));
    let result = t
        .invoke("pve_start_vm", Some(params(json!({ "node": "pve1", "vmid": 100 }))))
        .await;
    assert_eq!(result.is_error, Some(true));
    let message = text(&result);
    assert!(message.contains("403"));
    assert!(message.contains("VM.PowerMgmt"));
}

#[tokio::test]
async fn missing_arguments_are_error_flagged() {
    let t = tools(Reply::Data(Value::Null));
    let result = t.invoke("pve_get_vm_config", None).await;
    assert_eq!(result.is_error, Some(true));
    assert!(text(&result).starts_with("Invalid parameters:"));
}
