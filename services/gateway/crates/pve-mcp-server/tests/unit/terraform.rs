//! Infrastructure-as-code operations end to end.

#![allow(clippy::expect_used)]

use serde_json::json;

use pve_common::{ProviderAuth, ProviderProfile};
use pve_mcp_server::dispatch::Dispatcher;

use crate::mocks::{dispatcher, params, RecordingTransport, Reply};

#[tokio::test]
async fn generate_terraform_translates_live_config() {
    let d = dispatcher(Reply::Data(json!({
        "name": "web-01",
        "cores": 4,
        "sockets": 1,
        "memory": "8192",
        "boot": "order=scsi0;net0",
        "agent": "enabled=1,fstrim_cloned_disks=1",
        "net0": "virtio=BC:24:11:2E:4A:10,bridge=vmbr1,firewall=1",
        "scsi0": "local-lvm:vm-100-disk-0,iothread=1,size=64G",
        "digest": "3f1c0a"
    })));

    let hcl = d
        .dispatch("pve_generate_terraform", &params(json!({ "node": "pve1", "vmid": 100 })))
        .await
        .expect("dispatch");

    assert_eq!(
        d.transport().single_request().path,
        "/nodes/pve1/qemu/100/config"
    );
    assert!(hcl.starts_with("resource \"proxmox_vm_qemu\" \"vm_100\" {"));
    assert!(hcl.contains("  name        = \"web-01\""));
    assert!(hcl.contains("  target_node = \"pve1\""));
    assert!(hcl.contains("  vmid        = 100"));
    assert!(hcl.contains("  cores       = 4"));
    assert!(hcl.contains("  memory      = 8192"));
    assert!(hcl.contains("  agent       = 1"));
    assert!(hcl.contains("    model  = \"virtio\""));
    assert!(hcl.contains("    bridge = \"vmbr1\""));
    assert!(hcl.contains("    storage = \"local-lvm\""));
    assert!(hcl.contains("    size    = \"64G\""));
    assert!(!hcl.contains("digest"));
}

#[tokio::test]
async fn generate_terraform_on_empty_config_uses_defaults() {
    let d = dispatcher(Reply::Data(json!({})));
    let hcl = d
        .dispatch("pve_generate_terraform", &params(json!({ "node": "pve1", "vmid": 7 })))
        .await
        .expect("dispatch");

    assert!(hcl.contains("  name        = \"vm-7\""));
    assert!(hcl.contains("  cores       = 1"));
    assert!(hcl.contains("  memory      = 2048"));
    assert!(hcl.contains("  boot        = \"order=scsi0\""));
    assert!(!hcl.contains("network {"));
    assert!(!hcl.contains("disk {"));
}

#[tokio::test]
async fn provider_document_makes_no_api_call() {
    let d = dispatcher(Reply::Data(json!(null)));
    let doc = d
        .dispatch("pve_generate_terraform_provider", &params(json!({})))
        .await
        .expect("dispatch");

    assert!(d.transport().requests().is_empty());
    assert!(doc.contains("source = \"Telmate/proxmox\""));
    assert!(doc.contains("pm_api_url          = \"https://pve.lab:8006/api2/json\""));
    assert!(doc.contains("pm_api_token_id     = \"terraform@pve!iac\""));
    assert!(doc.contains("var.proxmox_api_token_secret"));
}

#[tokio::test]
async fn provider_document_for_ticket_session_uses_password_variable() {
    let transport = RecordingTransport::with_data(json!(null)).with_profile(ProviderProfile {
        api_url: "https://10.0.0.5:8006/api2/json".to_string(),
        auth: ProviderAuth::Password {
            user: "root@pam".to_string(),
        },
    });
    let d = Dispatcher::new(transport);
    let doc = d
        .dispatch("pve_generate_terraform_provider", &params(json!({})))
        .await
        .expect("dispatch");

    assert!(doc.contains("pm_user             = \"root@pam\""));
    assert!(doc.contains("variable \"proxmox_password\""));
    assert!(!doc.contains("pm_api_token_id"));
}
