//! Terraform document generation for the `Telmate/proxmox` provider.
//!
//! [`translate`] turns a QEMU VM configuration record (as returned by
//! `GET /nodes/{node}/qemu/{vmid}/config`) into a `proxmox_vm_qemu` resource
//! block. [`provider_document`] emits the matching provider configuration.
//! Both are pure: the same input always yields byte-identical text.

use std::borrow::Cow;
use std::fmt;

use serde_json::{Map, Value};

use crate::kvlist::{self, Token};

/// Highest `netN` slot inspected.
pub const MAX_NETWORK_SLOT: usize = 10;

/// The only disk slot translated.
pub const PRIMARY_DISK_SLOT: &str = "scsi0";

const DEFAULT_BRIDGE: &str = "vmbr0";
const DEFAULT_MODEL: &str = "virtio";
const DEFAULT_DISK_GB: &str = "32";
const DEFAULT_CORES: u64 = 1;
const DEFAULT_SOCKETS: u64 = 1;
const DEFAULT_MEMORY: u64 = 2048;
const DEFAULT_BOOT: &str = "order=scsi0";

const NIC_MODELS: &[&str] = &[
    "virtio", "e1000", "e1000e", "rtl8139", "vmxnet3", "i82551", "i82557b", "i82559er",
    "ne2k_isa", "ne2k_pci", "pcnet",
];

/// Read-only view of a VM configuration record.
///
/// Proxmox returns most values as strings but some (`cores`, `memory`) as
/// numbers depending on version; both are accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigRecord(Map<String, Value>);

impl ConfigRecord {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Anything other than a JSON object yields an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// String form of a scalar value; `None` for absent or non-scalar keys.
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.0.get(key)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Borrowed(if *b { "1" } else { "0" })),
            _ => None,
        }
    }

    fn number(&self, key: &str) -> Option<u64> {
        let raw = self.get(key)?;
        let raw = raw.trim();
        raw.parse().ok().or_else(|| {
            // PVE 8 may encode memory as `current=4096[,...]`.
            kvlist::parse(raw)
                .get("current")
                .and_then(|v| v.parse().ok())
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConfigRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One `network { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBlock {
    pub model: String,
    pub bridge: String,
}

/// One `disk { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskBlock {
    pub storage: String,
    /// Size in GiB, without unit.
    pub size_gb: String,
}

/// A `proxmox_vm_qemu` resource derived from a configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmResource {
    pub vm_id: String,
    pub name: String,
    pub node: String,
    pub cores: u64,
    pub sockets: u64,
    pub memory: u64,
    pub boot: String,
    pub agent: u8,
    pub networks: Vec<NetworkBlock>,
    pub disk: Option<DiskBlock>,
}

impl VmResource {
    pub fn from_record(node: &str, vm_id: &str, record: &ConfigRecord) -> Self {
        Self {
            vm_id: vm_id.to_string(),
            name: record
                .get("name")
                .map_or_else(|| format!("vm-{vm_id}"), Cow::into_owned),
            node: node.to_string(),
            cores: record.number("cores").unwrap_or(DEFAULT_CORES),
            sockets: record.number("sockets").unwrap_or(DEFAULT_SOCKETS),
            memory: record.number("memory").unwrap_or(DEFAULT_MEMORY),
            boot: record
                .get("boot")
                .map_or_else(|| DEFAULT_BOOT.to_string(), Cow::into_owned),
            agent: record.get("agent").map_or(0, |raw| agent_flag(&raw)),
            networks: (0..=MAX_NETWORK_SLOT)
                .filter_map(|slot| record.get(&format!("net{slot}")))
                .map(|raw| network_block(&raw))
                .collect(),
            disk: record
                .get(PRIMARY_DISK_SLOT)
                .and_then(|raw| disk_block(&raw)),
        }
    }

    fn label(&self) -> String {
        let id: String = self
            .vm_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("vm_{id}")
    }
}

fn network_block(raw: &str) -> NetworkBlock {
    let list = kvlist::parse(raw);
    let model = list.get("model").or_else(|| match list.first() {
        Some(Token::Pair { key, .. } | Token::Bare(key)) if NIC_MODELS.contains(&key) => Some(key),
        _ => None,
    });
    NetworkBlock {
        model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        bridge: list.get("bridge").unwrap_or(DEFAULT_BRIDGE).to_string(),
    }
}

fn disk_block(raw: &str) -> Option<DiskBlock> {
    let list = kvlist::parse(raw);
    let volume = match list.first() {
        Some(Token::Bare(volume)) => Some(volume),
        _ => list.get("file"),
    }?;
    let (storage, _) = volume.split_once(':')?;
    if storage.is_empty() {
        return None;
    }
    let size_gb = list
        .get("size")
        .and_then(|size| size.strip_suffix('G'))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(DEFAULT_DISK_GB);
    Some(DiskBlock {
        storage: storage.to_string(),
        size_gb: size_gb.to_string(),
    })
}

/// `agent` is `1`, `0`, or a property string like `enabled=1,fstrim_cloned_disks=1`.
fn agent_flag(raw: &str) -> u8 {
    let list = kvlist::parse(raw);
    let value = list.get("enabled").or_else(|| list.bare()).unwrap_or("0");
    u8::from(matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    ))
}

/// Quote a string as an HCL literal.
fn hcl(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "$${");
    format!("\"{escaped}\"")
}

impl fmt::Display for VmResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vmid = if !self.vm_id.is_empty() && self.vm_id.bytes().all(|b| b.is_ascii_digit()) {
            self.vm_id.clone()
        } else {
            hcl(&self.vm_id)
        };

        writeln!(f, "resource \"proxmox_vm_qemu\" \"{}\" {{", self.label())?;
        writeln!(f, "  name        = {}", hcl(&self.name))?;
        writeln!(f, "  target_node = {}", hcl(&self.node))?;
        writeln!(f, "  vmid        = {vmid}")?;
        writeln!(f, "  cores       = {}", self.cores)?;
        writeln!(f, "  sockets     = {}", self.sockets)?;
        writeln!(f, "  memory      = {}", self.memory)?;
        writeln!(f, "  boot        = {}", hcl(&self.boot))?;
        writeln!(f, "  agent       = {}", self.agent)?;

        for net in &self.networks {
            writeln!(f)?;
            writeln!(f, "  network {{")?;
            writeln!(f, "    model  = {}", hcl(&net.model))?;
            writeln!(f, "    bridge = {}", hcl(&net.bridge))?;
            writeln!(f, "  }}")?;
        }

        if let Some(disk) = &self.disk {
            writeln!(f)?;
            writeln!(f, "  disk {{")?;
            writeln!(f, "    type    = \"scsi\"")?;
            writeln!(f, "    storage = {}", hcl(&disk.storage))?;
            writeln!(f, "    size    = {}", hcl(&format!("{}G", disk.size_gb)))?;
            writeln!(f, "  }}")?;
        }

        writeln!(f, "}}")
    }
}

/// Render the `proxmox_vm_qemu` resource for one VM configuration record.
pub fn translate(node: &str, vm_id: &str, record: &ConfigRecord) -> String {
    VmResource::from_record(node, vm_id, record).to_string()
}

// ===================================================================
// Provider configuration
// ===================================================================

/// How the generated provider block authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderAuth {
    /// Full `user@realm!token` identifier; the secret stays a variable.
    Token { token_id: String },
    /// User with realm; the password stays a variable.
    Password { user: String },
}

/// Connection details of the active session, minus secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub api_url: String,
    pub auth: ProviderAuth,
}

/// Render a standalone provider configuration for `profile`.
///
/// Secrets are never embedded; they are declared as sensitive variables.
/// `pm_tls_insecure` is always true since Proxmox ships a self-signed
/// certificate.
pub fn provider_document(profile: &ProviderProfile) -> String {
    let (variable, credential_lines) = match &profile.auth {
        ProviderAuth::Token { token_id } => (
            "proxmox_api_token_secret",
            format!(
                "  pm_api_token_id     = {}\n  pm_api_token_secret = var.proxmox_api_token_secret\n",
                hcl(token_id)
            ),
        ),
        ProviderAuth::Password { user } => (
            "proxmox_password",
            format!(
                "  pm_user             = {}\n  pm_password         = var.proxmox_password\n",
                hcl(user)
            ),
        ),
    };

    format!(
        "terraform {{\n\
         \x20 required_providers {{\n\
         \x20   proxmox = {{\n\
         \x20     source = \"Telmate/proxmox\"\n\
         \x20   }}\n\
         \x20 }}\n\
         }}\n\
         \n\
         variable \"{variable}\" {{\n\
         \x20 type      = string\n\
         \x20 sensitive = true\n\
         }}\n\
         \n\
         provider \"proxmox\" {{\n\
         \x20 pm_api_url          = {url}\n\
         {credential_lines}\
         \x20 pm_tls_insecure     = true\n\
         }}\n",
        url = hcl(&profile.api_url),
    )
}
