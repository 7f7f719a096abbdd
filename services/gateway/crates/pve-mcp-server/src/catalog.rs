//! The operation registry.
//!
//! Every tool the gateway exposes is one [`Operation`] row in [`OPERATIONS`]:
//! its parameter schema, the single Proxmox endpoint it hits, and how the
//! reply is rendered. The dispatcher and the MCP `tools/list` handler both
//! read this table; nothing else knows operation names.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::api::Method;

// ===================================================================
// Schema types
// ===================================================================

/// Primitive parameter types the MCP input schema advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    /// A string restricted to the listed values.
    Enum(&'static [&'static str]),
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            Self::String | Self::Enum(_) => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
    /// Name Proxmox expects on the wire when it differs from `name`.
    pub wire: Option<&'static str>,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
            wire: None,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
            wire: None,
        }
    }

    pub const fn wire(self, wire: &'static str) -> Self {
        Self {
            wire: Some(wire),
            ..self
        }
    }

    pub fn wire_name(&self) -> &'static str {
        self.wire.unwrap_or(self.name)
    }

    fn schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), self.kind.json_type().into());
        prop.insert("description".into(), self.description.into());
        if let ParamKind::Enum(values) = self.kind {
            prop.insert("enum".into(), values.iter().copied().collect::<Vec<_>>().into());
        }
        Value::Object(prop)
    }
}

/// Where an operation sends its single request.
///
/// Templates use `{param}` placeholders and may carry a fixed query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Get(&'static str),
    Post(&'static str),
    Delete(&'static str),
    /// `scoped` when `param` is supplied, the cluster-wide `fallback` otherwise.
    Scoped {
        param: &'static str,
        scoped: &'static Route,
        fallback: &'static Route,
    },
    /// No remote call.
    Local,
}

/// A route resolved against a parameter bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub template: &'static str,
    /// True when a [`Route::Scoped`] fell back to its cluster-wide endpoint.
    pub fallback: bool,
}

impl Route {
    /// Pick the endpoint for `params`; `None` for [`Route::Local`].
    pub fn resolve(&self, params: &Map<String, Value>) -> Option<Endpoint> {
        let endpoint = |method, template| {
            Some(Endpoint {
                method,
                template,
                fallback: false,
            })
        };
        match *self {
            Self::Get(template) => endpoint(Method::Get, template),
            Self::Post(template) => endpoint(Method::Post, template),
            Self::Delete(template) => endpoint(Method::Delete, template),
            Self::Scoped {
                param,
                scoped,
                fallback,
            } => {
                if present(params.get(param)).is_some() {
                    scoped.resolve(params)
                } else {
                    fallback.resolve(params).map(|e| Endpoint {
                        fallback: true,
                        ..e
                    })
                }
            }
            Self::Local => None,
        }
    }
}

/// How a successful reply becomes text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Pretty-printed `data`.
    Json,
    /// Acknowledge a task; the label prefixes the UPID.
    Task(&'static str),
    /// Derived node usage summary.
    NodeResources,
    /// `proxmox_vm_qemu` resource from a VM config.
    Terraform,
    /// Standalone provider document.
    TerraformProvider,
    /// Keep only entries with this `type` when the cluster endpoint was used.
    FilterType(&'static str),
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    pub route: Route,
    pub render: Render,
}

impl Operation {
    /// JSON Schema object for the MCP `inputSchema` field.
    pub fn input_schema(&self) -> Map<String, Value> {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<Value> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.into())
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), "object".into());
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), Value::Array(required));
        schema
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// A parameter value counts as supplied unless it is missing, null or an
/// empty string.
pub fn present(value: Option<&Value>) -> Option<&Value> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        v => Some(v),
    }
}

/// Placeholder names in a path template, in order.
pub fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    template
        .split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
}

// ===================================================================
// Registry
// ===================================================================

/// Lookup over [`OPERATIONS`], built once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    index: HashMap<&'static str, &'static Operation>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            index: OPERATIONS.iter().map(|op| (op.name, op)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&'static Operation> {
        self.index.get(name).copied()
    }

    /// All operations in declaration order.
    pub fn operations(&self) -> &'static [Operation] {
        OPERATIONS
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

// ===================================================================
// Parameters shared across operations
// ===================================================================

use ParamKind::{Boolean, Number, String as Str};

const NODE: ParamSpec = ParamSpec::required("node", Str, "Node name (e.g. pve)");
const NODE_SCOPE: ParamSpec = ParamSpec::optional(
    "node",
    Str,
    "Limit to this node; omit to query the whole cluster",
);
const VMID: ParamSpec = ParamSpec::required("vmid", Number, "VM ID");
const CTID: ParamSpec = ParamSpec::required("vmid", Number, "Container ID");
const STORAGE: ParamSpec = ParamSpec::required("storage", Str, "Storage ID (e.g. local-lvm)");
const SNAPNAME: ParamSpec = ParamSpec::required("snapname", Str, "Snapshot name");
const TIMEOUT: ParamSpec =
    ParamSpec::optional("timeout", Number, "Seconds to wait before giving up");

const BACKUP_MODES: &[&str] = &["snapshot", "suspend", "stop"];
const BACKUP_COMPRESSION: &[&str] = &["0", "gzip", "lzo", "zstd"];

// ===================================================================
// The catalog
// ===================================================================

pub static OPERATIONS: &[Operation] = &[
    // ── Cluster / node ──────────────────────────────────────────────
    Operation {
        name: "pve_list_nodes",
        description: "List all nodes in the Proxmox cluster with status and usage",
        params: &[],
        route: Route::Get("/nodes"),
        render: Render::Json,
    },
    Operation {
        name: "pve_get_node_status",
        description: "Get raw status of a node (CPU, memory, uptime, versions)",
        params: &[NODE],
        route: Route::Get("/nodes/{node}/status"),
        render: Render::Json,
    },
    Operation {
        name: "pve_get_node_resources",
        description: "Summarize node resource usage with human-readable sizes and percentages",
        params: &[NODE],
        route: Route::Get("/nodes/{node}/status"),
        render: Render::NodeResources,
    },
    Operation {
        name: "pve_get_cluster_status",
        description: "Get cluster membership and quorum status",
        params: &[],
        route: Route::Get("/cluster/status"),
        render: Render::Json,
    },
    // ── QEMU virtual machines ───────────────────────────────────────
    Operation {
        name: "pve_list_vms",
        description: "List QEMU virtual machines on a node, or across the cluster when no node is given",
        params: &[NODE_SCOPE],
        route: Route::Scoped {
            param: "node",
            scoped: &Route::Get("/nodes/{node}/qemu"),
            fallback: &Route::Get("/cluster/resources?type=vm"),
        },
        render: Render::FilterType("qemu"),
    },
    Operation {
        name: "pve_get_vm_status",
        description: "Get the current runtime status of a VM",
        params: &[NODE, VMID],
        route: Route::Get("/nodes/{node}/qemu/{vmid}/status/current"),
        render: Render::Json,
    },
    Operation {
        name: "pve_get_vm_config",
        description: "Get the configuration of a VM",
        params: &[NODE, VMID],
        route: Route::Get("/nodes/{node}/qemu/{vmid}/config"),
        render: Render::Json,
    },
    Operation {
        name: "pve_start_vm",
        description: "Start a VM",
        params: &[NODE, VMID],
        route: Route::Post("/nodes/{node}/qemu/{vmid}/status/start"),
        render: Render::Task("VM start"),
    },
    Operation {
        name: "pve_stop_vm",
        description: "Stop a VM immediately (like pulling the power cord)",
        params: &[NODE, VMID, TIMEOUT],
        route: Route::Post("/nodes/{node}/qemu/{vmid}/status/stop"),
        render: Render::Task("VM stop"),
    },
    Operation {
        name: "pve_shutdown_vm",
        description: "Gracefully shut down a VM via ACPI",
        params: &[
            NODE,
            VMID,
            TIMEOUT,
            ParamSpec::optional(
                "force_stop",
                Boolean,
                "Hard stop the VM if it has not shut down when the timeout expires",
            )
            .wire("forceStop"),
        ],
        route: Route::Post("/nodes/{node}/qemu/{vmid}/status/shutdown"),
        render: Render::Task("VM shutdown"),
    },
    Operation {
        name: "pve_reboot_vm",
        description: "Reboot a VM by shutting it down and starting it again",
        params: &[NODE, VMID, TIMEOUT],
        route: Route::Post("/nodes/{node}/qemu/{vmid}/status/reboot"),
        render: Render::Task("VM reboot"),
    },
    Operation {
        name: "pve_create_vm",
        description: "Create a new QEMU VM",
        params: &[
            NODE,
            VMID,
            ParamSpec::optional("name", Str, "VM name"),
            ParamSpec::optional("memory", Number, "Memory in MiB"),
            ParamSpec::optional("cores", Number, "CPU cores per socket"),
            ParamSpec::optional("sockets", Number, "CPU sockets"),
            ParamSpec::optional("cpu", Str, "CPU type (e.g. host, x86-64-v2-AES)"),
            ParamSpec::optional("ostype", Str, "Guest OS type (e.g. l26, win11)"),
            ParamSpec::optional("net0", Str, "Network device (e.g. virtio,bridge=vmbr0)"),
            ParamSpec::optional("scsi0", Str, "Primary disk (e.g. local-lvm:32)"),
            ParamSpec::optional("ide2", Str, "CD-ROM (e.g. local:iso/debian.iso,media=cdrom)"),
            ParamSpec::optional("boot", Str, "Boot order (e.g. order=scsi0;ide2)"),
            ParamSpec::optional("agent", Boolean, "Enable the QEMU guest agent"),
            ParamSpec::optional("start", Boolean, "Start the VM after creation"),
            ParamSpec::optional("description", Str, "Free-form notes"),
        ],
        route: Route::Post("/nodes/{node}/qemu"),
        render: Render::Task("VM creation"),
    },
    Operation {
        name: "pve_clone_vm",
        description: "Clone a VM or template",
        params: &[
            NODE,
            VMID,
            ParamSpec::required("newid", Number, "VM ID for the clone"),
            ParamSpec::optional("name", Str, "Name of the clone"),
            ParamSpec::optional("target", Str, "Target node"),
            ParamSpec::optional("full", Boolean, "Full clone instead of linked clone"),
            ParamSpec::optional("storage", Str, "Target storage for a full clone"),
            ParamSpec::optional("description", Str, "Description of the clone"),
        ],
        route: Route::Post("/nodes/{node}/qemu/{vmid}/clone"),
        render: Render::Task("VM clone"),
    },
    Operation {
        name: "pve_delete_vm",
        description: "Destroy a VM and its disks",
        params: &[
            NODE,
            VMID,
            ParamSpec::optional("purge", Boolean, "Remove the VM from backup jobs, replication and HA"),
            ParamSpec::optional(
                "destroy_unreferenced_disks",
                Boolean,
                "Also destroy disks not referenced in the config",
            )
            .wire("destroy-unreferenced-disks"),
        ],
        route: Route::Delete("/nodes/{node}/qemu/{vmid}"),
        render: Render::Task("VM deletion"),
    },
    Operation {
        name: "pve_migrate_vm",
        description: "Migrate a VM to another node",
        params: &[
            NODE,
            VMID,
            ParamSpec::required("target", Str, "Target node"),
            ParamSpec::optional("online", Boolean, "Live-migrate a running VM"),
            ParamSpec::optional("with_local_disks", Boolean, "Migrate local disks too")
                .wire("with-local-disks"),
        ],
        route: Route::Post("/nodes/{node}/qemu/{vmid}/migrate"),
        render: Render::Task("VM migration"),
    },
    // ── LXC containers ──────────────────────────────────────────────
    Operation {
        name: "pve_list_containers",
        description: "List LXC containers on a node, or across the cluster when no node is given",
        params: &[NODE_SCOPE],
        route: Route::Scoped {
            param: "node",
            scoped: &Route::Get("/nodes/{node}/lxc"),
            fallback: &Route::Get("/cluster/resources?type=vm"),
        },
        render: Render::FilterType("lxc"),
    },
    Operation {
        name: "pve_start_container",
        description: "Start an LXC container",
        params: &[NODE, CTID],
        route: Route::Post("/nodes/{node}/lxc/{vmid}/status/start"),
        render: Render::Task("Container start"),
    },
    Operation {
        name: "pve_stop_container",
        description: "Stop an LXC container immediately",
        params: &[NODE, CTID],
        route: Route::Post("/nodes/{node}/lxc/{vmid}/status/stop"),
        render: Render::Task("Container stop"),
    },
    Operation {
        name: "pve_create_container",
        description: "Create a new LXC container from a template",
        params: &[
            NODE,
            CTID,
            ParamSpec::required(
                "ostemplate",
                Str,
                "Template volume (e.g. local:vztmpl/debian-12-standard_12.2-1_amd64.tar.zst)",
            ),
            ParamSpec::optional("hostname", Str, "Container hostname"),
            ParamSpec::optional("memory", Number, "Memory in MiB"),
            ParamSpec::optional("cores", Number, "CPU cores"),
            ParamSpec::optional("rootfs", Str, "Root volume (e.g. local-lvm:8)"),
            ParamSpec::optional("net0", Str, "Network device (e.g. name=eth0,bridge=vmbr0,ip=dhcp)"),
            ParamSpec::optional("password", Str, "Root password"),
            ParamSpec::optional("storage", Str, "Default storage"),
            ParamSpec::optional("unprivileged", Boolean, "Create an unprivileged container"),
            ParamSpec::optional("start", Boolean, "Start the container after creation"),
        ],
        route: Route::Post("/nodes/{node}/lxc"),
        render: Render::Task("Container creation"),
    },
    // ── Storage ─────────────────────────────────────────────────────
    Operation {
        name: "pve_list_storage",
        description: "List storage on a node, or the cluster storage configuration when no node is given",
        params: &[NODE_SCOPE],
        route: Route::Scoped {
            param: "node",
            scoped: &Route::Get("/nodes/{node}/storage"),
            fallback: &Route::Get("/storage"),
        },
        render: Render::Json,
    },
    Operation {
        name: "pve_get_storage_content",
        description: "List volumes on a storage (images, ISOs, templates, backups)",
        params: &[
            NODE,
            STORAGE,
            ParamSpec::optional("content", Str, "Content type filter (images, iso, vztmpl, backup, rootdir)"),
            ParamSpec::optional("vmid", Number, "Only volumes owned by this VM"),
        ],
        route: Route::Get("/nodes/{node}/storage/{storage}/content"),
        render: Render::Json,
    },
    // ── Backup ──────────────────────────────────────────────────────
    Operation {
        name: "pve_create_backup",
        description: "Back up a VM or container with vzdump",
        params: &[
            NODE,
            VMID,
            ParamSpec::optional("storage", Str, "Target storage"),
            ParamSpec::optional("mode", ParamKind::Enum(BACKUP_MODES), "Backup mode"),
            ParamSpec::optional("compress", ParamKind::Enum(BACKUP_COMPRESSION), "Compression"),
            ParamSpec::optional("remove", Boolean, "Prune older backups according to retention"),
        ],
        route: Route::Post("/nodes/{node}/vzdump"),
        render: Render::Task("Backup"),
    },
    Operation {
        name: "pve_list_backups",
        description: "List backup archives on a storage",
        params: &[
            NODE,
            STORAGE,
            ParamSpec::optional("vmid", Number, "Only backups of this VM"),
        ],
        route: Route::Get("/nodes/{node}/storage/{storage}/content?content=backup"),
        render: Render::Json,
    },
    // ── Snapshots ───────────────────────────────────────────────────
    Operation {
        name: "pve_list_snapshots",
        description: "List snapshots of a VM",
        params: &[NODE, VMID],
        route: Route::Get("/nodes/{node}/qemu/{vmid}/snapshot"),
        render: Render::Json,
    },
    Operation {
        name: "pve_create_snapshot",
        description: "Create a snapshot of a VM",
        params: &[
            NODE,
            VMID,
            SNAPNAME,
            ParamSpec::optional("description", Str, "Snapshot description"),
            ParamSpec::optional("vmstate", Boolean, "Include RAM state"),
        ],
        route: Route::Post("/nodes/{node}/qemu/{vmid}/snapshot"),
        render: Render::Task("Snapshot creation"),
    },
    Operation {
        name: "pve_rollback_snapshot",
        description: "Roll a VM back to a snapshot",
        params: &[NODE, VMID, SNAPNAME],
        route: Route::Post("/nodes/{node}/qemu/{vmid}/snapshot/{snapname}/rollback"),
        render: Render::Task("Snapshot rollback"),
    },
    Operation {
        name: "pve_delete_snapshot",
        description: "Delete a VM snapshot",
        params: &[
            NODE,
            VMID,
            SNAPNAME,
            ParamSpec::optional("force", Boolean, "Remove from config even if removing disk snapshots fails"),
        ],
        route: Route::Delete("/nodes/{node}/qemu/{vmid}/snapshot/{snapname}"),
        render: Render::Task("Snapshot deletion"),
    },
    // ── Tasks ───────────────────────────────────────────────────────
    Operation {
        name: "pve_list_tasks",
        description: "List recent tasks on a node",
        params: &[
            NODE,
            ParamSpec::optional("limit", Number, "Maximum number of tasks"),
            ParamSpec::optional("vmid", Number, "Only tasks for this VM"),
            ParamSpec::optional("errors", Boolean, "Only failed tasks"),
        ],
        route: Route::Get("/nodes/{node}/tasks"),
        render: Render::Json,
    },
    Operation {
        name: "pve_get_task_status",
        description: "Get the status of a task by UPID",
        params: &[
            NODE,
            ParamSpec::required("upid", Str, "Task UPID returned by a mutating operation"),
        ],
        route: Route::Get("/nodes/{node}/tasks/{upid}/status"),
        render: Render::Json,
    },
    // ── Network ─────────────────────────────────────────────────────
    Operation {
        name: "pve_list_networks",
        description: "List network interfaces and bridges on a node",
        params: &[
            NODE,
            ParamSpec::optional("type", Str, "Interface type filter (e.g. bridge, bond, any_bridge)"),
        ],
        route: Route::Get("/nodes/{node}/network"),
        render: Render::Json,
    },
    // ── Infrastructure as code ──────────────────────────────────────
    Operation {
        name: "pve_generate_terraform",
        description: "Generate a Terraform proxmox_vm_qemu resource from an existing VM's configuration",
        params: &[NODE, VMID],
        route: Route::Get("/nodes/{node}/qemu/{vmid}/config"),
        render: Render::Terraform,
    },
    Operation {
        name: "pve_generate_terraform_provider",
        description: "Generate the Terraform provider configuration for this Proxmox endpoint",
        params: &[],
        route: Route::Local,
        render: Render::TerraformProvider,
    },
];
