//! MCP server handler for the Proxmox gateway.
//!
//! Tools are not declared one method per tool. `tools/list` is generated from
//! the operation catalog and `tools/call` hands the name and arguments to the
//! [`Dispatcher`]. Operation failures come back as error-flagged tool results,
//! not protocol errors, so the client model can read the message.

use std::fmt;
use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData, RoleServer, ServerHandler,
};
use serde_json::{Map, Value};

use crate::api::ApiTransport;
use crate::dispatch::Dispatcher;

// ===================================================================
// ProxmoxTools: the MCP server handler
// ===================================================================

/// Exposes every catalog operation as an MCP tool.
///
/// Cheap to clone; all clones share one [`Dispatcher`].
pub struct ProxmoxTools<T> {
    dispatcher: Arc<Dispatcher<T>>,
}

impl<T> Clone for ProxmoxTools<T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<T> fmt::Debug for ProxmoxTools<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxmoxTools")
            .field("dispatcher", &"<Dispatcher>")
            .finish()
    }
}

impl<T: ApiTransport + 'static> ProxmoxTools<T> {
    pub fn new(dispatcher: Arc<Dispatcher<T>>) -> Self {
        Self { dispatcher }
    }

    /// Tool descriptors in catalog order.
    pub fn tool_definitions(&self) -> Vec<Tool> {
        self.dispatcher
            .catalog()
            .operations()
            .iter()
            .map(|op| Tool::new(op.name, op.description, Arc::new(op.input_schema())))
            .collect()
    }

    /// Run one tool call. Never fails at the protocol level.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> CallToolResult {
        let arguments = arguments.unwrap_or_default();
        match self.dispatcher.dispatch(name, &arguments).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }
}

// -------------------------------------------------------------------
// ServerHandler implementation
// -------------------------------------------------------------------

impl<T: ApiTransport + 'static> ServerHandler for ProxmoxTools<T> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Proxmox VE management tools. \
                 Mutating tools return a task UPID immediately; \
                 use pve_get_task_status to follow a task to completion."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tool_definitions()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.invoke(&request.name, request.arguments).await)
    }
}
