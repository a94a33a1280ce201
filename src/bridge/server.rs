//! SwitchboardMcpServer: rmcp ServerHandler over the registry and dispatcher.
//!
//! Lists the namespaced tools of active auto-register servers and routes
//! each call back to its owning server through the [`Dispatcher`]. Connected
//! peers are kept so the refresh loop can broadcast tools-list-changed.

use std::sync::Arc;

use rmcp::ErrorData as McpError;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, JsonObject, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{NotificationContext, Peer, RequestContext, RoleServer};
use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::error::SwitchboardError;
use crate::gateway::Gateway;
use crate::namespace::ExposedTool;
use crate::record::ToolCallResult;
use crate::registry::Registry;

pub type PeerList = Arc<tokio::sync::Mutex<Vec<Peer<RoleServer>>>>;

/// Convert an exposed tool into its MCP listing entry.
///
/// Tools without an object schema are advertised as taking an empty object.
pub fn to_mcp_tool(exposed: &ExposedTool) -> Tool {
    let input_schema: JsonObject = match &exposed.tool.input_schema {
        Some(Value::Object(schema)) => schema.clone(),
        _ => {
            let mut schema = JsonObject::new();
            schema.insert("type".to_string(), Value::String("object".to_string()));
            schema.insert("properties".to_string(), Value::Object(JsonObject::new()));
            schema
        }
    };
    Tool {
        name: exposed.tool.name.clone().into(),
        title: None,
        description: exposed.tool.description.clone().map(Into::into),
        input_schema: Arc::new(input_schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

/// Convert a gateway result into an MCP call result. Non-text blocks are
/// passed on as a short text marker.
pub fn to_mcp_result(result: ToolCallResult) -> CallToolResult {
    let is_error = result.is_logical_failure();
    let content = result
        .content
        .into_iter()
        .map(|block| {
            if block.kind == "text" {
                Content::text(block.text)
            } else {
                Content::text(format!("[{} content]", block.kind))
            }
        })
        .collect();
    CallToolResult {
        content,
        is_error: Some(is_error),
        structured_content: None,
        meta: None,
    }
}

fn to_mcp_error(err: SwitchboardError) -> McpError {
    match err {
        SwitchboardError::Validation(..) | SwitchboardError::ToolNotFound(..) => {
            McpError::invalid_params(err.to_string(), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}

/// MCP server exposing the registry's tools.
///
/// Clones share the dispatcher (and through it the registry) and the peer
/// list, so `StreamableHttpService` can build one per session.
pub struct SwitchboardMcpServer<G> {
    dispatcher: Dispatcher<G>,
    peers: PeerList,
}

impl<G> Clone for SwitchboardMcpServer<G> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            peers: self.peers.clone(),
        }
    }
}

impl<G: Gateway + 'static> SwitchboardMcpServer<G> {
    pub fn new(dispatcher: Dispatcher<G>) -> Self {
        Self {
            dispatcher,
            peers: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn registry(&self) -> Arc<Registry<G>> {
        self.dispatcher.registry().clone()
    }

    /// Peer list handle for the refresh loop.
    pub fn peers_handle(&self) -> PeerList {
        self.peers.clone()
    }

    /// Current MCP tool listing.
    pub async fn mcp_tools(&self) -> Result<Vec<Tool>, McpError> {
        let exposed = self
            .dispatcher
            .registry()
            .exposed_tools()
            .await
            .map_err(to_mcp_error)?;
        Ok(exposed.iter().map(to_mcp_tool).collect())
    }

    /// Route a call on an exposed name to its owning server.
    pub async fn route_call(
        &self,
        exposed_name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let (server, tool) = self
            .dispatcher
            .registry()
            .resolve_exposed_tool(exposed_name)
            .await
            .map_err(to_mcp_error)?;
        let arguments = arguments.map(Value::Object).unwrap_or(Value::Null);
        let result = self
            .dispatcher
            .invoke(&server, &tool, arguments)
            .await
            .map_err(to_mcp_error)?;
        Ok(to_mcp_result(result))
    }
}

impl<G: Gateway + 'static> ServerHandler for SwitchboardMcpServer<G> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "switchboard".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Switchboard: exposes the tools of registered MCP servers under their tool prefixes."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.mcp_tools().await?,
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.route_call(&request.name, request.arguments).await
    }

    async fn on_initialized(&self, context: NotificationContext<RoleServer>) {
        tracing::info!("MCP client initialized, storing peer for tool list notifications");
        self.peers.lock().await.push(context.peer.clone());
    }
}
