//! Backend gateway boundary.
//!
//! The gateway persists server records and performs the transport-specific
//! calls. [`Gateway`] is the seam the registry and dispatcher talk through;
//! [`http::HttpGateway`] is the REST implementation.

pub mod http;

#[cfg(test)]
pub(crate) mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::record::{ServerRecord, ToolCallResult, ToolDescriptor};

/// Gateway operations, used to classify failures and label logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOp {
    ListServers,
    GetServer,
    CreateServer,
    UpdateServer,
    DeleteServer,
    ToggleServer,
    ListTools,
    ToggleTool,
    CallTool,
}

impl GatewayOp {
    /// Whether the gateway must talk to the tool server to answer.
    pub fn reaches_tool_server(&self) -> bool {
        match self {
            GatewayOp::ListTools | GatewayOp::ToggleTool | GatewayOp::CallTool => true,
            GatewayOp::ListServers
            | GatewayOp::GetServer
            | GatewayOp::CreateServer
            | GatewayOp::UpdateServer
            | GatewayOp::DeleteServer
            | GatewayOp::ToggleServer => false,
        }
    }
}

impl fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GatewayOp::ListServers => "list servers",
            GatewayOp::GetServer => "get server",
            GatewayOp::CreateServer => "register server",
            GatewayOp::UpdateServer => "update server",
            GatewayOp::DeleteServer => "delete server",
            GatewayOp::ToggleServer => "toggle server",
            GatewayOp::ListTools => "discover tools",
            GatewayOp::ToggleTool => "toggle tool",
            GatewayOp::CallTool => "invoke tool",
        };
        f.write_str(label)
    }
}

/// Raw failure reported by a gateway implementation, before classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayFailure {
    /// Connection-level failure, or an HTTP error without an envelope
    #[error("network error: {0}")]
    Network(String),

    /// The gateway answered with a non-200 envelope code
    #[error("{message} (code {code})")]
    Rejected { code: i64, message: String },

    /// The response could not be decoded
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayFailure>;

/// The backend service that owns persisted registry state.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_servers(&self) -> GatewayResult<Vec<ServerRecord>>;

    async fn get_server(&self, name: &str) -> GatewayResult<ServerRecord>;

    async fn create_server(&self, record: &ServerRecord) -> GatewayResult<ServerRecord>;

    /// Full replacement of the record stored under `name`.
    async fn update_server(&self, name: &str, record: &ServerRecord) -> GatewayResult<ServerRecord>;

    async fn delete_server(&self, name: &str) -> GatewayResult<()>;

    async fn toggle_server(&self, name: &str, is_active: bool) -> GatewayResult<ServerRecord>;

    async fn list_tools(&self, name: &str) -> GatewayResult<Vec<ToolDescriptor>>;

    async fn toggle_tool(
        &self,
        name: &str,
        tool: &str,
        is_enabled: bool,
    ) -> GatewayResult<ToolDescriptor>;

    /// Invoke one tool. Implementations must stop work once `cancel` fires.
    async fn call_tool(
        &self,
        name: &str,
        tool: &str,
        arguments: Map<String, Value>,
        cancel: CancellationToken,
    ) -> GatewayResult<ToolCallResult>;
}
