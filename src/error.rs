//! Error types for Switchboard registry and dispatch operations.

use std::fmt;

use thiserror::Error;

use crate::gateway::{GatewayFailure, GatewayOp};

/// Server and tool names attached to a failed gateway operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpContext {
    pub server: Option<String>,
    pub tool: Option<String>,
}

impl OpContext {
    pub fn server(name: &str) -> Self {
        Self {
            server: Some(name.to_string()),
            tool: None,
        }
    }

    pub fn tool(server: &str, tool: &str) -> Self {
        Self {
            server: Some(server.to_string()),
            tool: Some(tool.to_string()),
        }
    }
}

impl fmt::Display for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.server, &self.tool) {
            (Some(server), Some(tool)) => write!(f, " (server '{}', tool '{}')", server, tool),
            (Some(server), None) => write!(f, " (server '{}')", server),
            (None, Some(tool)) => write!(f, " (tool '{}')", tool),
            (None, None) => Ok(()),
        }
    }
}

/// Stable classification of a [`SwitchboardError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    ToolNotFound,
    InactiveServer,
    Gateway,
    Upstream,
    Timeout,
    Unavailable,
    Config,
}

/// Main error type for Switchboard operations
#[derive(Error, Debug)]
pub enum SwitchboardError {
    /// Malformed or incomplete input, caught before any network call
    #[error("invalid request for server '{0}': {1}")]
    Validation(String, String),

    /// Name or tool prefix already taken
    #[error("conflict for server '{0}': {1}")]
    Conflict(String, String),

    /// No server with this name; the gateway's message, when it reported it
    #[error("server '{0}' not found{suffix}", suffix = detail_suffix(.1))]
    NotFound(String, Option<String>),

    /// The server exists but does not expose this tool
    #[error("tool '{1}' not found on server '{0}'")]
    ToolNotFound(String, String),

    /// Invocation refused because the server is disabled
    #[error("server '{0}' is inactive")]
    InactiveServer(String),

    /// The backend gateway could not be reached or answered unusably
    #[error("gateway {op} failed{context}: {message}")]
    Gateway {
        op: GatewayOp,
        context: OpContext,
        message: String,
    },

    /// The gateway answered, but the target tool server failed
    #[error("tool server failed during {op}{context}: {message}")]
    Upstream {
        op: GatewayOp,
        context: OpContext,
        message: String,
    },

    /// Invocation exceeded its ceiling and was cancelled
    #[error("call to tool '{tool}' on server '{server}' timed out after {timeout_ms}ms")]
    Timeout {
        server: String,
        tool: String,
        timeout_ms: u64,
    },

    /// No successful list fetch has completed this session
    #[error("server list unavailable: registry has not been refreshed yet")]
    Unavailable,

    /// Invalid switchboard configuration
    #[error("invalid config: {0}")]
    Config(String),
}

impl SwitchboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(..) => ErrorKind::Validation,
            Self::Conflict(..) => ErrorKind::Conflict,
            Self::NotFound(..) => ErrorKind::NotFound,
            Self::ToolNotFound(..) => ErrorKind::ToolNotFound,
            Self::InactiveServer(_) => ErrorKind::InactiveServer,
            Self::Gateway { .. } => ErrorKind::Gateway,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Unavailable => ErrorKind::Unavailable,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Classify a gateway failure for `op`, keeping the server/tool context.
    ///
    /// A 400 on invoke that reports the server inactive maps to
    /// `InactiveServer`; 404 maps to `ToolNotFound` when a tool is missing and
    /// `NotFound` otherwise; 409 maps to `Conflict`. These need a server name
    /// in `context`. Any other rejection is an upstream failure when the
    /// operation reaches the tool server itself, and a gateway failure
    /// otherwise. Network and decoding failures are always gateway failures.
    pub fn from_gateway(op: GatewayOp, context: OpContext, failure: GatewayFailure) -> Self {
        let (code, message) = match failure {
            GatewayFailure::Rejected { code, message } => (code, message),
            other => {
                return Self::Gateway {
                    op,
                    context,
                    message: other.to_string(),
                };
            }
        };

        match (code, context.server.clone()) {
            (400, Some(server)) if op == GatewayOp::CallTool && reports_inactive(&message) => {
                Self::InactiveServer(server)
            }
            (404, Some(server)) => match (op, &context.tool) {
                (GatewayOp::ToggleTool, Some(tool)) => Self::ToolNotFound(server, tool.clone()),
                (GatewayOp::CallTool, Some(tool)) if mentions_tool(&message) => {
                    Self::ToolNotFound(server, tool.clone())
                }
                _ => Self::NotFound(server, Some(message)),
            },
            (409, Some(server)) => Self::Conflict(server, message),
            _ if op.reaches_tool_server() => Self::Upstream {
                op,
                context,
                message,
            },
            _ => Self::Gateway {
                op,
                context,
                message,
            },
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

fn reports_inactive(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("not active") || message.contains("inactive")
}

fn mentions_tool(message: &str) -> bool {
    message.to_ascii_lowercase().contains("tool")
}

/// Result type alias for Switchboard operations
pub type Result<T> = std::result::Result<T, SwitchboardError>;
