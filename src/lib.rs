//! Switchboard: registry and tool dispatcher for MCP servers.
//!
//! Keeps a session view of the servers a backend gateway has registered,
//! mutates them through the gateway with refresh-after-write semantics,
//! discovers their tools and invokes them under per-server timeouts. The
//! [`bridge`] module re-exposes the discovered tools as one MCP server.

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod import;
pub mod namespace;
pub mod record;
pub mod registry;
pub mod transport;

pub use bridge::SwitchboardMcpServer;
pub use config::{SwitchboardConfig, parse_env_ref, resolve_env_vars};
pub use dispatch::{Dispatcher, TimeoutPolicy, clean_arguments};
pub use error::{ErrorKind, OpContext, Result, SwitchboardError};
pub use gateway::http::HttpGateway;
pub use gateway::{Gateway, GatewayFailure, GatewayOp};
pub use import::{ImportFailure, ImportReport};
pub use namespace::ExposedTool;
pub use record::{ContentBlock, ServerRecord, ToolCallResult, ToolDescriptor, ToolSet};
pub use registry::Registry;
pub use transport::{Transport, TransportKind};
