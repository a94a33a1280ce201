//! Tool namespacing for the exposed tool surface.
//!
//! A server with a non-empty `toolPrefix` exposes each tool as
//! `prefix_tool` (e.g., `aliyun-ack_list_clusters`) and its description is
//! prepended with `[via server]`. Servers without a prefix expose tools
//! under their own names.

use crate::record::{ServerRecord, ToolDescriptor};

/// Separator between a tool prefix and the tool name.
pub const PREFIX_SEPARATOR: char = '_';

/// A discovered tool as surfaced downstream, with its routing target.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedTool {
    pub server: String,
    pub original_name: String,
    pub tool: ToolDescriptor,
}

/// Prefix a tool name. An empty prefix leaves the name untouched.
pub fn prefixed_name(prefix: &str, tool: &str) -> String {
    if prefix.is_empty() {
        tool.to_string()
    } else {
        format!("{}{}{}", prefix, PREFIX_SEPARATOR, tool)
    }
}

/// Strip `prefix` from an exposed name. Returns None when it does not carry it.
pub fn strip_prefix<'a>(prefix: &str, exposed: &'a str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(exposed);
    }
    exposed
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(PREFIX_SEPARATOR))
        .filter(|rest| !rest.is_empty())
}

/// Expose `tool` under its owning server's prefix.
pub fn namespace_tool(record: &ServerRecord, mut tool: ToolDescriptor) -> ExposedTool {
    let original_name = tool.name.clone();
    tool.name = record.exposed_tool_name(&original_name);
    if let Some(desc) = tool.description.as_mut() {
        *desc = format!("[via {}] {}", record.name, desc);
    }
    ExposedTool {
        server: record.name.clone(),
        original_name,
        tool,
    }
}
