//! Server records, tool descriptors and invocation results.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SwitchboardError;
use crate::namespace::prefixed_name;
use crate::transport::Transport;

/// Default per-invocation ceiling when a record omits `timeout`.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Decode `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_enabled() -> bool {
    true
}

/// One registered tool provider, keyed by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub name: String,
    #[serde(flatten)]
    pub transport: Transport,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logo_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub install_source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_prefix: String,
    #[serde(default)]
    pub auto_register: bool,
    #[serde(default)]
    pub long_running: bool,
    /// Per-invocation ceiling in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout: u64,
}

impl ServerRecord {
    /// An active record with empty metadata and the default timeout.
    pub fn new(name: &str, transport: Transport) -> Self {
        Self {
            name: name.to_string(),
            transport,
            is_active: true,
            description: String::new(),
            provider: String::new(),
            provider_url: String::new(),
            logo_url: String::new(),
            tags: BTreeSet::new(),
            install_source: String::new(),
            tool_prefix: String::new(),
            auto_register: false,
            long_running: false,
            timeout: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Validate identity, timeout, prefix and transport fields.
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: &str| SwitchboardError::Validation(self.name.clone(), msg.to_string());

        if self.name.trim().is_empty() {
            return Err(invalid("name must be non-empty"));
        }
        if self.name.trim() != self.name {
            return Err(invalid("name must not have leading or trailing whitespace"));
        }
        if self.timeout == 0 {
            return Err(invalid("timeout must be a positive number of milliseconds"));
        }
        if self.tool_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("toolPrefix must not contain whitespace"));
        }
        self.transport
            .validate()
            .map_err(|msg| SwitchboardError::Validation(self.name.clone(), msg))
    }

    /// Name under which `tool` is exposed downstream.
    pub fn exposed_tool_name(&self, tool: &str) -> String {
        prefixed_name(&self.tool_prefix, tool)
    }
}

/// A tool advertised by a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form argument schema; validation is left to the tool server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

impl ToolDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            input_schema: None,
            is_enabled: true,
        }
    }
}

/// Reject tool metadata a server should never produce: empty or duplicate names.
pub fn validate_tool_set(tools: &[ToolDescriptor]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for tool in tools {
        if tool.name.trim().is_empty() {
            return Err("server advertised a tool with an empty name".to_string());
        }
        if !seen.insert(tool.name.as_str()) {
            return Err(format!("server advertised tool '{}' more than once", tool.name));
        }
    }
    Ok(())
}

/// Discovery state of one server's tools.
///
/// `Unknown` means no discovery ran this session; `Discovered` holds the
/// last answer, which may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolSet {
    #[default]
    Unknown,
    Discovered(Vec<ToolDescriptor>),
}

impl ToolSet {
    pub fn is_discovered(&self) -> bool {
        matches!(self, ToolSet::Discovered(_))
    }

    /// Discovered tools, or an empty slice when unknown.
    pub fn tools(&self) -> &[ToolDescriptor] {
        match self {
            ToolSet::Unknown => &[],
            ToolSet::Discovered(tools) => tools,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools().iter().find(|t| t.name == name)
    }
}

/// One block of an invocation's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    /// Non-text blocks (images, resources) decode with an empty text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

impl ContentBlock {
    pub fn text(text: &str) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.to_string(),
        }
    }
}

/// Normalized result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<ContentBlock>,
    /// `Some(true)` when the tool reported a logical failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    pub fn success(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            is_error: Some(false),
        }
    }

    pub fn failure(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            is_error: Some(true),
        }
    }

    pub fn is_logical_failure(&self) -> bool {
        self.is_error == Some(true)
    }
}
