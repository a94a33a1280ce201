//! Transport descriptors: the closed set of ways a tool server is reached.
//!
//! On the wire a transport is flattened into its server record next to a
//! `type` tag (`stdio`, `sse`, `streamableHttp`).

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::record::null_as_default;

/// Connection kind of a registered server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportKind {
    Stdio,
    Sse,
    #[serde(alias = "streamable-http")]
    StreamableHttp,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
            TransportKind::StreamableHttp => "streamableHttp",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport descriptor with the fields each kind requires.
///
/// Missing string fields decode as empty so that [`Transport::validate`]
/// can report them, instead of failing inside the JSON decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Transport {
    Stdio {
        #[serde(default, deserialize_with = "null_as_default")]
        command: String,
        #[serde(default, deserialize_with = "null_as_default")]
        args: Vec<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        env: BTreeMap<String, String>,
    },
    Sse {
        #[serde(default, alias = "url", deserialize_with = "null_as_default")]
        base_url: String,
        #[serde(default, deserialize_with = "null_as_default")]
        headers: BTreeMap<String, String>,
    },
    #[serde(alias = "streamable-http")]
    StreamableHttp {
        #[serde(default, alias = "url", deserialize_with = "null_as_default")]
        base_url: String,
        #[serde(default, deserialize_with = "null_as_default")]
        headers: BTreeMap<String, String>,
    },
}

impl Transport {
    pub fn stdio(command: &str, args: &[&str]) -> Self {
        Transport::Stdio {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn sse(base_url: &str) -> Self {
        Transport::Sse {
            base_url: base_url.to_string(),
            headers: BTreeMap::new(),
        }
    }

    pub fn streamable_http(base_url: &str) -> Self {
        Transport::StreamableHttp {
            base_url: base_url.to_string(),
            headers: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Stdio { .. } => TransportKind::Stdio,
            Transport::Sse { .. } => TransportKind::Sse,
            Transport::StreamableHttp { .. } => TransportKind::StreamableHttp,
        }
    }

    /// Check the kind-specific required fields. Returns the reason on failure.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Transport::Stdio { command, env, .. } => {
                if command.trim().is_empty() {
                    return Err("stdio transport requires 'command'".to_string());
                }
                if env.keys().any(|k| k.trim().is_empty()) {
                    return Err("env keys must be non-empty".to_string());
                }
            }
            Transport::Sse { base_url, headers } | Transport::StreamableHttp { base_url, headers } => {
                let kind = self.kind();
                if base_url.trim().is_empty() {
                    return Err(format!("{} transport requires 'baseUrl'", kind));
                }
                let url = Url::parse(base_url)
                    .map_err(|e| format!("baseUrl '{}' is not a valid URL: {}", base_url, e))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(format!(
                        "baseUrl '{}' must use http or https, got '{}'",
                        base_url,
                        url.scheme()
                    ));
                }
                if headers.keys().any(|k| k.trim().is_empty()) {
                    return Err("header names must be non-empty".to_string());
                }
            }
        }
        Ok(())
    }
}
