//! Switchboard configuration: deserialization and validation.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::dispatch::TimeoutPolicy;
use crate::error::SwitchboardError;

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only. Returns `None` if the value is not a
/// valid env-var reference.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Resolve header values: `${VAR}` references are read from the environment,
/// anything else is taken literally. Unknown variables resolve to the empty
/// string.
pub fn resolve_env_vars(values: &HashMap<String, String>) -> HashMap<String, String> {
    values
        .iter()
        .map(|(k, v)| {
            let resolved = match parse_env_ref(v) {
                Some(var_name) => std::env::var(var_name).unwrap_or_default(),
                None => v.clone(),
            };
            (k.clone(), resolved)
        })
        .collect()
}

/// Top-level configuration, parsed from `switchboard.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwitchboardConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Where the backend gateway lives and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for registry calls. Invocations use the per-server timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Extra request headers; values may be `${VAR}` references.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Ceiling applied to servers marked `longRunning`.
    #[serde(default = "default_long_running_timeout_ms")]
    pub long_running_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// How often the MCP bridge re-reads the registry.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api/v1/mcp".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_long_running_timeout_ms() -> u64 {
    600_000
}

fn default_refresh_interval_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            headers: HashMap::new(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            long_running_timeout_ms: default_long_running_timeout_ms(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SwitchboardConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: SwitchboardConfig =
            toml::from_str(content).map_err(|e| SwitchboardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SwitchboardError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate the config, failing fast before any gateway client is built.
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: String| Err(SwitchboardError::Config(msg));

        // 1. Gateway base URL must be absolute http(s)
        match Url::parse(&self.gateway.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return invalid(format!(
                    "gateway.base_url must use http or https, got '{}'",
                    url.scheme()
                ));
            }
            Err(e) => {
                return invalid(format!(
                    "gateway.base_url '{}' is not a valid URL: {}",
                    self.gateway.base_url, e
                ));
            }
        }

        // 2. Timeouts must be positive
        if self.gateway.request_timeout_secs == 0 {
            return invalid("gateway.request_timeout_secs must be > 0".to_string());
        }
        if self.dispatch.long_running_timeout_ms == 0 {
            return invalid("dispatch.long_running_timeout_ms must be > 0".to_string());
        }
        if self.bridge.refresh_interval_secs == 0 {
            return invalid("bridge.refresh_interval_secs must be > 0".to_string());
        }

        // 3. Header values that look like references must be well-formed
        for (key, value) in &self.gateway.headers {
            if key.trim().is_empty() {
                return invalid("gateway header names must be non-empty".to_string());
            }
            if value.starts_with("${") && parse_env_ref(value).is_none() {
                return invalid(format!(
                    "header '{}' has a malformed ${{VAR}} reference: '{}'",
                    key, value
                ));
            }
        }

        Ok(())
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            long_running_ceiling: Duration::from_millis(self.dispatch.long_running_timeout_ms),
        }
    }
}
