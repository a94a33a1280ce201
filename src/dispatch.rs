//! Tool invocation with per-server timeouts and cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{OpContext, SwitchboardError};
use crate::gateway::{Gateway, GatewayOp};
use crate::record::{ServerRecord, ToolCallResult};
use crate::registry::Registry;

/// Default ceiling for servers marked `longRunning`: ten minutes.
pub const DEFAULT_LONG_RUNNING_CEILING: Duration = Duration::from_secs(600);

/// How the effective timeout of one invocation is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Applied instead of a shorter record timeout on long-running servers.
    pub long_running_ceiling: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            long_running_ceiling: DEFAULT_LONG_RUNNING_CEILING,
        }
    }
}

impl TimeoutPolicy {
    /// The record's own timeout, raised to the ceiling for long-running servers.
    pub fn effective(&self, record: &ServerRecord) -> Duration {
        let own = Duration::from_millis(record.timeout);
        if record.long_running {
            own.max(self.long_running_ceiling)
        } else {
            own
        }
    }
}

/// Drop top-level arguments that are `null` or the empty string.
///
/// Clients fill optional form fields with blanks; tool servers tend to treat
/// a present-but-empty argument as a real value.
pub fn clean_arguments(arguments: Map<String, Value>) -> Map<String, Value> {
    arguments
        .into_iter()
        .filter(|(_, v)| match v {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
        .collect()
}

/// Accept an object or `null`; anything else is a caller error.
fn argument_map(server: &str, arguments: Value) -> crate::Result<Map<String, Value>> {
    match arguments {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(SwitchboardError::Validation(
            server.to_string(),
            format!("tool arguments must be a JSON object, got {}", json_type(&other)),
        )),
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Routes tool calls to registered servers through the gateway.
pub struct Dispatcher<G> {
    registry: Arc<Registry<G>>,
    policy: TimeoutPolicy,
}

impl<G> Clone for Dispatcher<G> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            policy: self.policy,
        }
    }
}

impl<G: Gateway> Dispatcher<G> {
    pub fn new(registry: Arc<Registry<G>>, policy: TimeoutPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &Arc<Registry<G>> {
        &self.registry
    }

    /// Invoke `tool` on `server` and return its result.
    ///
    /// A result with `isError: true` is returned as `Ok`; only transport,
    /// lookup, state and timeout problems are errors. On timeout the
    /// in-flight call is cancelled before the error is returned.
    pub async fn invoke(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> crate::Result<ToolCallResult> {
        if server.trim().is_empty() {
            return Err(SwitchboardError::Validation(
                server.to_string(),
                "server name is required".to_string(),
            ));
        }
        if tool.trim().is_empty() {
            return Err(SwitchboardError::Validation(
                server.to_string(),
                "tool name is required".to_string(),
            ));
        }
        let arguments = clean_arguments(argument_map(server, arguments)?);

        let record = match self.registry.get(server).await {
            Err(SwitchboardError::Unavailable) => {
                self.registry.refresh().await?;
                self.registry.get(server).await?
            }
            other => other?,
        };
        if !record.is_active {
            return Err(SwitchboardError::InactiveServer(server.to_string()));
        }

        let timeout = self.policy.effective(&record);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let outcome = tokio::select! {
            result = self.registry.gateway().call_tool(server, tool, arguments, cancel.clone()) => Some(result),
            _ = tokio::time::sleep(timeout) => None,
        };
        let latency_ms = millis(started.elapsed());

        match outcome {
            Some(Ok(result)) => {
                tracing::info!(
                    server = %server,
                    tool = %tool,
                    latency_ms,
                    is_error = result.is_logical_failure(),
                    "tool invoked"
                );
                Ok(result)
            }
            Some(Err(failure)) => {
                let err = SwitchboardError::from_gateway(
                    GatewayOp::CallTool,
                    OpContext::tool(server, tool),
                    failure,
                );
                tracing::warn!(server = %server, tool = %tool, latency_ms, error = %err, "tool invocation failed");
                Err(err)
            }
            None => {
                cancel.cancel();
                let timeout_ms = millis(timeout);
                tracing::warn!(server = %server, tool = %tool, timeout_ms, "tool invocation timed out");
                Err(SwitchboardError::Timeout {
                    server: server.to_string(),
                    tool: tool.to_string(),
                    timeout_ms,
                })
            }
        }
    }
}
