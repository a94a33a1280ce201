//! In-memory gateway for tests.
//!
//! Mirrors the backend's persistence rules (unique names, unique active tool
//! prefixes) and counts every call so tests can assert that a step made no
//! network round trip. Slow tools run in a spawned task that only stops when
//! the cancellation token fires, so cancellation is observable.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::gateway::{Gateway, GatewayFailure, GatewayResult};
use crate::record::{ContentBlock, ServerRecord, ToolCallResult, ToolDescriptor};

#[derive(Default)]
struct State {
    servers: Vec<ServerRecord>,
    tools: HashMap<String, Vec<ToolDescriptor>>,
    results: HashMap<(String, String), ToolCallResult>,
    delays: HashMap<String, Duration>,
    tool_failures: HashMap<String, GatewayFailure>,
    fail_next: Option<GatewayFailure>,
    /// Failure for the call with this 1-based sequence number.
    fail_at: Option<(usize, GatewayFailure)>,
    invocations: Vec<(String, String, Map<String, Value>)>,
}

#[derive(Default)]
pub(crate) struct InMemoryGateway {
    state: Mutex<State>,
    calls: AtomicUsize,
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicUsize>,
}

fn rejected(code: i64, message: &str) -> GatewayFailure {
    GatewayFailure::Rejected {
        code,
        message: message.to_string(),
    }
}

fn not_found() -> GatewayFailure {
    rejected(404, "MCP server not found")
}

impl InMemoryGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_servers(servers: Vec<ServerRecord>) -> Self {
        let gateway = Self::new();
        gateway.lock().servers = servers;
        gateway
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("gateway state poisoned")
    }

    /// Count the call and pop a queued one-shot failure, if any.
    fn enter(&self) -> GatewayResult<()> {
        let seq = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.lock();
        if let Some(failure) = state.fail_next.take() {
            return Err(failure);
        }
        if state.fail_at.as_ref().is_some_and(|(at, _)| *at == seq) {
            if let Some((_, failure)) = state.fail_at.take() {
                return Err(failure);
            }
        }
        Ok(())
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn completed_calls(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub(crate) fn cancelled_calls(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn invocations(&self) -> Vec<(String, String, Map<String, Value>)> {
        self.lock().invocations.clone()
    }

    pub(crate) fn set_tools(&self, server: &str, tools: Vec<ToolDescriptor>) {
        self.lock().tools.insert(server.to_string(), tools);
    }

    pub(crate) fn set_result(&self, server: &str, tool: &str, result: ToolCallResult) {
        self.lock()
            .results
            .insert((server.to_string(), tool.to_string()), result);
    }

    pub(crate) fn set_delay(&self, tool: &str, delay: Duration) {
        self.lock().delays.insert(tool.to_string(), delay);
    }

    pub(crate) fn fail_tools(&self, server: &str, failure: GatewayFailure) {
        self.lock().tool_failures.insert(server.to_string(), failure);
    }

    pub(crate) fn fail_next(&self, failure: GatewayFailure) {
        self.lock().fail_next = Some(failure);
    }

    /// Let `skip` calls through, then fail the one after.
    pub(crate) fn fail_after(&self, skip: usize, failure: GatewayFailure) {
        let at = self.calls() + skip + 1;
        self.lock().fail_at = Some((at, failure));
    }

    /// Change persisted state behind the registry's back.
    pub(crate) fn push_raw(&self, record: ServerRecord) {
        self.lock().servers.push(record);
    }

    pub(crate) fn deactivate_externally(&self, name: &str) {
        if let Some(record) = self.lock().servers.iter_mut().find(|s| s.name == name) {
            record.is_active = false;
        }
    }

    fn check_prefix(state: &State, record: &ServerRecord, skip: Option<&str>) -> GatewayResult<()> {
        if !record.is_active || record.tool_prefix.is_empty() {
            return Ok(());
        }
        let taken = state.servers.iter().any(|s| {
            Some(s.name.as_str()) != skip && s.is_active && s.tool_prefix == record.tool_prefix
        });
        if taken {
            return Err(rejected(409, "tool prefix already in use"));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn list_servers(&self) -> GatewayResult<Vec<ServerRecord>> {
        self.enter()?;
        Ok(self.lock().servers.clone())
    }

    async fn get_server(&self, name: &str) -> GatewayResult<ServerRecord> {
        self.enter()?;
        self.lock()
            .servers
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create_server(&self, record: &ServerRecord) -> GatewayResult<ServerRecord> {
        self.enter()?;
        let mut state = self.lock();
        if state.servers.iter().any(|s| s.name == record.name) {
            return Err(rejected(409, "MCP server already exists"));
        }
        Self::check_prefix(&state, record, None)?;
        state.servers.push(record.clone());
        Ok(record.clone())
    }

    async fn update_server(&self, name: &str, record: &ServerRecord) -> GatewayResult<ServerRecord> {
        self.enter()?;
        let mut state = self.lock();
        Self::check_prefix(&state, record, Some(name))?;
        let slot = state
            .servers
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(not_found)?;
        *slot = ServerRecord {
            name: name.to_string(),
            ..record.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_server(&self, name: &str) -> GatewayResult<()> {
        self.enter()?;
        let mut state = self.lock();
        let before = state.servers.len();
        state.servers.retain(|s| s.name != name);
        if state.servers.len() == before {
            return Err(not_found());
        }
        state.tools.remove(name);
        Ok(())
    }

    async fn toggle_server(&self, name: &str, is_active: bool) -> GatewayResult<ServerRecord> {
        self.enter()?;
        let mut state = self.lock();
        let slot = state
            .servers
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(not_found)?;
        slot.is_active = is_active;
        Ok(slot.clone())
    }

    async fn list_tools(&self, name: &str) -> GatewayResult<Vec<ToolDescriptor>> {
        self.enter()?;
        let state = self.lock();
        if !state.servers.iter().any(|s| s.name == name) {
            return Err(not_found());
        }
        if let Some(failure) = state.tool_failures.get(name) {
            return Err(failure.clone());
        }
        Ok(state.tools.get(name).cloned().unwrap_or_default())
    }

    async fn toggle_tool(
        &self,
        name: &str,
        tool: &str,
        is_enabled: bool,
    ) -> GatewayResult<ToolDescriptor> {
        self.enter()?;
        let mut state = self.lock();
        let slot = state
            .tools
            .get_mut(name)
            .and_then(|tools| tools.iter_mut().find(|t| t.name == tool))
            .ok_or_else(|| rejected(404, "Tool not found"))?;
        slot.is_enabled = is_enabled;
        Ok(slot.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        tool: &str,
        arguments: Map<String, Value>,
        cancel: CancellationToken,
    ) -> GatewayResult<ToolCallResult> {
        self.enter()?;
        let (delay, result) = {
            let mut state = self.lock();
            if !state.servers.iter().any(|s| s.name == name) {
                return Err(not_found());
            }
            state
                .invocations
                .push((name.to_string(), tool.to_string(), arguments));
            let result = state
                .results
                .get(&(name.to_string(), tool.to_string()))
                .cloned()
                .unwrap_or_else(|| {
                    ToolCallResult::success(vec![ContentBlock::text(&format!("{} ok", tool))])
                });
            (state.delays.get(tool).copied(), result)
        };

        let Some(delay) = delay else {
            self.completed.fetch_add(1, Ordering::SeqCst);
            return Ok(result);
        };

        let completed = self.completed.clone();
        let cancelled = self.cancelled.clone();
        let work = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(result)
                }
                _ = cancel.cancelled() => {
                    cancelled.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayFailure::Network("call cancelled".to_string()))
                }
            }
        });
        work.await
            .map_err(|e| GatewayFailure::Network(e.to_string()))?
    }
}
