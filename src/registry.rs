//! Registry: the session's authoritative view of registered tool servers.
//!
//! Every mutation goes through the gateway and then re-reads the full server
//! list; the local view is replaced wholesale and never patched. A failed
//! refresh leaves the view at its last confirmed state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;

use crate::error::{OpContext, SwitchboardError};
use crate::gateway::{Gateway, GatewayOp};
use crate::namespace::{ExposedTool, namespace_tool, strip_prefix};
use crate::record::{ServerRecord, ToolDescriptor, ToolSet, validate_tool_set};

#[derive(Default)]
struct RegistryState {
    /// `None` until the first successful list fetch.
    servers: Option<Arc<Vec<ServerRecord>>>,
    /// Discovered tool sets; a missing entry means not yet discovered.
    tools: HashMap<String, Vec<ToolDescriptor>>,
}

/// The single owner of the server list for one session.
///
/// Construct one per session or request context; instances share nothing.
pub struct Registry<G> {
    gateway: Arc<G>,
    state: RwLock<RegistryState>,
}

impl<G: Gateway> Registry<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway: Arc::new(gateway),
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Fetch the full server list and atomically replace the view.
    ///
    /// A listing with duplicate names is rejected and the previous view kept.
    pub async fn refresh(&self) -> crate::Result<Vec<ServerRecord>> {
        let servers = self.gateway.list_servers().await.map_err(|f| {
            SwitchboardError::from_gateway(GatewayOp::ListServers, OpContext::default(), f)
        })?;

        let mut names = HashSet::new();
        for record in &servers {
            if !names.insert(record.name.as_str()) {
                return Err(SwitchboardError::Gateway {
                    op: GatewayOp::ListServers,
                    context: OpContext::server(&record.name),
                    message: "listing contains duplicate server name".to_string(),
                });
            }
        }

        let mut state = self.state.write().await;
        state.tools.retain(|name, _| names.contains(name.as_str()));
        let snapshot = Arc::new(servers);
        state.servers = Some(snapshot.clone());
        drop(state);

        tracing::debug!(count = snapshot.len(), "server list refreshed");
        Ok(snapshot.as_ref().clone())
    }

    /// Last-known server set.
    pub async fn list(&self) -> crate::Result<Vec<ServerRecord>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.as_ref().clone())
    }

    /// Look up one server in the last-known set.
    pub async fn get(&self, name: &str) -> crate::Result<ServerRecord> {
        let snapshot = self.snapshot().await?;
        snapshot
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| SwitchboardError::NotFound(name.to_string(), None))
    }

    /// Read one record straight from the gateway without touching the view.
    pub async fn fetch(&self, name: &str) -> crate::Result<ServerRecord> {
        self.gateway.get_server(name).await.map_err(|f| {
            SwitchboardError::from_gateway(GatewayOp::GetServer, OpContext::server(name), f)
        })
    }

    pub async fn register(&self, record: ServerRecord) -> crate::Result<ServerRecord> {
        record.validate()?;
        if self.is_known(&record.name).await {
            return Err(SwitchboardError::Conflict(
                record.name.clone(),
                "a server with this name is already registered".to_string(),
            ));
        }

        self.gateway.create_server(&record).await.map_err(|f| {
            SwitchboardError::from_gateway(GatewayOp::CreateServer, OpContext::server(&record.name), f)
        })?;
        tracing::info!(
            server = %record.name,
            transport = %record.transport.kind(),
            "server registered"
        );

        self.refresh().await?;
        self.get(&record.name).await
    }

    /// Replace the record stored under `name`.
    ///
    /// Renames and transport-kind changes are rejected; remove and register
    /// again instead.
    pub async fn update(&self, name: &str, record: ServerRecord) -> crate::Result<ServerRecord> {
        if record.name != name {
            return Err(SwitchboardError::Validation(
                name.to_string(),
                format!(
                    "renaming to '{}' is not supported; remove and register instead",
                    record.name
                ),
            ));
        }
        record.validate()?;

        let current = self.current(name).await?;
        if current.transport.kind() != record.transport.kind() {
            return Err(SwitchboardError::Validation(
                name.to_string(),
                format!(
                    "transport cannot change from {} to {}; remove and register instead",
                    current.transport.kind(),
                    record.transport.kind()
                ),
            ));
        }

        self.gateway.update_server(name, &record).await.map_err(|f| {
            SwitchboardError::from_gateway(GatewayOp::UpdateServer, OpContext::server(name), f)
        })?;
        tracing::info!(server = %name, "server updated");

        // Connection details may have changed; tools must be asked for again.
        self.state.write().await.tools.remove(name);
        self.refresh().await?;
        self.get(name).await
    }

    /// Remove a server. An unknown name is reported, not ignored.
    ///
    /// The view is re-read after the delete. If that re-read fails the error
    /// is returned even though the delete itself went through, and the view
    /// keeps listing the server until the next successful refresh.
    pub async fn remove(&self, name: &str) -> crate::Result<()> {
        self.current(name).await?;
        self.gateway.delete_server(name).await.map_err(|f| {
            SwitchboardError::from_gateway(GatewayOp::DeleteServer, OpContext::server(name), f)
        })?;
        tracing::info!(server = %name, "server removed");

        self.refresh().await?;
        Ok(())
    }

    pub async fn set_active(&self, name: &str, is_active: bool) -> crate::Result<ServerRecord> {
        self.current(name).await?;
        self.gateway.toggle_server(name, is_active).await.map_err(|f| {
            SwitchboardError::from_gateway(GatewayOp::ToggleServer, OpContext::server(name), f)
        })?;
        tracing::info!(server = %name, is_active, "server activity toggled");

        self.refresh().await?;
        self.get(name).await
    }

    /// Fetch and store the tool set of one server.
    pub async fn discover_tools(&self, name: &str) -> crate::Result<Vec<ToolDescriptor>> {
        self.current(name).await?;
        let tools = self.gateway.list_tools(name).await.map_err(|f| {
            SwitchboardError::from_gateway(GatewayOp::ListTools, OpContext::server(name), f)
        })?;
        validate_tool_set(&tools).map_err(|message| SwitchboardError::Upstream {
            op: GatewayOp::ListTools,
            context: OpContext::server(name),
            message,
        })?;

        let mut state = self.state.write().await;
        let still_known = state
            .servers
            .as_ref()
            .is_some_and(|servers| servers.iter().any(|s| s.name == name));
        if still_known {
            state.tools.insert(name.to_string(), tools.clone());
        }
        drop(state);

        tracing::info!(server = %name, tool_count = tools.len(), "tools discovered");
        Ok(tools)
    }

    /// Discovery state of one server's tools.
    pub async fn tools(&self, name: &str) -> crate::Result<ToolSet> {
        self.get(name).await?;
        let state = self.state.read().await;
        Ok(match state.tools.get(name) {
            Some(tools) => ToolSet::Discovered(tools.clone()),
            None => ToolSet::Unknown,
        })
    }

    /// Enable or disable one tool, then re-discover the server's tools.
    pub async fn set_tool_enabled(
        &self,
        name: &str,
        tool: &str,
        is_enabled: bool,
    ) -> crate::Result<ToolDescriptor> {
        if tool.trim().is_empty() {
            return Err(SwitchboardError::Validation(
                name.to_string(),
                "tool name is required".to_string(),
            ));
        }
        self.current(name).await?;
        let updated = self
            .gateway
            .toggle_tool(name, tool, is_enabled)
            .await
            .map_err(|f| {
                SwitchboardError::from_gateway(GatewayOp::ToggleTool, OpContext::tool(name, tool), f)
            })?;
        tracing::info!(server = %name, tool = %tool, is_enabled, "tool toggled");

        self.discover_tools(name).await?;
        Ok(updated)
    }

    /// Discover tools of every active auto-register server concurrently.
    ///
    /// Failures are logged and skipped. Returns the number of servers whose
    /// discovery succeeded.
    pub async fn discover_auto_registered(&self) -> crate::Result<usize> {
        let targets: Vec<String> = self
            .snapshot()
            .await?
            .iter()
            .filter(|s| s.is_active && s.auto_register)
            .map(|s| s.name.clone())
            .collect();

        let results = join_all(targets.iter().map(|name| self.discover_tools(name))).await;
        let mut discovered = 0;
        for (name, result) in targets.iter().zip(results) {
            match result {
                Ok(_) => discovered += 1,
                Err(e) => tracing::warn!(server = %name, error = %e, "tool discovery failed"),
            }
        }
        Ok(discovered)
    }

    /// Namespaced, enabled tools of active auto-register servers.
    ///
    /// Servers are visited in name order; when two servers expose the same
    /// name, the first one wins and the clash is logged.
    pub async fn exposed_tools(&self) -> crate::Result<Vec<ExposedTool>> {
        let mut servers = self.snapshot().await?.as_ref().clone();
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        let state = self.state.read().await;

        let mut seen = HashSet::new();
        let mut exposed = Vec::new();
        for record in servers.iter().filter(|s| s.is_active && s.auto_register) {
            let Some(tools) = state.tools.get(&record.name) else {
                continue;
            };
            for tool in tools.iter().filter(|t| t.is_enabled) {
                let item = namespace_tool(record, tool.clone());
                if !seen.insert(item.tool.name.clone()) {
                    tracing::warn!(
                        server = %record.name,
                        tool = %item.tool.name,
                        "exposed tool name already taken, skipping"
                    );
                    continue;
                }
                exposed.push(item);
            }
        }
        Ok(exposed)
    }

    /// Map an exposed tool name back to `(server, tool)`.
    pub async fn resolve_exposed_tool(&self, exposed_name: &str) -> crate::Result<(String, String)> {
        let exposed = self.exposed_tools().await?;
        if let Some(found) = exposed.into_iter().find(|t| t.tool.name == exposed_name) {
            return Ok((found.server, found.original_name));
        }

        // Name the server whose prefix matches, for a readable error.
        let owner = self
            .snapshot()
            .await?
            .iter()
            .filter(|s| !s.tool_prefix.is_empty())
            .find(|s| strip_prefix(&s.tool_prefix, exposed_name).is_some())
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "unknown".to_string());
        Err(SwitchboardError::ToolNotFound(owner, exposed_name.to_string()))
    }

    async fn snapshot(&self) -> crate::Result<Arc<Vec<ServerRecord>>> {
        self.state
            .read()
            .await
            .servers
            .clone()
            .ok_or(SwitchboardError::Unavailable)
    }

    async fn is_known(&self, name: &str) -> bool {
        match self.snapshot().await {
            Ok(servers) => servers.iter().any(|s| s.name == name),
            Err(_) => false,
        }
    }

    /// Look up `name` for a mutation, warming a cold view first.
    async fn current(&self, name: &str) -> crate::Result<ServerRecord> {
        if self.state.read().await.servers.is_none() {
            self.refresh().await?;
        }
        self.get(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::gateway::GatewayFailure;
    use crate::gateway::memory::InMemoryGateway;
    use crate::transport::Transport;
    use serde_json::json;

    fn weather() -> ServerRecord {
        let mut record = ServerRecord::new("weather", Transport::streamable_http("https://x"));
        record.timeout = 5000;
        record
    }

    fn forecast_tool() -> ToolDescriptor {
        ToolDescriptor {
            description: Some("Forecast for a city".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            })),
            ..ToolDescriptor::new("get_forecast")
        }
    }

    async fn warm(gateway: InMemoryGateway) -> Registry<InMemoryGateway> {
        let registry = Registry::new(gateway);
        registry.refresh().await.unwrap();
        registry
    }

    #[tokio::test]
    async fn test_list_cold_is_unavailable() {
        let registry = Registry::new(InMemoryGateway::new());
        assert!(matches!(registry.list().await, Err(SwitchboardError::Unavailable)));
        assert!(matches!(registry.get("weather").await, Err(SwitchboardError::Unavailable)));
    }

    #[tokio::test]
    async fn test_register_then_list_contains_exactly_one() {
        let registry = warm(InMemoryGateway::new()).await;
        let created = registry.register(weather()).await.unwrap();
        assert_eq!(created, weather());

        let servers = registry.list().await.unwrap();
        let matching: Vec<_> = servers.iter().filter(|s| s.name == "weather").collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0], &weather());
    }

    #[tokio::test]
    async fn test_register_on_cold_registry_refreshes() {
        let registry = Registry::new(InMemoryGateway::new());
        registry.register(weather()).await.unwrap();
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_register_conflicts_without_network() {
        let registry = warm(InMemoryGateway::new()).await;
        registry.register(weather()).await.unwrap();
        let calls = registry.gateway().calls();

        let mut again = weather();
        again.description = "second".to_string();
        let result = registry.register(again).await;
        assert!(matches!(result, Err(SwitchboardError::Conflict(name, _)) if name == "weather"));
        assert_eq!(registry.gateway().calls(), calls);

        let servers = registry.list().await.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].description, "");
    }

    #[tokio::test]
    async fn test_gateway_conflict_surfaces_when_view_is_stale() {
        // Someone else registered the name after our last refresh.
        let registry = warm(InMemoryGateway::new()).await;
        registry.gateway().push_raw(weather());
        let result = registry.register(weather()).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_tool_prefix_collision_is_conflict() {
        let mut first = weather();
        first.tool_prefix = "wx".to_string();
        let registry = warm(InMemoryGateway::with_servers(vec![first])).await;

        let mut second = ServerRecord::new("weather-eu", Transport::sse("https://eu"));
        second.tool_prefix = "wx".to_string();
        let result = registry.register(second).await;
        assert!(
            matches!(&result, Err(SwitchboardError::Conflict(name, msg)) if name == "weather-eu" && msg.contains("prefix"))
        );
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_invalid_record_makes_no_call() {
        let registry = Registry::new(InMemoryGateway::new());
        let mut record = weather();
        record.timeout = 0;
        let result = registry.register(record).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(registry.gateway().calls(), 0);
    }

    #[tokio::test]
    async fn test_remove_then_get_not_found() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        registry.remove("weather").await.unwrap();
        assert!(matches!(registry.get("weather").await, Err(SwitchboardError::NotFound(n, _)) if n == "weather"));
    }

    #[tokio::test]
    async fn test_remove_with_failed_reread_still_deleted() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        registry
            .gateway()
            .fail_after(1, GatewayFailure::Network("connection reset".to_string()));

        let err = registry.remove("weather").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Gateway);
        // Delete went through; only the view is behind.
        assert_eq!(registry.fetch("weather").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert!(registry.get("weather").await.is_ok());

        registry.refresh().await.unwrap();
        assert_eq!(registry.get("weather").await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_unknown_is_not_found() {
        let registry = warm(InMemoryGateway::new()).await;
        assert_eq!(
            registry.remove("ghost").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_update_roundtrip() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        let mut changed = weather();
        changed.description = "Weather forecasts".to_string();
        changed.tags.insert("forecast".to_string());
        changed.transport = Transport::streamable_http("https://y");
        changed.long_running = true;

        registry.update("weather", changed.clone()).await.unwrap();
        assert_eq!(registry.get("weather").await.unwrap(), changed);
    }

    #[tokio::test]
    async fn test_update_rename_rejected() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        let calls = registry.gateway().calls();
        let mut renamed = weather();
        renamed.name = "climate".to_string();
        let result = registry.update("weather", renamed).await;
        assert!(matches!(&result, Err(SwitchboardError::Validation(n, msg)) if n == "weather" && msg.contains("renaming")));
        assert_eq!(registry.gateway().calls(), calls);
    }

    #[tokio::test]
    async fn test_update_transport_kind_change_rejected() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        let mut changed = weather();
        changed.transport = Transport::stdio("weather-mcp", &[]);
        let result = registry.update("weather", changed).await;
        assert!(matches!(&result, Err(SwitchboardError::Validation(_, msg)) if msg.contains("transport")));
    }

    #[tokio::test]
    async fn test_update_unknown_not_found() {
        let registry = warm(InMemoryGateway::new()).await;
        let result = registry.update("weather", weather()).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_set_active_reflects_gateway_state() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        let record = registry.set_active("weather", false).await.unwrap();
        assert!(!record.is_active);
        assert!(!registry.get("weather").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_set_active_picks_up_backend_side_effects() {
        let mut other = ServerRecord::new("flaky", Transport::sse("https://f"));
        other.is_active = true;
        let registry = warm(InMemoryGateway::with_servers(vec![weather(), other])).await;

        // Backend disabled `flaky` on its own (e.g. failed health check).
        registry.gateway().deactivate_externally("flaky");
        registry.set_active("weather", true).await.unwrap();
        assert!(!registry.get("flaky").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_view() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        registry
            .gateway()
            .fail_next(GatewayFailure::Network("connection refused".to_string()));
        let result = registry.refresh().await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Gateway);
        assert_eq!(registry.list().await.unwrap(), vec![weather()]);
    }

    #[tokio::test]
    async fn test_duplicate_listing_rejected() {
        let gateway = InMemoryGateway::with_servers(vec![weather()]);
        let registry = warm(gateway).await;
        registry.gateway().push_raw(weather());
        assert!(registry.refresh().await.is_err());
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tools_tri_state() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        assert_eq!(registry.tools("weather").await.unwrap(), ToolSet::Unknown);

        let tools = registry.discover_tools("weather").await.unwrap();
        assert!(tools.is_empty());
        assert_eq!(
            registry.tools("weather").await.unwrap(),
            ToolSet::Discovered(vec![])
        );
    }

    #[tokio::test]
    async fn test_discover_tools_stores_and_keeps_record() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        registry.gateway().set_tools("weather", vec![forecast_tool()]);

        let tools = registry.discover_tools("weather").await.unwrap();
        assert_eq!(tools, vec![forecast_tool()]);
        assert_eq!(registry.get("weather").await.unwrap(), weather());
        assert!(registry.tools("weather").await.unwrap().get("get_forecast").is_some());
    }

    #[tokio::test]
    async fn test_discover_unknown_server_not_found() {
        let registry = warm(InMemoryGateway::new()).await;
        assert_eq!(
            registry.discover_tools("ghost").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_discover_upstream_failure_is_distinct() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        registry.gateway().fail_tools(
            "weather",
            GatewayFailure::Rejected {
                code: 500,
                message: "failed to connect MCP server".to_string(),
            },
        );
        let err = registry.discover_tools("weather").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().contains("weather"));
    }

    #[tokio::test]
    async fn test_discover_malformed_tools_is_upstream() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        registry
            .gateway()
            .set_tools("weather", vec![forecast_tool(), forecast_tool()]);
        let err = registry.discover_tools("weather").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(registry.tools("weather").await.unwrap(), ToolSet::Unknown);
    }

    #[tokio::test]
    async fn test_remove_discards_tool_set() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        registry.gateway().set_tools("weather", vec![forecast_tool()]);
        registry.discover_tools("weather").await.unwrap();
        registry.remove("weather").await.unwrap();

        registry.register(weather()).await.unwrap();
        assert_eq!(registry.tools("weather").await.unwrap(), ToolSet::Unknown);
    }

    #[tokio::test]
    async fn test_set_tool_enabled_rediscovers() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        registry.gateway().set_tools("weather", vec![forecast_tool()]);
        registry.discover_tools("weather").await.unwrap();

        let tool = registry
            .set_tool_enabled("weather", "get_forecast", false)
            .await
            .unwrap();
        assert!(!tool.is_enabled);
        let stored = registry.tools("weather").await.unwrap();
        assert!(!stored.get("get_forecast").unwrap().is_enabled);
    }

    #[tokio::test]
    async fn test_set_tool_enabled_unknown_tool() {
        let registry = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        let result = registry.set_tool_enabled("weather", "nope", true).await;
        assert!(matches!(result, Err(SwitchboardError::ToolNotFound(s, t)) if s == "weather" && t == "nope"));
    }

    #[tokio::test]
    async fn test_fetch_reads_gateway_without_touching_view() {
        let registry = warm(InMemoryGateway::new()).await;
        registry.gateway().push_raw(weather());
        assert_eq!(registry.fetch("weather").await.unwrap(), weather());
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_independent_instances() {
        let a = warm(InMemoryGateway::with_servers(vec![weather()])).await;
        let b = Registry::new(InMemoryGateway::new());
        assert_eq!(a.list().await.unwrap().len(), 1);
        assert!(matches!(b.list().await, Err(SwitchboardError::Unavailable)));
    }

    fn auto(name: &str, prefix: &str) -> ServerRecord {
        let mut record = ServerRecord::new(name, Transport::sse("https://x"));
        record.auto_register = true;
        record.tool_prefix = prefix.to_string();
        record
    }

    #[tokio::test]
    async fn test_exposed_tools_namespaced_and_filtered() {
        let mut inactive = auto("archive", "arc");
        inactive.is_active = false;
        let manual = ServerRecord::new("manual", Transport::sse("https://m"));
        let gateway =
            InMemoryGateway::with_servers(vec![auto("weather", "wx"), inactive, manual]);
        gateway.set_tools("weather", vec![forecast_tool(), ToolDescriptor {
            is_enabled: false,
            ..ToolDescriptor::new("get_alerts")
        }]);
        gateway.set_tools("archive", vec![ToolDescriptor::new("search")]);
        gateway.set_tools("manual", vec![ToolDescriptor::new("run")]);
        let registry = warm(gateway).await;

        let discovered = registry.discover_auto_registered().await.unwrap();
        assert_eq!(discovered, 1);

        let exposed = registry.exposed_tools().await.unwrap();
        let names: Vec<&str> = exposed.iter().map(|t| t.tool.name.as_str()).collect();
        assert_eq!(names, vec!["wx_get_forecast"]);

        let target = registry.resolve_exposed_tool("wx_get_forecast").await.unwrap();
        assert_eq!(target, ("weather".to_string(), "get_forecast".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_unknown_exposed_tool() {
        let registry = warm(InMemoryGateway::with_servers(vec![auto("weather", "wx")])).await;
        let result = registry.resolve_exposed_tool("wx_missing").await;
        assert!(matches!(result, Err(SwitchboardError::ToolNotFound(s, t)) if s == "weather" && t == "wx_missing"));
    }
}
