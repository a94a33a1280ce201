//! Periodic registry refresh for the MCP bridge.
//!
//! Every tick re-reads the server list, re-discovers the tools of active
//! auto-register servers and, when the exposed surface changed, sends
//! tools-list-changed to every connected peer. Stale peers are pruned on
//! notification error. A failed refresh keeps the previous view.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bridge::server::PeerList;
use crate::gateway::Gateway;
use crate::registry::Registry;

/// Refresh the registry and report whether the exposed tools changed.
pub async fn refresh_exposed<G: Gateway>(registry: &Registry<G>) -> crate::Result<bool> {
    let before = registry.exposed_tools().await.unwrap_or_default();
    registry.refresh().await?;
    let discovered = registry.discover_auto_registered().await?;
    let after = registry.exposed_tools().await?;

    let changed = before != after;
    tracing::debug!(
        servers_discovered = discovered,
        exposed_tools = after.len(),
        changed,
        "registry refreshed"
    );
    Ok(changed)
}

/// Run the refresh loop until `cancel` fires.
///
/// The first tick fires immediately so the bridge starts with a warm view.
pub async fn run_refresh_loop<G: Gateway>(
    registry: Arc<Registry<G>>,
    peers: PeerList,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match refresh_exposed(&registry).await {
                    Ok(true) => {
                        tracing::info!("exposed tools changed, notifying peers");
                        notify_peers(&peers).await;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "registry refresh failed, keeping previous view");
                    }
                }
            }
            _ = cancel.cancelled() => {
                tracing::debug!("refresh loop cancelled");
                return;
            }
        }
    }
}

/// Notify all connected peers of a tools-list-changed event.
pub async fn notify_peers(peers: &PeerList) {
    let mut peers = peers.lock().await;
    let mut live_peers = Vec::with_capacity(peers.len());
    for peer in peers.drain(..) {
        match peer.notify_tool_list_changed().await {
            Ok(_) => live_peers.push(peer),
            Err(e) => {
                tracing::debug!(error = %e, "pruning stale peer after tools-list-changed error");
            }
        }
    }
    *peers = live_peers;
}
