//! MCP bridge: serves the registry's exposed tools to MCP clients.

pub mod refresh;
pub mod server;

pub use refresh::{notify_peers, refresh_exposed, run_refresh_loop};
pub use server::{PeerList, SwitchboardMcpServer};
