//! Switchboard: operator CLI and MCP bridge for the tool-server registry.
//!
//! Registry commands talk to the gateway and print JSON to stdout. `serve`
//! and `stdio` expose the discovered tools as one MCP server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use axum::http::Request;
use axum::response::IntoResponse;
use clap::{Parser, Subcommand};
use nimbus_switchboard::bridge::run_refresh_loop;
use nimbus_switchboard::{
    Dispatcher, HttpGateway, Registry, ServerRecord, SwitchboardConfig, SwitchboardMcpServer,
};
use rmcp::ServiceExt;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt as TowerServiceExt;
use tracing_subscriber::EnvFilter;

/// Switchboard: registry and tool dispatcher for MCP servers.
#[derive(Parser)]
#[command(
    name = "switchboard",
    version,
    about = "Switchboard: registry and tool dispatcher for MCP servers"
)]
struct Cli {
    /// Path to switchboard.toml [default: ./switchboard.toml or ~/.config/switchboard/switchboard.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override the gateway base URL from the config file
    #[arg(long, global = true)]
    gateway: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered servers
    List,
    /// Show one server
    Get { name: String },
    /// Register a server from a JSON record file
    Add {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Replace a server's record from a JSON record file
    Update {
        name: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Remove a server
    Remove { name: String },
    /// Activate a server
    Enable { name: String },
    /// Deactivate a server
    Disable { name: String },
    /// Discover and print a server's tools
    Tools { name: String },
    /// Enable or disable one tool of a server
    ToggleTool {
        server: String,
        tool: String,
        /// Disable the tool instead of enabling it
        #[arg(long)]
        disable: bool,
    },
    /// Invoke a tool
    Call {
        server: String,
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
    /// Import servers from an `{"mcpServers": {...}}` JSON file
    Import { file: PathBuf },
    /// Start a Streamable HTTP MCP server exposing the registry's tools
    Serve {
        /// HTTP port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Bridge the registry's tools over STDIO
    Stdio,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON output and the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config, cli.gateway).await?;
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down Switchboard...");
        cancel_for_signal.cancel();
    });

    let gateway = HttpGateway::new(&config.gateway)
        .map_err(|e| anyhow::anyhow!("Failed to build gateway client: {}", e))?;
    let registry = Arc::new(Registry::new(gateway));

    match cli.command {
        Commands::List => {
            let servers = registry.refresh().await?;
            print_json(&servers)?;
        }
        Commands::Get { name } => {
            print_json(&registry.fetch(&name).await?)?;
        }
        Commands::Add { file } => {
            let record = read_record(&file).await?;
            print_json(&registry.register(record).await?)?;
        }
        Commands::Update { name, file } => {
            let record = read_record(&file).await?;
            print_json(&registry.update(&name, record).await?)?;
        }
        Commands::Remove { name } => {
            registry.remove(&name).await?;
            tracing::info!(server = %name, "removed");
        }
        Commands::Enable { name } => {
            print_json(&registry.set_active(&name, true).await?)?;
        }
        Commands::Disable { name } => {
            print_json(&registry.set_active(&name, false).await?)?;
        }
        Commands::Tools { name } => {
            print_json(&registry.discover_tools(&name).await?)?;
        }
        Commands::ToggleTool {
            server,
            tool,
            disable,
        } => {
            print_json(&registry.set_tool_enabled(&server, &tool, !disable).await?)?;
        }
        Commands::Call { server, tool, args } => {
            let arguments: serde_json::Value = serde_json::from_str(&args)
                .map_err(|e| anyhow::anyhow!("--args is not valid JSON: {}", e))?;
            let dispatcher = Dispatcher::new(registry, config.timeout_policy());
            let result = dispatcher.invoke(&server, &tool, arguments).await?;
            print_json(&result)?;
        }
        Commands::Import { file } => {
            print_json(&registry.import_file(&file).await?)?;
        }
        Commands::Serve { port, host } => {
            run_serve(registry, &config, host, port, cancel).await?;
        }
        Commands::Stdio => {
            run_stdio(registry, &config, cancel).await?;
        }
    }

    Ok(())
}

/// Build the MCP server and start the background refresh loop.
fn start_bridge(
    registry: Arc<Registry<HttpGateway>>,
    config: &SwitchboardConfig,
    cancel: &CancellationToken,
) -> SwitchboardMcpServer<HttpGateway> {
    let dispatcher = Dispatcher::new(registry.clone(), config.timeout_policy());
    let server = SwitchboardMcpServer::new(dispatcher);

    tokio::spawn(run_refresh_loop(
        registry,
        server.peers_handle(),
        Duration::from_secs(config.bridge.refresh_interval_secs),
        cancel.child_token(),
    ));
    server
}

/// Serve the exposed tools over Streamable HTTP.
async fn run_serve(
    registry: Arc<Registry<HttpGateway>>,
    config: &SwitchboardConfig,
    host: String,
    port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let server = start_bridge(registry, config, &cancel);

    let session_manager = Arc::new(LocalSessionManager::default());
    let http_config = StreamableHttpServerConfig {
        cancellation_token: cancel.clone(),
        ..Default::default()
    };
    let server_for_factory = server.clone();
    let mcp_service = StreamableHttpService::new(
        move || Ok(server_for_factory.clone()),
        session_manager,
        http_config,
    );

    let app = Router::new().fallback(move |req: Request<axum::body::Body>| {
        let svc = mcp_service.clone();
        async move {
            match svc.oneshot(req).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            }
        }
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!(host = %host, port = %port, "Switchboard HTTP server listening");
    tracing::info!("Connect your MCP client to http://{}:{}/mcp", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| anyhow::anyhow!("Switchboard HTTP server error: {}", e))?;

    tracing::info!("Switchboard HTTP server stopped");
    Ok(())
}

/// Serve the exposed tools over stdin/stdout.
async fn run_stdio(
    registry: Arc<Registry<HttpGateway>>,
    config: &SwitchboardConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let server = start_bridge(registry, config, &cancel);

    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let running = server
        .serve_with_ct(transport, cancel.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize stdio transport: {:?}", e))?;

    tracing::info!("Switchboard stdio transport initialized, waiting for messages");

    tokio::select! {
        result = running.waiting() => {
            match result {
                Ok(reason) => {
                    tracing::info!(?reason, "Switchboard stdio transport completed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Switchboard stdio transport error");
                    return Err(anyhow::anyhow!("Switchboard stdio transport error: {}", e));
                }
            }
        }
        _ = cancel.cancelled() => {
            tracing::info!("Switchboard stdio transport cancelled");
        }
    }

    Ok(())
}

/// Resolve the config file: explicit flag → ./switchboard.toml →
/// ~/.config/switchboard/switchboard.toml. `None` means built-in defaults.
fn resolve_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }

    let local = Path::new("switchboard.toml");
    if local.exists() {
        return Some(local.to_path_buf());
    }

    dirs::config_dir()
        .map(|dir| dir.join("switchboard").join("switchboard.toml"))
        .filter(|path| path.exists())
}

async fn load_config(
    explicit: Option<PathBuf>,
    gateway_override: Option<String>,
) -> Result<SwitchboardConfig> {
    let mut config = match resolve_config(explicit) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            SwitchboardConfig::load(&path).await?
        }
        None => SwitchboardConfig::default(),
    };
    if let Some(base_url) = gateway_override {
        config.gateway.base_url = base_url;
        config.validate()?;
    }
    Ok(config)
}

async fn read_record(path: &Path) -> Result<ServerRecord> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read record file {:?}: {}", path, e))?;
    let record = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse record file {:?}: {}", path, e))?;
    Ok(record)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
