//! mantle-mcp relay server
//!
//! MCP over SSE with calls correlated across workers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use mantle_mcp_core::config::{Config, load_config};
use mantle_mcp_core::tracing_init::{default_filter, init_tracing};
use mantle_mcp_data::{DefiLlamaClient, DefiLlamaConfig, RecoupClient, RecoupConfig};
use mantle_mcp_relay::bridge::Correlator;
use mantle_mcp_relay::channel::{ChannelRegistry, DurableRelay, RelaySettings};
use mantle_mcp_relay::engine::McpEngineFactory;
use mantle_mcp_relay::server::{AppState, RouteSettings, build_router};
use mantle_mcp_relay::session::{SessionTransport, TransportSettings};
use mantle_mcp_relay::storage::{RelayDatabase, SqliteStore};
use mantle_mcp_relay::tools::default_registry;

/// Time given to open sessions to tear down on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "mantle-mcp-relay")]
#[command(
    version,
    about = "mantle-mcp session bridge - MCP over SSE across stateless workers"
)]
struct Args {
    /// Path to a JSON settings file.
    #[arg(long, env = "MANTLE_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to the shared SQLite store.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Keep calls inside this process; no shared store.
    #[arg(long)]
    no_store: bool,

    /// Seconds a call waits for its reply.
    #[arg(long)]
    call_timeout: Option<u64>,

    /// Maximum session lifetime in seconds.
    #[arg(long)]
    max_duration: Option<u64>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(path) = &self.db_path {
            config.relay.database_path = Some(path.clone());
        }
        if self.no_store {
            config.relay.enabled = false;
        }
        if let Some(secs) = self.call_timeout {
            config.bridge.call_timeout_secs = secs;
        }
        if let Some(secs) = self.max_duration {
            config.bridge.session_max_duration_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    init_tracing(
        &default_filter("mantle-mcp-relay", &config.server.log_level),
        args.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        "Starting mantle-mcp-relay"
    );

    let upstream = &config.upstream;
    let timeout = Duration::from_secs(upstream.request_timeout_secs);
    let llama = DefiLlamaClient::new(&DefiLlamaConfig {
        coins_base_url: upstream.coins_base_url.clone(),
        api_base_url: upstream.api_base_url.clone(),
        stablecoins_base_url: upstream.stablecoins_base_url.clone(),
        timeout,
    })?;
    let recoup = RecoupClient::new(&RecoupConfig {
        base_url: upstream.recoup_base_url.clone(),
        timeout,
    })?;
    let tools = default_registry(&llama, &recoup);
    info!(tools = tools.len(), "Tools registered");

    let relay = open_relay(&config).await?;

    let transport = SessionTransport::new(
        relay.clone(),
        Arc::new(McpEngineFactory::new(tools, config.server.message_path.clone())),
        TransportSettings {
            max_duration: Duration::from_secs(config.bridge.session_max_duration_secs),
            log_flush_interval: Duration::from_millis(config.bridge.log_flush_interval_ms),
            outbound_buffer: config.bridge.outbound_buffer,
        },
    );
    let correlator = Correlator::new(
        relay.clone(),
        Duration::from_secs(config.bridge.call_timeout_secs),
    );

    // Spawn background task to remove expired store records
    if relay.has_store() {
        let cleanup_relay = relay.clone();
        let every = Duration::from_secs(config.relay.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await; // Skip first immediate tick
            loop {
                interval.tick().await;
                match cleanup_relay.cleanup_expired().await {
                    Ok(removed) if removed > 0 => {
                        info!(removed, "Background store cleanup completed");
                    }
                    Err(e) => {
                        warn!(error = %e, "Background store cleanup failed");
                    }
                    _ => {}
                }
            }
        });
    }

    let keepalive = (config.server.keepalive_secs > 0)
        .then(|| Duration::from_secs(config.server.keepalive_secs));
    let state = AppState::new(transport.clone(), correlator).with_keepalive(keepalive);
    let app = build_router(state, &RouteSettings::from_config(&config.server));

    let listener = tokio::net::TcpListener::bind(config.server.addr).await?;
    info!(addr = %config.server.addr, "Listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    transport.shutdown(SHUTDOWN_GRACE).await;
    info!("Relay stopped");
    Ok(())
}

async fn open_relay(config: &Config) -> anyhow::Result<DurableRelay> {
    let registry = ChannelRegistry::new();
    if !config.relay.enabled {
        info!("Shared store disabled, calls stay in this process");
        return Ok(DurableRelay::local(registry));
    }

    let path = match &config.relay.database_path {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    info!(path = %path.display(), "Opening shared store");
    let db = RelayDatabase::open(&path).await?;
    let store = SqliteStore::new(db, Duration::from_millis(config.relay.poll_interval_ms));
    Ok(DurableRelay::with_store(
        registry,
        Arc::new(store),
        RelaySettings {
            ttl: Duration::from_secs(config.relay.ttl_secs),
            pop_wait: Duration::from_millis(config.relay.pop_wait_ms),
        },
    ))
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".mantle-mcp").join("relay.db"))
}
