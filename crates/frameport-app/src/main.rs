//! frameport: bridge between web frontends and the native windowing runtime.
//!
//! One relay task serializes every native-runtime call; a WebSocket endpoint
//! accepts frontend clients, dispatches their command envelopes, and fans
//! each outcome out to all of them.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use frameport_bridge::{PendingCalls, Relay, RuntimeHandle, Window};
use frameport_commands::{CommandRegistry, DependencyCache, Dispatcher};
use frameport_server::{ClientSet, ServerContext};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "frameport", about = "Bridge between web frontends and the native windowing runtime")]
struct Args {
    /// Host for the frontend WebSocket endpoint.
    #[arg(long)]
    host: Option<String>,

    /// Port for the frontend WebSocket endpoint.
    #[arg(short, long)]
    port: Option<u16>,

    /// TCP port of the native windowing runtime (overrides RUSTADDR).
    #[arg(long)]
    runtime_port: Option<u16>,

    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(runtime_port) = self.runtime_port {
            config.runtime_port = Some(runtime_port);
        }
        config
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "frameport=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => args.apply(config),
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };
    let runtime_addr = match config.runtime_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "cannot determine the native runtime address");
            std::process::exit(1);
        }
    };

    // The runtime must already be listening; nothing retries this.
    if let Err(e) = tokio::net::TcpStream::connect(runtime_addr).await {
        tracing::error!(runtime = %runtime_addr, error = %e, "native runtime transport unreachable");
        std::process::exit(1);
    }

    // Native-runtime bridge: one registry, one queue, one relay task.
    let pending = Arc::new(PendingCalls::new(frameport_bridge::pending::DEFAULT_ID_SPACE));
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = RuntimeHandle::new(
        pending.clone(),
        queue_tx,
        Duration::from_secs(config.call_timeout_secs),
    );
    let relay = Relay::new(
        runtime_addr,
        pending,
        Duration::from_millis(config.relay_interval_ms),
    );
    let relay_task = tokio::spawn(relay.run(queue_rx, shutdown_rx));

    // Commands and their injected singletons.
    let mut registry = CommandRegistry::new();
    commands::register_builtin(&mut registry);
    let mut resources = DependencyCache::new();
    let window_handle = handle.clone();
    resources.provide("window", move || Ok(Window::new(window_handle.clone())));
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), Arc::new(resources)));

    // Frontend endpoint. A bind failure is fatal; nothing retries it.
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %bind_addr, error = %e, "cannot bind frontend endpoint");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %bind_addr, runtime = %runtime_addr, "frameport listening");

    let ctx = ServerContext {
        clients: ClientSet::new(),
        dispatcher,
    };
    let server_task = tokio::spawn(frameport_server::run(listener, ctx));

    // Run until interrupted, then stop the relay first: joining it guarantees
    // every outstanding call has been settled before the process exits.
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = relay_task.await;
    server_task.abort();
}
