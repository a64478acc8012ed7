//! textrpc - string-typed RPC over TCP
//!
//! Serves a fixed registry of named functions. Each connection carries one
//! JSON request and receives one line of text.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use textrpc_core::{builtin_registry, LsCommand};
use textrpc_server::metrics::run_metrics_server;
use textrpc_server::{Config, Dispatcher, Metrics, Server};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "textrpc")]
#[command(about = "Serve built-in functions over TCP")]
#[command(version)]
struct Args {
    /// Host name or address to listen on
    host: Option<String>,

    /// Port to listen on
    port: Option<u16>,

    /// Log every request at debug level
    #[arg(short, long)]
    debug: bool,

    /// YAML configuration file (overrides TEXTRPC_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load configuration (file, then env overrides, then command line)
    let config = match Config::load(args.config.as_deref())
        .and_then(|c| c.with_endpoint(args.host, args.port))
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting textrpc server");
    tracing::info!("  Endpoint: {}", config.network.endpoint());
    tracing::info!("  ls program: {}", config.functions.ls_program.display());

    let registry = builtin_registry(LsCommand::new(config.functions.ls_program.clone()))?;
    let dispatcher = Dispatcher::new(registry);

    let mut server_config = config.server_config();
    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(Metrics::new()?);
        server_config = server_config.with_metrics(metrics.clone());
        tracing::info!("  Metrics: enabled on {}", config.metrics.bind_addr);
        Some(metrics)
    } else {
        tracing::info!("  Metrics: disabled");
        None
    };

    let server = Arc::new(Server::bind(server_config, dispatcher).await?);

    // Spawn metrics server
    let metrics_handle = metrics.map(|metrics| {
        let addr = config.metrics.bind_addr;
        let shutdown = server.subscribe_shutdown();
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(addr, metrics, shutdown).await {
                tracing::error!("Metrics server error: {}", e);
            }
        })
    });

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    if let Some(handle) = metrics_handle {
        let _ = handle.await;
    }

    tracing::info!(
        "Server stopped after {} calls",
        server.dispatcher().counter().current()
    );
    Ok(())
}
