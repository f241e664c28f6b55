//! edge-guard: request-admission gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────────┐
//!                       │                    EDGE GUARD                     │
//!                       │                                                   │
//!   Client Request      │  ┌──────┐   ┌────────────┐   ┌──────┐             │
//!   ────────────────────┼─▶│ CORS │──▶│ rate limit │──▶│ CSRF │──┐          │
//!                       │  └──┬───┘   └─────┬──────┘   └──┬───┘  │          │
//!                       │     │ early       │ 429         │ 403  ▼          │
//!                       │     │ response    │             │   ┌────────┐    │
//!   Client Response     │     ▼             ▼             ▼   │upstream│────┼──▶ Site
//!   ◀───────────────────┼──────────────────────────── headers ◀┘        │    │
//!                       │                                     └────────┘    │
//!                       │  registry (DashMap) · config reload · metrics     │
//!                       └───────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_guard::admin::setup_admin_router;
use edge_guard::config::{load_config, watcher::ConfigWatcher, GuardConfig};
use edge_guard::http::HttpServer;
use edge_guard::lifecycle::{spawn_signal_handler, Shutdown};
use edge_guard::observability::{logging, metrics};
use edge_guard::security::{InMemoryStore, RateLimiter, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "edge-guard")]
#[command(about = "Request-admission gateway: rate limiting, CSRF and security headers", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Watch the configuration file and apply changes without restarting.
    #[arg(long, default_value_t = false)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("edge-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        default_limit = config.rate_limit.default_limit,
        strict_limit = config.rate_limit.strict_limit,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_handler(shutdown.clone());

    // Keep the watcher alive for the life of the server.
    let (config_updates, _watcher) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (rx, Some(watcher.run()?))
        }
        _ => {
            let (_, rx) = mpsc::unbounded_channel();
            (rx, None)
        }
    };

    let limiter = RateLimiter::new(Arc::new(InMemoryStore::new()), Arc::new(SystemClock));

    if config.admin.enabled {
        let admin = setup_admin_router(limiter.clone(), &config.admin.api_key);
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let mut admin_shutdown = shutdown.subscribe();
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, admin)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::with_limiter(config, limiter);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
