//! `dsearch-server` binary — thin CLI shell over the [`dsearch_server`]
//! library crate, grounded on the teacher's `server/src/main.rs` (logging
//! init, auto-scanning port bind, graceful shutdown).

use clap::Parser;
use dsearch_core::config::Config;
use dsearch_core::Engine;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use dsearch_server::router;
use dsearch_server::state::AppContext;

/// Local desktop search engine — hybrid (lexical + semantic) search over
/// registered directories, served as an HTTP/JSON API.
#[derive(Parser)]
#[command(name = "dsearch-server", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: ./dsearch.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data root overriding `Config::data_dir`.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Bind port; 0 auto-scans a free port in `8080..=8089`.
    #[arg(long)]
    port: Option<u16>,

    /// Bind to 0.0.0.0 instead of 127.0.0.1.
    #[arg(long)]
    bind_all: bool,

    /// Process-wide admin secret gating key-lifecycle routes (spec §4.11).
    /// Falls back to the `DSEARCH_ADMIN_KEY` environment variable.
    #[arg(long)]
    admin_key: Option<String>,
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl+C");
        info!("received Ctrl+C, shutting down...");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dsearch=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("dsearch.toml"));
    let mut config = Config::load(&config_path);

    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(admin_key) = cli.admin_key.or_else(|| std::env::var("DSEARCH_ADMIN_KEY").ok()) {
        config.admin_key = admin_key;
    }
    if config.jwt_secret.is_empty() {
        config.jwt_secret = std::env::var("DSEARCH_JWT_SECRET").unwrap_or_else(|_| {
            warn!("DSEARCH_JWT_SECRET not set — generating an ephemeral signing secret (tokens won't survive a restart)");
            uuid::Uuid::new_v4().to_string()
        });
    }
    if !config.admin_enabled() {
        warn!("admin_key not configured — key-lifecycle routes (/api/v1/auth/create-key etc.) are disabled");
    }

    let engine = match Engine::open(config.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            error!(error = %err, "failed to open engine");
            std::process::exit(1);
        }
    };

    let ctx = AppContext::new(Arc::clone(&engine));
    let app = router::build(ctx).into_make_service_with_connect_info::<SocketAddr>();

    let bind_addr = if cli.bind_all { "0.0.0.0" } else { config.bind_addr.as_str() };

    let listener = if config.port != 0 {
        tokio::net::TcpListener::bind(format!("{bind_addr}:{}", config.port))
            .await
            .unwrap_or_else(|e| {
                error!(port = config.port, error = %e, "could not bind to port");
                std::process::exit(2);
            })
    } else {
        const BASE: u16 = 8080;
        const RANGE: u16 = 10;
        let mut found = None;
        for port in BASE..BASE + RANGE {
            if let Ok(l) = tokio::net::TcpListener::bind(format!("{bind_addr}:{port}")).await {
                found = Some(l);
                break;
            }
        }
        found.unwrap_or_else(|| {
            error!(range_start = BASE, range_end = BASE + RANGE - 1, "no free port found");
            std::process::exit(1);
        })
    };

    let port = listener.local_addr().unwrap().port();
    info!(port = port, data_dir = %engine.config.data_dir.display(), "dsearch-server listening");
    // Machine-readable line for wrapper scripts, mirroring the teacher's
    // CODESCOPE_PORT convention (SPEC_FULL §10.1).
    eprintln!("DSEARCH_PORT={port}");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.unwrap();
}
