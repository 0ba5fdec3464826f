//! personable HTTP API server.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use personable_api::{router, AppState, ServerConfig, StorageBackend};
use personable_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "personable_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "personable_api=debug,personable_core=info,personable_db=info,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("personable-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env().context("invalid configuration")?;

    let state = match config.backend {
        StorageBackend::Postgres => {
            let db = Database::connect_with(&config.database_url, &config.pool, &config.collections)
                .await
                .context("failed to connect to database")?;
            db.ensure_collections()
                .await
                .context("failed to prepare collections")?;
            info!(
                subsystem = "api",
                leads = %config.collections.leads,
                contacts = %config.collections.contacts,
                users = %config.collections.users,
                "Using PostgreSQL storage"
            );
            AppState::from_database(db)
        }
        StorageBackend::Memory => {
            warn!(subsystem = "api", "Using in-memory storage; records are lost on exit");
            AppState::in_memory(&config.collections)
        }
    };

    if let Some(interval) = config.reconcile_interval {
        spawn_reconciler(state.clone(), interval, config.reconcile_after)?;
    }

    let app = router(state, config.allowed_origins.clone());

    // Start server
    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Periodically repair conversions whose contact never landed.
fn spawn_reconciler(
    state: AppState,
    interval: std::time::Duration,
    older_than: std::time::Duration,
) -> anyhow::Result<()> {
    let older_than =
        chrono::Duration::from_std(older_than).context("RECONCILE_AFTER_SECS is out of range")?;
    info!(
        subsystem = "api",
        component = "reconciler",
        interval_secs = interval.as_secs(),
        older_than_secs = older_than.num_seconds(),
        "Starting conversion reconciler"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let outcome = state.leads.reconcile_pending(older_than).await;
            if !outcome.is_successful() {
                warn!(
                    subsystem = "api",
                    component = "reconciler",
                    outcome = outcome.kind(),
                    "Reconciliation pass did not complete"
                );
            }
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
