use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use handoff_core::{
    DEFAULT_DATA_DIR, FsStore, MemoryStore, RandomCodeGenerator, ReferenceStore,
    config::{core_config_from_lookup, env, number_from_env_value},
    constants::DEFAULT_SWEEP_INTERVAL_SECS,
    sweeper::spawn_expiry_sweeper,
};

/// Main entry point for the handoff broker
///
/// Builds the reference store and services from the environment, then serves the REST API
/// until interrupted. When a TTL is configured an expiry sweeper runs alongside the server.
///
/// # Environment Variables
/// - `HANDOFF_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HANDOFF_STORE`: `fs` or `memory` (default: "fs")
/// - `HANDOFF_DATA_DIR`: filesystem store directory (default: "handoff_data")
/// - `HANDOFF_SWEEP_INTERVAL_SECS`: expiry sweep period (default: 60)
/// - `HANDOFF_CODE_DIGITS`, `HANDOFF_MAX_ATTEMPTS`, `HANDOFF_BURN_ON_READ`, `HANDOFF_TTL_SECS`,
///   `HANDOFF_STORE_TIMEOUT_MS`: see `handoff_core::config`
///
/// # Returns
/// * `Ok(())` - If the server shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, store startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("handoff=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var(env::REST_ADDR).unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = Arc::new(
        core_config_from_lookup(|k| std::env::var(k).ok()).context("invalid configuration")?,
    );

    let store_kind = std::env::var(env::STORE).unwrap_or_else(|_| "fs".into());
    let store: Arc<dyn ReferenceStore> = match store_kind.trim() {
        "fs" => {
            let data_dir = std::env::var(env::DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
            let store = FsStore::open(&data_dir).await.with_context(|| {
                format!("failed to open reference store at {}", data_dir.display())
            })?;
            tracing::info!("++ Using filesystem store at {}", store.data_dir().display());
            Arc::new(store)
        }
        "memory" => {
            tracing::warn!("++ Using in-memory store; shares are lost on restart");
            Arc::new(MemoryStore::new())
        }
        other => anyhow::bail!("unknown {} value: {other} (expected fs or memory)", env::STORE),
    };

    let generator = RandomCodeGenerator::new(cfg.code_digits())
        .context("configured code width is unsupported")?;

    tracing::info!(
        code_digits = cfg.code_digits(),
        max_attempts = cfg.max_attempts(),
        burn_on_read = cfg.burn_on_read(),
        ttl_secs = cfg.ttl().map(|ttl| ttl.as_secs()),
        "++ Broker configuration"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = match cfg.ttl() {
        Some(_) => {
            let interval_secs = number_from_env_value(
                env::SWEEP_INTERVAL_SECS,
                std::env::var(env::SWEEP_INTERVAL_SECS).ok(),
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?;
            anyhow::ensure!(interval_secs > 0, "{} must be > 0", env::SWEEP_INTERVAL_SECS);
            Some(spawn_expiry_sweeper(
                store.clone(),
                Duration::from_secs(interval_secs),
                cfg.store_timeout(),
                shutdown_rx,
            ))
        }
        None => None,
    };

    let app = router(AppState::new(cfg, store, Arc::new(generator)));

    tracing::info!("++ Starting handoff REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .with_context(|| format!("failed to bind {rest_addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("-- Shutting down");
        })
        .await?;

    shutdown_tx.send(true).ok();
    if let Some(sweeper) = sweeper {
        sweeper.await?;
    }

    Ok(())
}
