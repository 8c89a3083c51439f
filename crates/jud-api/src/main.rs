//! # jud-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the judicial process engine.
//! Binds to `PORT` (default 8080); engine settings come from the YAML file
//! named by `JUD_CONFIG`, with `JUD_LOCK_TIMEOUT_MS` applied on top.

use jud_api::state::{AppConfig, AppState};
use jud_engine::{EngineConfig, ProcesoEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    let engine_config = EngineConfig::resolve(config.engine_config.as_deref(), |var| {
        std::env::var(var).ok()
    })
    .map_err(|e| {
        tracing::error!("Engine configuration failed: {e}");
        e
    })?;
    tracing::info!(
        lock_timeout_ms = engine_config.lock_timeout_ms,
        holidays = engine_config.holidays.len(),
        config_file = ?config.engine_config,
        "engine configured"
    );
    let engine = ProcesoEngine::in_memory(engine_config)?;

    let port = config.port;
    let app = jud_api::app(AppState::with_config(config, engine));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("jud API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
