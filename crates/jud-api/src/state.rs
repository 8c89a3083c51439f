//! # Application State
//!
//! Shared state handed to every handler: the engine behind an `Arc` and the
//! server configuration. The engine is synchronous and takes per-proceso
//! locks, so handlers reach it through [`AppState::run`], which moves the
//! call onto Tokio's blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use jud_engine::{EngineError, ProcesoEngine, CONFIG_ENV};

use crate::error::AppError;

/// Server configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Engine configuration file, if any.
    pub engine_config: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            engine_config: None,
        }
    }
}

impl AppConfig {
    /// `PORT` (default 8080) and `JUD_CONFIG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let engine_config = lookup(CONFIG_ENV)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        Self {
            port,
            engine_config,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<ProcesoEngine>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(engine: ProcesoEngine) -> Self {
        Self::with_config(AppConfig::default(), engine)
    }

    pub fn with_config(config: AppConfig, engine: ProcesoEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            config,
        }
    }

    /// Run an engine call on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&ProcesoEngine) -> Result<T, EngineError> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || f(&engine))
            .await
            .map_err(|e| AppError::Internal(format!("engine task failed: {e}")))?
            .map_err(AppError::from)
    }
}
