//! # jud-cli — Command-Line Interface
//!
//! Provides the `jud` binary. Every subcommand opens a
//! [`JsonFileRepository`] under `--store` (default `.jud/procesos`), runs
//! one engine operation, and prints the result as pretty JSON on stdout.
//!
//! ```bash
//! jud crear --materia civil --juzgado "Juzgado Civil 4º" --actor "Ana" --demandado "Carlos"
//! jud transicionar --id <uuid> --evento presentar
//! jud transicionar --id <uuid> --evento contestar --payload contestacion.json
//! jud plazos --id <uuid>
//! jud dias-restantes --plazo <uuid> --hoy 2026-03-09
//! jud sweep --hoy 2026-03-31
//! ```

pub mod plazo;
pub mod proceso;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use jud_core::Timestamp;
use jud_engine::{EngineConfig, EngineError, JsonFileRepository, ProcesoEngine, TracingSink};

/// Default store directory, relative to the working directory.
pub const DEFAULT_STORE: &str = ".jud/procesos";

/// Build an engine over a JSON-file store.
///
/// `config` takes precedence over `JUD_CONFIG`; `JUD_LOCK_TIMEOUT_MS` is
/// applied either way.
pub fn open_engine(store: &Path, config: Option<&Path>) -> Result<ProcesoEngine> {
    let config = EngineConfig::resolve(config, |var| std::env::var(var).ok())
        .context("failed to load engine configuration")?;
    let repo = JsonFileRepository::open(store)
        .with_context(|| format!("failed to open store {}", store.display()))?;
    tracing::debug!(store = %store.display(), "opened proceso store");
    Ok(ProcesoEngine::new(config, Arc::new(repo), Arc::new(TracingSink))?)
}

/// The instant an act is recorded at: start of `fecha`, or now.
pub fn instant(fecha: Option<NaiveDate>) -> Timestamp {
    fecha.map(Timestamp::start_of).unwrap_or_else(Timestamp::now)
}

/// `hoy`, defaulting to today's UTC date.
pub fn today(hoy: Option<NaiveDate>) -> NaiveDate {
    hoy.unwrap_or_else(|| Timestamp::now().date())
}

pub fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).context("failed to serialize output")
}

/// JSON error document for engine failures, `None` for anything else.
pub fn engine_error_json(err: &anyhow::Error) -> Option<serde_json::Value> {
    let e = err.downcast_ref::<EngineError>()?;
    Some(serde_json::json!({
        "error": {
            "code": e.code(),
            "message": e.to_string(),
            "retryable": e.is_retryable(),
        }
    }))
}

/// Resolve the store path against the working directory.
pub fn resolve_store(store: Option<PathBuf>) -> PathBuf {
    store.unwrap_or_else(|| PathBuf::from(DEFAULT_STORE))
}
