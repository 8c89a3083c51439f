//! # jud-api — Axum HTTP Surface
//!
//! Thin HTTP layer over `jud-engine`. Handlers parse input, hand the call
//! to the engine on the blocking pool, and map [`jud_engine::EngineError`]
//! to structured JSON errors.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                 |
//! |-------------------------|------------------------|
//! | `/v1/procesos/*`        | [`routes::procesos`]   |
//! | `/v1/plazos/*`          | [`routes::plazos`]     |
//! | `/health/*`             | probes, below          |
//!
//! ## Middleware
//!
//! `TraceLayer` wraps the `/v1` routes.

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::procesos::router())
        .merge(routes::plazos::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

/// Ready when the repository answers.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.run(|engine| engine.listar()).await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "repository unavailable")
        }
    }
}
