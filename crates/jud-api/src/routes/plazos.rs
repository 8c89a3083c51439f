//! # Plazo Routes
//!
//! Routes:
//! - GET    /v1/plazos/{id}/dias-restantes?hoy=YYYY-MM-DD: signed days left
//! - POST   /v1/plazos/sweep?hoy=YYYY-MM-DD: expire overdue plazos
//!
//! `hoy` defaults to the current UTC date.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use jud_core::ProcesoId;
use jud_engine::{DiasRestantes, SweepFailure};
use jud_state::Plazo;

use crate::error::AppError;
use crate::extractors::{parse_hoy, parse_plazo_id};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HoyQuery {
    pub hoy: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub vencidos: Vec<Plazo>,
    pub total: usize,
    pub ocupados: Vec<ProcesoId>,
    pub fallidos: Vec<SweepFailure>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/plazos/{id}/dias-restantes", get(dias_restantes))
        .route("/v1/plazos/sweep", post(sweep))
}

async fn dias_restantes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HoyQuery>,
) -> Result<Json<DiasRestantes>, AppError> {
    let id = parse_plazo_id(&id)?;
    let hoy = parse_hoy(query.hoy.as_deref())?;
    let dias = state.run(move |engine| engine.dias_restantes(&id, hoy)).await?;
    Ok(Json(dias))
}

async fn sweep(
    State(state): State<AppState>,
    Query(query): Query<HoyQuery>,
) -> Result<Json<SweepResponse>, AppError> {
    let hoy = parse_hoy(query.hoy.as_deref())?;
    let report = state.run(move |engine| engine.sweep_expirations(hoy)).await?;
    tracing::info!(
        hoy = %hoy,
        total = report.vencidos.len(),
        ocupados = report.ocupados.len(),
        fallidos = report.fallidos.len(),
        "plazo sweep completed"
    );
    Ok(Json(SweepResponse {
        total: report.vencidos.len(),
        vencidos: report.vencidos,
        ocupados: report.ocupados,
        fallidos: report.fallidos,
    }))
}
