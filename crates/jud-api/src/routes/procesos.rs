//! # Proceso Routes
//!
//! Routes:
//! - POST   /v1/procesos: create a proceso (NUREJ allocated by the engine)
//! - GET    /v1/procesos/{id}: full aggregate
//! - POST   /v1/procesos/{id}/transiciones: apply an event, body tagged by `evento`
//! - GET    /v1/procesos/{id}/plazos: every plazo, in opening order
//! - POST   /v1/procesos/{id}/sentencia: issue the sentencia
//!
//! Acts are dated at the moment the request is handled.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use jud_core::{Nurej, Timestamp};
use jud_engine::{NuevoProceso, Solicitud};
use jud_state::{BorradorSentencia, Plazo, Proceso, Sentencia};

use crate::error::AppError;
use crate::extractors::{extract_json, parse_proceso_id};
use crate::state::AppState;

/// Proceso plus the events it currently accepts.
#[derive(Debug, Serialize)]
pub struct ProcesoResponse {
    #[serde(flatten)]
    pub proceso: Proceso,
    pub eventos_validos: Vec<&'static str>,
}

impl From<Proceso> for ProcesoResponse {
    fn from(proceso: Proceso) -> Self {
        let mut eventos_validos: Vec<&'static str> =
            proceso.estado.valid_events().iter().map(|e| e.name()).collect();
        eventos_validos.dedup();
        Self {
            proceso,
            eventos_validos,
        }
    }
}

/// Creation request; `nurej` imports an existing case number.
#[derive(Debug, serde::Deserialize)]
pub struct CrearProcesoRequest {
    #[serde(flatten)]
    pub nuevo: NuevoProceso,
    #[serde(default)]
    pub nurej: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/procesos", post(crear_proceso))
        .route("/v1/procesos/{id}", get(obtener_proceso))
        .route("/v1/procesos/{id}/transiciones", post(transicionar))
        .route("/v1/procesos/{id}/plazos", get(consultar_plazos))
        .route("/v1/procesos/{id}/sentencia", post(emitir_sentencia))
}

async fn crear_proceso(
    State(state): State<AppState>,
    body: Result<Json<CrearProcesoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProcesoResponse>), AppError> {
    let req = extract_json(body)?;
    let nurej = req
        .nurej
        .map(Nurej::new)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let at = Timestamp::now();
    let proceso = state
        .run(move |engine| match nurej {
            Some(nurej) => engine.crear_proceso_con_nurej(nurej, req.nuevo, at),
            None => engine.crear_proceso(req.nuevo, at),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(proceso.into())))
}

async fn obtener_proceso(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcesoResponse>, AppError> {
    let id = parse_proceso_id(&id)?;
    let proceso = state.run(move |engine| engine.obtener(&id)).await?;
    Ok(Json(proceso.into()))
}

async fn transicionar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Solicitud>, JsonRejection>,
) -> Result<Json<ProcesoResponse>, AppError> {
    let id = parse_proceso_id(&id)?;
    let solicitud = extract_json(body)?;
    let at = Timestamp::now();
    let proceso = state
        .run(move |engine| engine.transicionar(&id, solicitud, at))
        .await?;
    Ok(Json(proceso.into()))
}

async fn consultar_plazos(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Plazo>>, AppError> {
    let id = parse_proceso_id(&id)?;
    let plazos = state.run(move |engine| engine.consultar_plazos(&id)).await?;
    Ok(Json(plazos))
}

async fn emitir_sentencia(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<BorradorSentencia>, JsonRejection>,
) -> Result<(StatusCode, Json<Sentencia>), AppError> {
    let id = parse_proceso_id(&id)?;
    let borrador = extract_json(body)?;
    let at = Timestamp::now();
    let sentencia = state
        .run(move |engine| engine.emitir_sentencia(&id, borrador, at))
        .await?;
    Ok((StatusCode::CREATED, Json(sentencia)))
}
