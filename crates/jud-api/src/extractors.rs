//! # Request Parsing Helpers
//!
//! JSON bodies are taken as `Result<Json<T>, JsonRejection>` so that
//! malformed input surfaces as a structured [`AppError::BadRequest`] rather
//! than axum's plain-text rejection. Path identifiers and dates are parsed
//! here for the same reason.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::NaiveDate;
use uuid::Uuid;

use jud_core::{PlazoId, ProcesoId, Timestamp};

use crate::error::AppError;

/// Unwrap a JSON body, mapping deserialization errors to `BadRequest`.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::BadRequest(format!("invalid {what} id '{raw}': {e}")))
}

pub fn parse_proceso_id(raw: &str) -> Result<ProcesoId, AppError> {
    parse_uuid(raw, "proceso").map(ProcesoId::from_uuid)
}

pub fn parse_plazo_id(raw: &str) -> Result<PlazoId, AppError> {
    parse_uuid(raw, "plazo").map(PlazoId::from_uuid)
}

/// `YYYY-MM-DD`, or today's UTC date when absent.
pub fn parse_hoy(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    match raw {
        None => Ok(Timestamp::now().date()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| AppError::BadRequest(format!("invalid date '{s}': {e}"))),
    }
}
