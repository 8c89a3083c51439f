//! # Plazo Subcommands
//!
//! - `plazos`: list a proceso's plazos
//! - `dias-restantes`: signed calendar and business days left on a plazo
//! - `sweep`: expire every overdue ACTIVO plazo in the store

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Value};
use uuid::Uuid;

use jud_core::{PlazoId, ProcesoId};
use jud_engine::ProcesoEngine;

use crate::{to_json, today};

#[derive(Args, Debug)]
pub struct PlazosArgs {
    #[arg(long)]
    pub id: Uuid,
}

#[derive(Args, Debug)]
pub struct DiasRestantesArgs {
    #[arg(long)]
    pub plazo: Uuid,
    /// Reference date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub hoy: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct SweepArgs {
    #[arg(long)]
    pub hoy: Option<NaiveDate>,
}

pub fn run_plazos(engine: &ProcesoEngine, args: &PlazosArgs) -> Result<Value> {
    let plazos = engine.consultar_plazos(&ProcesoId::from_uuid(args.id))?;
    to_json(&plazos)
}

pub fn run_dias_restantes(engine: &ProcesoEngine, args: &DiasRestantesArgs) -> Result<Value> {
    let dias = engine.dias_restantes(&PlazoId::from_uuid(args.plazo), today(args.hoy))?;
    to_json(&dias)
}

pub fn run_sweep(engine: &ProcesoEngine, args: &SweepArgs) -> Result<Value> {
    let hoy = today(args.hoy);
    let report = engine.sweep_expirations(hoy)?;
    tracing::info!(
        hoy = %hoy,
        total = report.vencidos.len(),
        fallidos = report.fallidos.len(),
        "sweep finished"
    );
    Ok(json!({
        "hoy": hoy,
        "total": report.vencidos.len(),
        "vencidos": to_json(&report.vencidos)?,
        "ocupados": to_json(&report.ocupados)?,
        "fallidos": to_json(&report.fallidos)?,
    }))
}
