//! # Proceso Subcommands
//!
//! - `crear`: open a new proceso in BORRADOR
//! - `mostrar`: print the full aggregate
//! - `transicionar`: apply an event
//! - `sentencia`: issue the sentencia from a draft file
//!
//! Payload-bearing events read their payload from a JSON file:
//! `contestar` takes the contestación object (tagged by `tipo`),
//! `emitir_sentencia` takes the sentencia draft.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Value};
use uuid::Uuid;

use jud_core::{Nurej, ProcesoId};
use jud_engine::{NuevoProceso, ProcesoEngine, Solicitud};
use jud_state::{BorradorSentencia, Parte};

use crate::{instant, to_json};

#[derive(Args, Debug)]
pub struct CrearArgs {
    #[arg(long)]
    pub materia: String,
    #[arg(long)]
    pub juzgado: String,
    /// Plaintiff name.
    #[arg(long)]
    pub actor: String,
    /// Defendant name. Repeat for several defendants.
    #[arg(long, required = true)]
    pub demandado: Vec<String>,
    /// Import under an existing NUREJ instead of allocating one.
    #[arg(long)]
    pub nurej: Option<String>,
    /// Record the act on this date (YYYY-MM-DD) instead of now.
    #[arg(long)]
    pub fecha: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct MostrarArgs {
    #[arg(long)]
    pub id: Uuid,
}

#[derive(Args, Debug)]
pub struct TransicionarArgs {
    #[arg(long)]
    pub id: Uuid,
    /// Event name, e.g. `presentar`, `citar`, `contestar`.
    #[arg(long)]
    pub evento: String,
    /// JSON payload file for `contestar` and `emitir_sentencia`.
    #[arg(long)]
    pub payload: Option<PathBuf>,
    /// For `resolver_excepciones`: the exceptions were upheld.
    #[arg(long)]
    pub fundada: bool,
    #[arg(long)]
    pub fecha: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct SentenciaArgs {
    #[arg(long)]
    pub id: Uuid,
    /// JSON file holding the draft (cuerpo + resultados).
    #[arg(long)]
    pub borrador: PathBuf,
    #[arg(long)]
    pub fecha: Option<NaiveDate>,
}

pub fn run_crear(engine: &ProcesoEngine, args: &CrearArgs) -> Result<Value> {
    let mut partes = vec![Parte::actor(&args.actor)];
    partes.extend(args.demandado.iter().map(Parte::demandado));
    let nuevo = NuevoProceso {
        partes,
        materia: args.materia.clone(),
        juzgado: args.juzgado.clone(),
        demanda: None,
    };
    let at = instant(args.fecha);
    let proceso = match &args.nurej {
        Some(raw) => {
            let nurej = Nurej::new(raw.as_str()).context("invalid NUREJ")?;
            engine.crear_proceso_con_nurej(nurej, nuevo, at)?
        }
        None => engine.crear_proceso(nuevo, at)?,
    };
    to_json(&proceso)
}

pub fn run_mostrar(engine: &ProcesoEngine, args: &MostrarArgs) -> Result<Value> {
    let proceso = engine.obtener(&ProcesoId::from_uuid(args.id))?;
    to_json(&proceso)
}

pub fn run_transicionar(engine: &ProcesoEngine, args: &TransicionarArgs) -> Result<Value> {
    let solicitud = build_solicitud(&args.evento, args.payload.as_deref(), args.fundada)?;
    let proceso = engine.transicionar(&ProcesoId::from_uuid(args.id), solicitud, instant(args.fecha))?;
    to_json(&proceso)
}

pub fn run_sentencia(engine: &ProcesoEngine, args: &SentenciaArgs) -> Result<Value> {
    let borrador: BorradorSentencia = serde_json::from_value(read_json(&args.borrador)?)
        .with_context(|| format!("invalid sentencia draft in {}", args.borrador.display()))?;
    let sentencia = engine.emitir_sentencia(&ProcesoId::from_uuid(args.id), borrador, instant(args.fecha))?;
    to_json(&sentencia)
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Assemble the `evento`-tagged request the engine expects.
fn build_solicitud(evento: &str, payload: Option<&Path>, fundada: bool) -> Result<Solicitud> {
    let mut request = json!({ "evento": evento });
    let payload_key = match evento {
        "contestar" => Some("contestacion"),
        "emitir_sentencia" => Some("sentencia"),
        _ => None,
    };
    match (payload_key, payload) {
        (Some(key), Some(path)) => {
            request[key] = read_json(path)?;
        }
        (Some(_), None) => bail!("evento {evento} requires --payload"),
        (None, Some(_)) => bail!("evento {evento} takes no payload"),
        (None, None) => {}
    }
    if evento == "resolver_excepciones" {
        request["fundada"] = json!(fundada);
    }
    serde_json::from_value(request).with_context(|| format!("invalid request for evento {evento}"))
}
