//! # Proceso Aggregate and State Machine
//!
//! [`Proceso`] is the persisted aggregate: parties, state, contestación,
//! plazos, sentencia and the transition log. [`ProcesoStateMachine`] is the
//! only way to move it between states.
//!
//! Every transition is computed on a copy of the proceso and committed only
//! when every precondition, plazo close and plazo open has succeeded, so a
//! failed call leaves the caller's value untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jud_core::{BusinessDayCalculator, Nurej, PlazoId, ProcesoId, Timestamp};

use crate::config::PlazoConfig;
use crate::contestacion::{
    Contestacion, ContestacionError, ContestacionPayload, ContestacionRouter, Money,
};
use crate::estado::{
    transition_rule, EstadoProceso, Evento, PlazoClose, Requirement, TipoContestacion,
    TransitionRule,
};
use crate::plazo::{
    active_of_kind, latest_of_kind, Plazo, PlazoEngine, PlazoError, PlazoKind, PlazoStatus,
};
use crate::sentencia::{BorradorSentencia, IssuedSentencia, Sentencia, SentenciaError, SentenciaIssuer};

// ─── Parties & Demanda ───────────────────────────────────────────────

/// Procedural role of a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolParte {
    Actor,
    Demandado,
}

/// A party to the proceso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parte {
    pub nombre: String,
    /// National identity or registry number, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documento: Option<String>,
    pub rol: RolParte,
}

impl Parte {
    pub fn actor(nombre: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            documento: None,
            rol: RolParte::Actor,
        }
    }

    pub fn demandado(nombre: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            documento: None,
            rol: RolParte::Demandado,
        }
    }
}

/// The claim as filed. Opaque text; the engine only stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Demanda {
    pub objeto: String,
    pub hechos: String,
    pub derecho: String,
    pub petitorio: String,
    pub valor: Option<Money>,
    pub anexos: Vec<String>,
}

// ─── Audit ───────────────────────────────────────────────────────────

/// One applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: EstadoProceso,
    pub to: EstadoProceso,
    pub evento: Evento,
    pub at: Timestamp,
}

/// What a successful transition changed, for notification and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: EstadoProceso,
    pub to: EstadoProceso,
    pub evento: Evento,
    /// Plazos opened by the transition.
    pub opened: Vec<Plazo>,
    /// Plazos that left ACTIVO (fulfilled or expired) during the transition.
    pub resolved: Vec<Plazo>,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Every way a proceso operation can fail.
#[derive(Error, Debug)]
pub enum ProcesoError {
    /// The event is not accepted in the current state.
    #[error("illegal transition: {evento} is not allowed in state {estado}")]
    IllegalTransition { estado: EstadoProceso, evento: Evento },

    #[error(transparent)]
    Plazo(#[from] PlazoError),

    #[error(transparent)]
    Contestacion(#[from] ContestacionError),

    #[error(transparent)]
    Sentencia(#[from] SentenciaError),

    /// Party roles do not form exactly one ACTOR and at least one DEMANDADO.
    #[error("invalid parties: {0}")]
    InvalidPartes(String),

    /// A plazo that must run out (or be answered) first is still running.
    #[error("{kind} plazo is still pending")]
    PlazoPending { kind: PlazoKind },

    /// An event that needs a payload was sent without one.
    #[error("event {evento} requires a payload")]
    MissingPayload { evento: &'static str },

    /// The proceso already holds a contestación.
    #[error("a contestación has already been submitted for this proceso")]
    ContestacionAlreadySubmitted,
}

// ─── Proceso ─────────────────────────────────────────────────────────

/// A judicial case tracked end-to-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proceso {
    pub id: ProcesoId,
    pub nurej: Nurej,
    pub materia: String,
    pub juzgado: String,
    pub estado: EstadoProceso,
    pub partes: Vec<Parte>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demanda: Option<Demanda>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contestacion: Option<Contestacion>,
    #[serde(default)]
    pub plazos: Vec<Plazo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentencia: Option<Sentencia>,
    /// The defendant failed to answer within the CONTESTACION plazo.
    #[serde(default)]
    pub rebeldia: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
}

impl Proceso {
    /// Create a proceso in BORRADOR.
    pub fn new(
        nurej: Nurej,
        materia: impl Into<String>,
        juzgado: impl Into<String>,
        partes: Vec<Parte>,
        demanda: Option<Demanda>,
        created_at: Timestamp,
    ) -> Result<Self, ProcesoError> {
        validate_partes(&partes)?;
        Ok(Self {
            id: ProcesoId::new(),
            nurej,
            materia: materia.into(),
            juzgado: juzgado.into(),
            estado: EstadoProceso::Borrador,
            partes,
            demanda,
            contestacion: None,
            plazos: Vec::new(),
            sentencia: None,
            rebeldia: false,
            created_at,
            updated_at: created_at,
            transitions: Vec::new(),
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.estado.is_terminal()
    }

    /// The ACTIVO plazo of `kind`, if any.
    pub fn active_plazo(&self, kind: PlazoKind) -> Option<&Plazo> {
        active_of_kind(&self.plazos, kind)
    }

    pub fn plazo(&self, id: &PlazoId) -> Option<&Plazo> {
        self.plazos.iter().find(|p| &p.id == id)
    }

    pub fn actor(&self) -> Option<&Parte> {
        self.partes.iter().find(|p| p.rol == RolParte::Actor)
    }

    /// Whether the defendant accepted the claim.
    pub fn allanado(&self) -> bool {
        self.contestacion
            .as_ref()
            .is_some_and(|c| c.tipo() == TipoContestacion::Allanamiento)
    }

    /// At most one ACTIVO plazo per kind.
    pub fn active_plazos_unique(&self) -> bool {
        PlazoKind::ALL.iter().all(|kind| {
            self.plazos
                .iter()
                .filter(|p| p.kind == *kind && p.is_active())
                .count()
                <= 1
        })
    }
}

/// Exactly one ACTOR and at least one DEMANDADO.
pub fn validate_partes(partes: &[Parte]) -> Result<(), ProcesoError> {
    let actores = partes.iter().filter(|p| p.rol == RolParte::Actor).count();
    let demandados = partes.iter().filter(|p| p.rol == RolParte::Demandado).count();
    if actores != 1 {
        return Err(ProcesoError::InvalidPartes(format!(
            "expected exactly one ACTOR, found {actores}"
        )));
    }
    if demandados == 0 {
        return Err(ProcesoError::InvalidPartes(
            "at least one DEMANDADO is required".to_string(),
        ));
    }
    if let Some(p) = partes.iter().find(|p| p.nombre.trim().is_empty()) {
        return Err(ProcesoError::InvalidPartes(format!(
            "{:?} party has an empty name",
            p.rol
        )));
    }
    Ok(())
}

// ─── State Machine ───────────────────────────────────────────────────

/// Applies events to procesos, opening and closing plazos as the
/// transition table dictates.
#[derive(Debug, Clone, Default)]
pub struct ProcesoStateMachine {
    plazo_engine: PlazoEngine,
    config: PlazoConfig,
    router: ContestacionRouter,
}

impl ProcesoStateMachine {
    pub fn new(calendar: BusinessDayCalculator, config: PlazoConfig) -> Self {
        Self {
            plazo_engine: PlazoEngine::new(calendar),
            config,
            router: ContestacionRouter,
        }
    }

    pub fn plazo_engine(&self) -> &PlazoEngine {
        &self.plazo_engine
    }

    pub fn config(&self) -> &PlazoConfig {
        &self.config
    }

    /// Apply a payload-free event.
    ///
    /// `contestar` and `emitir_sentencia` carry payloads and must go through
    /// [`ProcesoStateMachine::contestar`] and
    /// [`ProcesoStateMachine::emitir_sentencia`]; sending them here fails
    /// with [`ProcesoError::MissingPayload`].
    pub fn transition(
        &self,
        proceso: &mut Proceso,
        evento: Evento,
        at: Timestamp,
    ) -> Result<TransitionOutcome, ProcesoError> {
        let rule = self.rule_for(proceso, &evento)?;
        if matches!(evento, Evento::Contestar { .. } | Evento::EmitirSentencia) {
            return Err(ProcesoError::MissingPayload {
                evento: evento.name(),
            });
        }
        let (next, outcome) = self.apply(proceso, evento, rule, at)?;
        *proceso = next;
        Ok(outcome)
    }

    /// Validate and file the defendant's contestación.
    pub fn contestar(
        &self,
        proceso: &mut Proceso,
        payload: ContestacionPayload,
        at: Timestamp,
    ) -> Result<TransitionOutcome, ProcesoError> {
        let rule = self.rule_for(
            proceso,
            &Evento::Contestar {
                tipo: payload.tipo(),
            },
        )?;
        // Only a record edited outside the machine reaches this.
        if proceso.contestacion.is_some() {
            return Err(ProcesoError::ContestacionAlreadySubmitted);
        }
        let routed = self.router.route(&proceso.id, payload, at)?;
        let (mut next, outcome) = self.apply(proceso, routed.evento, rule, at)?;
        next.contestacion = Some(routed.contestacion);
        *proceso = next;
        Ok(outcome)
    }

    /// Issue the sentencia. See [`SentenciaIssuer::issue`].
    pub fn emitir_sentencia(
        &self,
        proceso: &mut Proceso,
        borrador: BorradorSentencia,
        at: Timestamp,
    ) -> Result<IssuedSentencia, ProcesoError> {
        SentenciaIssuer::new(self).issue(proceso, borrador, at)
    }

    /// Expire every overdue ACTIVO plazo on the proceso.
    pub fn sweep_expirations(&self, proceso: &mut Proceso, today: NaiveDate) -> Vec<Plazo> {
        self.plazo_engine.sweep_expirations(&mut proceso.plazos, today)
    }

    /// Look up the rule, rejecting terminal states and unknown pairs.
    pub(crate) fn rule_for(
        &self,
        proceso: &Proceso,
        evento: &Evento,
    ) -> Result<TransitionRule, ProcesoError> {
        transition_rule(proceso.estado, evento).ok_or(ProcesoError::IllegalTransition {
            estado: proceso.estado,
            evento: *evento,
        })
    }

    /// Compute the post-transition proceso without touching the input.
    pub(crate) fn apply(
        &self,
        proceso: &Proceso,
        evento: Evento,
        rule: TransitionRule,
        at: Timestamp,
    ) -> Result<(Proceso, TransitionOutcome), ProcesoError> {
        let today = at.date();
        let mut next = proceso.clone();
        let mut resolved = Vec::new();

        if let Some(requirement) = rule.requires {
            self.check_requirement(&mut next, requirement, today, &mut resolved)?;
        }
        if let Some(close) = rule.closes {
            self.close(&mut next, close, &evento, today, &mut resolved)?;
        }
        let mut opened = Vec::new();
        if let Some(open) = rule.opens {
            let days = self.config.business_days(open.term);
            let id = next.id.clone();
            opened.push(
                self.plazo_engine
                    .open(&mut next.plazos, &id, open.kind(), today, days)?,
            );
        }
        if evento == Evento::DeclararRebeldia {
            next.rebeldia = true;
        }

        let from = next.estado;
        next.estado = rule.to;
        next.updated_at = at;
        next.transitions.push(TransitionRecord {
            from,
            to: rule.to,
            evento,
            at,
        });

        Ok((
            next,
            TransitionOutcome {
                from,
                to: rule.to,
                evento,
                opened,
                resolved,
            },
        ))
    }

    fn check_requirement(
        &self,
        proceso: &mut Proceso,
        requirement: Requirement,
        today: NaiveDate,
        resolved: &mut Vec<Plazo>,
    ) -> Result<(), ProcesoError> {
        let kind = match requirement {
            Requirement::Elapsed(kind) => {
                match latest_of_kind(&proceso.plazos, kind) {
                    Some(p) if p.is_active() => {}
                    _ => return Ok(()),
                }
                kind
            }
            Requirement::NotPending(kind) => {
                if active_of_kind(&proceso.plazos, kind).is_none() {
                    return Ok(());
                }
                kind
            }
        };
        // An ACTIVO plazo of `kind` exists. It only stops blocking once overdue.
        let plazo = active_of_kind(&proceso.plazos, kind)
            .cloned()
            .ok_or(ProcesoError::PlazoPending { kind })?;
        if !plazo.is_late(today) {
            return Err(ProcesoError::PlazoPending { kind });
        }
        resolved.push(self.plazo_engine.expire(&mut proceso.plazos, &plazo.id, today)?);
        Ok(())
    }

    fn close(
        &self,
        proceso: &mut Proceso,
        close: PlazoClose,
        evento: &Evento,
        today: NaiveDate,
        resolved: &mut Vec<Plazo>,
    ) -> Result<(), ProcesoError> {
        if close.binding {
            let plazo = latest_of_kind(&proceso.plazos, close.kind).cloned().ok_or(
                ProcesoError::IllegalTransition {
                    estado: proceso.estado,
                    evento: *evento,
                },
            )?;
            match plazo.status {
                PlazoStatus::Activo => {
                    resolved.push(self.plazo_engine.mark_fulfilled(
                        &mut proceso.plazos,
                        &plazo.id,
                        today,
                    )?);
                }
                PlazoStatus::Vencido => {
                    return Err(PlazoError::PlazoExpired {
                        kind: plazo.kind,
                        due_on: plazo.due_on,
                        when: today,
                    }
                    .into());
                }
                PlazoStatus::Cumplido => {
                    return Err(PlazoError::AlreadyResolved {
                        id: plazo.id,
                        status: plazo.status,
                    }
                    .into());
                }
            }
            return Ok(());
        }

        let Some(plazo) = proceso.active_plazo(close.kind).cloned() else {
            return Ok(());
        };
        let done = if plazo.is_late(today) {
            self.plazo_engine.expire(&mut proceso.plazos, &plazo.id, today)?
        } else {
            self.plazo_engine
                .mark_fulfilled(&mut proceso.plazos, &plazo.id, today)?
        };
        resolved.push(done);
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
