//! # Proceso States, Events and the Transition Table
//!
//! A validated enum rather than typestate: procesos are persisted and
//! loaded with their state unknown at compile time, and the same event
//! (`citar`, `archivar`) is legal from several states.
//!
//! ```text
//! BORRADOR ─▶ PRESENTADO ◀─▶ OBSERVADO
//!                  │
//!                  ▼
//!              ADMITIDO ─▶ CITACION_PENDIENTE ─▶ CONTESTACION_PENDIENTE
//!
//! CONTESTACION_PENDIENTE ── CONTESTAR | RECONVENCION | rebeldía ─▶ AUDIENCIA_PRELIMINAR
//!                        ── EXCEPCIONES ─▶ EXCEPCIONES_PENDIENTE_RESPUESTA
//!                        ── ALLANAMIENTO ─▶ SENTENCIA_PENDIENTE
//!
//! EXCEPCIONES_PENDIENTE_RESPUESTA ── infundadas ─▶ AUDIENCIA_PRELIMINAR
//!                                 ── fundadas ───▶ ARCHIVADO
//!
//! AUDIENCIA_PRELIMINAR ─▶ PERIODO_PRUEBA ─▶ SENTENCIA_PENDIENTE ─▶ SENTENCIADO ─▶ EJECUTORIADO
//! ```
//!
//! [`transition_rule`] is the single source of truth for legality. It is a
//! pure function; applying the plazo effects is the state machine's job.

use serde::{Deserialize, Serialize};

use crate::config::PlazoTerm;
use crate::plazo::PlazoKind;

// ─── EstadoProceso ───────────────────────────────────────────────────

/// The procedural stage of a proceso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoProceso {
    /// Demanda being drafted.
    Borrador,
    /// Demanda filed, awaiting admission.
    Presentado,
    /// Court asked for corrections (subsanación).
    Observado,
    /// Demanda admitted.
    Admitido,
    /// Citación ordered, not yet served.
    CitacionPendiente,
    /// Defendant served, contestación plazo running.
    ContestacionPendiente,
    /// Exceptions filed, claimant's response plazo running.
    ExcepcionesPendienteRespuesta,
    /// Preliminary hearing stage.
    AudienciaPreliminar,
    /// Evidence period.
    PeriodoPrueba,
    /// Awaiting the sentencia.
    SentenciaPendiente,
    /// Sentencia issued and notified; appeal window running.
    Sentenciado,
    /// Sentencia is final (terminal).
    Ejecutoriado,
    /// Case closed (terminal).
    Archivado,
}

impl EstadoProceso {
    /// Every state, in procedural order.
    pub const ALL: [EstadoProceso; 13] = [
        Self::Borrador,
        Self::Presentado,
        Self::Observado,
        Self::Admitido,
        Self::CitacionPendiente,
        Self::ContestacionPendiente,
        Self::ExcepcionesPendienteRespuesta,
        Self::AudienciaPreliminar,
        Self::PeriodoPrueba,
        Self::SentenciaPendiente,
        Self::Sentenciado,
        Self::Ejecutoriado,
        Self::Archivado,
    ];

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ejecutoriado | Self::Archivado)
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Borrador => "BORRADOR",
            Self::Presentado => "PRESENTADO",
            Self::Observado => "OBSERVADO",
            Self::Admitido => "ADMITIDO",
            Self::CitacionPendiente => "CITACION_PENDIENTE",
            Self::ContestacionPendiente => "CONTESTACION_PENDIENTE",
            Self::ExcepcionesPendienteRespuesta => "EXCEPCIONES_PENDIENTE_RESPUESTA",
            Self::AudienciaPreliminar => "AUDIENCIA_PRELIMINAR",
            Self::PeriodoPrueba => "PERIODO_PRUEBA",
            Self::SentenciaPendiente => "SENTENCIA_PENDIENTE",
            Self::Sentenciado => "SENTENCIADO",
            Self::Ejecutoriado => "EJECUTORIADO",
            Self::Archivado => "ARCHIVADO",
        }
    }

    /// Events accepted in this state. Empty for terminal states.
    pub fn valid_events(&self) -> Vec<Evento> {
        Evento::all()
            .into_iter()
            .filter(|e| transition_rule(*self, e).is_some())
            .collect()
    }
}

impl std::fmt::Display for EstadoProceso {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── TipoContestacion ────────────────────────────────────────────────

/// The four mutually exclusive kinds of defendant response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoContestacion {
    Contestar,
    Excepciones,
    Reconvencion,
    Allanamiento,
}

impl TipoContestacion {
    pub const ALL: [TipoContestacion; 4] = [
        Self::Contestar,
        Self::Excepciones,
        Self::Reconvencion,
        Self::Allanamiento,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contestar => "CONTESTAR",
            Self::Excepciones => "EXCEPCIONES",
            Self::Reconvencion => "RECONVENCION",
            Self::Allanamiento => "ALLANAMIENTO",
        }
    }
}

impl std::fmt::Display for TipoContestacion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Evento ──────────────────────────────────────────────────────────

/// A procedural act that may move a proceso to another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "evento", rename_all = "snake_case")]
pub enum Evento {
    Presentar,
    Admitir,
    Observar,
    LibrarCitacion,
    Citar,
    Contestar { tipo: TipoContestacion },
    DeclararRebeldia,
    ContestarReconvencion,
    ResolverExcepciones { fundada: bool },
    IniciarAudienciaPreliminar,
    CerrarPrueba,
    EmitirSentencia,
    DeclararEjecutoria,
    Archivar,
}

impl Evento {
    /// Every distinct event value, including each contestación kind and
    /// both exception outcomes.
    pub fn all() -> Vec<Evento> {
        let mut all = vec![
            Self::Presentar,
            Self::Admitir,
            Self::Observar,
            Self::LibrarCitacion,
            Self::Citar,
        ];
        all.extend(TipoContestacion::ALL.into_iter().map(|tipo| Self::Contestar { tipo }));
        all.extend([
            Self::DeclararRebeldia,
            Self::ContestarReconvencion,
            Self::ResolverExcepciones { fundada: false },
            Self::ResolverExcepciones { fundada: true },
            Self::IniciarAudienciaPreliminar,
            Self::CerrarPrueba,
            Self::EmitirSentencia,
            Self::DeclararEjecutoria,
            Self::Archivar,
        ]);
        all
    }

    /// Wire name, without parameters.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Presentar => "presentar",
            Self::Admitir => "admitir",
            Self::Observar => "observar",
            Self::LibrarCitacion => "librar_citacion",
            Self::Citar => "citar",
            Self::Contestar { .. } => "contestar",
            Self::DeclararRebeldia => "declarar_rebeldia",
            Self::ContestarReconvencion => "contestar_reconvencion",
            Self::ResolverExcepciones { .. } => "resolver_excepciones",
            Self::IniciarAudienciaPreliminar => "iniciar_audiencia_preliminar",
            Self::CerrarPrueba => "cerrar_prueba",
            Self::EmitirSentencia => "emitir_sentencia",
            Self::DeclararEjecutoria => "declarar_ejecutoria",
            Self::Archivar => "archivar",
        }
    }
}

impl std::fmt::Display for Evento {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contestar { tipo } => write!(f, "contestar({tipo})"),
            Self::ResolverExcepciones { fundada } => {
                write!(f, "resolver_excepciones(fundada={fundada})")
            }
            other => f.write_str(other.name()),
        }
    }
}

// ─── Transition Table ────────────────────────────────────────────────

/// A plazo the transition closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlazoClose {
    pub kind: PlazoKind,
    /// Party-side act: late closing fails with `PlazoExpired`. Court-side
    /// closes (`binding == false`) record a late plazo as VENCIDO instead.
    pub binding: bool,
}

/// A plazo the transition opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlazoOpen {
    pub term: PlazoTerm,
}

impl PlazoOpen {
    pub fn kind(&self) -> PlazoKind {
        self.term.kind()
    }
}

/// A plazo-state precondition checked before the transition applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The latest plazo of this kind has run out.
    Elapsed(PlazoKind),
    /// No plazo of this kind is still running.
    NotPending(PlazoKind),
}

/// Outcome of looking up `(state, event)` in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub to: EstadoProceso,
    pub closes: Option<PlazoClose>,
    pub opens: Option<PlazoOpen>,
    pub requires: Option<Requirement>,
}

impl TransitionRule {
    fn to(to: EstadoProceso) -> Self {
        Self {
            to,
            closes: None,
            opens: None,
            requires: None,
        }
    }

    fn closing(mut self, kind: PlazoKind, binding: bool) -> Self {
        self.closes = Some(PlazoClose { kind, binding });
        self
    }

    fn opening(mut self, term: PlazoTerm) -> Self {
        self.opens = Some(PlazoOpen { term });
        self
    }

    fn requiring(mut self, requirement: Requirement) -> Self {
        self.requires = Some(requirement);
        self
    }
}

/// Look up the transition for `evento` in `estado`. `None` means illegal.
pub fn transition_rule(estado: EstadoProceso, evento: &Evento) -> Option<TransitionRule> {
    use EstadoProceso as E;
    use Evento as V;
    use PlazoKind as K;

    let rule = match (estado, evento) {
        (E::Borrador, V::Presentar) => TransitionRule::to(E::Presentado),
        (E::Observado, V::Presentar) => {
            TransitionRule::to(E::Presentado).closing(K::Subsanacion, true)
        }
        (E::Presentado, V::Admitir) => {
            TransitionRule::to(E::Admitido).opening(PlazoTerm::Citacion)
        }
        (E::Presentado, V::Observar) => {
            TransitionRule::to(E::Observado).opening(PlazoTerm::Subsanacion)
        }
        (E::Admitido, V::LibrarCitacion) => TransitionRule::to(E::CitacionPendiente),
        (E::Admitido | E::CitacionPendiente, V::Citar) => {
            TransitionRule::to(E::ContestacionPendiente)
                .closing(K::Citacion, false)
                .opening(PlazoTerm::Contestacion)
        }
        (E::ContestacionPendiente, V::Contestar { tipo }) => {
            let base = match tipo {
                TipoContestacion::Contestar => TransitionRule::to(E::AudienciaPreliminar),
                TipoContestacion::Excepciones => {
                    TransitionRule::to(E::ExcepcionesPendienteRespuesta)
                        .opening(PlazoTerm::ExcepcionesRespuesta)
                }
                TipoContestacion::Reconvencion => TransitionRule::to(E::AudienciaPreliminar)
                    .opening(PlazoTerm::ReconvencionRespuesta),
                TipoContestacion::Allanamiento => TransitionRule::to(E::SentenciaPendiente)
                    .opening(PlazoTerm::SentenciaAllanamiento),
            };
            base.closing(K::Contestacion, true)
        }
        (E::ContestacionPendiente, V::DeclararRebeldia) => {
            TransitionRule::to(E::AudienciaPreliminar)
                .requiring(Requirement::Elapsed(K::Contestacion))
        }
        (E::AudienciaPreliminar, V::ContestarReconvencion) => {
            TransitionRule::to(E::AudienciaPreliminar).closing(K::ReconvencionRespuesta, true)
        }
        (E::ExcepcionesPendienteRespuesta, V::ResolverExcepciones { fundada }) => {
            let to = if *fundada {
                E::Archivado
            } else {
                E::AudienciaPreliminar
            };
            TransitionRule::to(to).closing(K::ExcepcionesRespuesta, false)
        }
        (E::AudienciaPreliminar, V::IniciarAudienciaPreliminar) => {
            TransitionRule::to(E::PeriodoPrueba)
                .requiring(Requirement::NotPending(K::ReconvencionRespuesta))
                .opening(PlazoTerm::Prueba)
        }
        (E::PeriodoPrueba, V::CerrarPrueba) => TransitionRule::to(E::SentenciaPendiente)
            .closing(K::Prueba, false)
            .opening(PlazoTerm::SentenciaOrdinaria),
        (E::SentenciaPendiente, V::EmitirSentencia) => TransitionRule::to(E::Sentenciado)
            .closing(K::Sentencia, false)
            .opening(PlazoTerm::Apelacion),
        (E::Sentenciado, V::DeclararEjecutoria) => {
            TransitionRule::to(E::Ejecutoriado).requiring(Requirement::Elapsed(K::Apelacion))
        }
        (E::Borrador | E::Presentado | E::Observado, V::Archivar) => {
            TransitionRule::to(E::Archivado).closing(K::Subsanacion, false)
        }
        _ => return None,
    };
    Some(rule)
}

// ─── Tests ───────────────────────────────────────────────────────────
