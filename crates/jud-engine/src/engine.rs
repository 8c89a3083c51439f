//! # ProcesoEngine
//!
//! The synchronous API consumed by the HTTP and CLI surfaces. Every
//! mutating call runs under the proceso's lock: load, apply through the
//! state machine, save, notify. Repositories shared between processes add
//! a store lock inside the in-process one. Reads take no lock.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use jud_core::{Nurej, PlazoId, ProcesoId, Timestamp};
use jud_state::{
    BorradorSentencia, ContestacionPayload, Demanda, EstadoProceso, Evento, Parte, Plazo,
    PlazoKind, PlazoStatus, Proceso, ProcesoError, ProcesoStateMachine, Sentencia,
    TransitionOutcome,
};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::lock::ProcesoLocks;
use crate::notify::{DomainEvent, NotificationSink, TracingSink};
use crate::repository::{
    InMemoryRepository, LockScope, ProcesoRepository, RepositoryError, StoreLock,
};

/// Input for [`ProcesoEngine::crear_proceso`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NuevoProceso {
    pub partes: Vec<Parte>,
    pub materia: String,
    pub juzgado: String,
    #[serde(default)]
    pub demanda: Option<Demanda>,
}

/// A transition request, tagged by `evento`. Payload-bearing events carry
/// their payload inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "evento", rename_all = "snake_case")]
pub enum Solicitud {
    Presentar,
    Admitir,
    Observar,
    LibrarCitacion,
    Citar,
    Contestar { contestacion: ContestacionPayload },
    DeclararRebeldia,
    ContestarReconvencion,
    ResolverExcepciones { fundada: bool },
    IniciarAudienciaPreliminar,
    CerrarPrueba,
    EmitirSentencia { sentencia: BorradorSentencia },
    DeclararEjecutoria,
    Archivar,
}

impl Solicitud {
    /// The event for payload-free requests.
    fn simple_evento(&self) -> Option<Evento> {
        Some(match self {
            Self::Presentar => Evento::Presentar,
            Self::Admitir => Evento::Admitir,
            Self::Observar => Evento::Observar,
            Self::LibrarCitacion => Evento::LibrarCitacion,
            Self::Citar => Evento::Citar,
            Self::DeclararRebeldia => Evento::DeclararRebeldia,
            Self::ContestarReconvencion => Evento::ContestarReconvencion,
            Self::ResolverExcepciones { fundada } => Evento::ResolverExcepciones { fundada: *fundada },
            Self::IniciarAudienciaPreliminar => Evento::IniciarAudienciaPreliminar,
            Self::CerrarPrueba => Evento::CerrarPrueba,
            Self::DeclararEjecutoria => Evento::DeclararEjecutoria,
            Self::Archivar => Evento::Archivar,
            Self::Contestar { .. } | Self::EmitirSentencia { .. } => return None,
        })
    }
}

impl TryFrom<Evento> for Solicitud {
    type Error = ProcesoError;

    /// Payload-free events only.
    fn try_from(evento: Evento) -> Result<Self, Self::Error> {
        Ok(match evento {
            Evento::Presentar => Self::Presentar,
            Evento::Admitir => Self::Admitir,
            Evento::Observar => Self::Observar,
            Evento::LibrarCitacion => Self::LibrarCitacion,
            Evento::Citar => Self::Citar,
            Evento::DeclararRebeldia => Self::DeclararRebeldia,
            Evento::ContestarReconvencion => Self::ContestarReconvencion,
            Evento::ResolverExcepciones { fundada } => Self::ResolverExcepciones { fundada },
            Evento::IniciarAudienciaPreliminar => Self::IniciarAudienciaPreliminar,
            Evento::CerrarPrueba => Self::CerrarPrueba,
            Evento::DeclararEjecutoria => Self::DeclararEjecutoria,
            Evento::Archivar => Self::Archivar,
            Evento::Contestar { .. } | Evento::EmitirSentencia => {
                return Err(ProcesoError::MissingPayload {
                    evento: evento.name(),
                })
            }
        })
    }
}

/// Answer to [`ProcesoEngine::dias_restantes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiasRestantes {
    pub plazo_id: PlazoId,
    pub proceso_id: ProcesoId,
    pub kind: PlazoKind,
    pub status: PlazoStatus,
    pub due_on: NaiveDate,
    /// Signed calendar days; negative when overdue.
    pub dias: i64,
    /// Signed business days.
    pub dias_habiles: i64,
}

/// Outcome of [`ProcesoEngine::sweep_expirations`]. One proceso failing
/// does not stop the sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Plazos flipped to VENCIDO and saved.
    pub vencidos: Vec<Plazo>,
    /// Procesos skipped because another writer held their lock.
    pub ocupados: Vec<ProcesoId>,
    pub fallidos: Vec<SweepFailure>,
}

/// A proceso the sweep could not load or save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub proceso_id: ProcesoId,
    pub code: String,
    pub message: String,
}

/// The judicial process engine.
pub struct ProcesoEngine {
    config: EngineConfig,
    machine: ProcesoStateMachine,
    repo: Arc<dyn ProcesoRepository>,
    sink: Arc<dyn NotificationSink>,
    locks: ProcesoLocks,
    /// Serializes NUREJ allocation within this process.
    registry: Mutex<()>,
}

impl std::fmt::Debug for ProcesoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcesoEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProcesoEngine {
    /// Build an engine over the given repository and sink.
    pub fn new(
        config: EngineConfig,
        repo: Arc<dyn ProcesoRepository>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let machine = ProcesoStateMachine::new(config.calendar(), config.plazos.clone());
        Ok(Self {
            config,
            machine,
            repo,
            sink,
            locks: ProcesoLocks::new(),
            registry: Mutex::new(()),
        })
    }

    /// In-memory repository, tracing sink.
    pub fn in_memory(config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(
            config,
            Arc::new(InMemoryRepository::new()),
            Arc::new(TracingSink),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locks(&self) -> &ProcesoLocks {
        &self.locks
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Create a proceso with a freshly allocated NUREJ.
    pub fn crear_proceso(&self, nuevo: NuevoProceso, at: Timestamp) -> Result<Proceso, EngineError> {
        let _registry = self.registry.lock();
        let _store = self.store_lock(LockScope::Registry)?;
        let nurej = self.allocate_nurej(at.date().year())?;
        self.insert_new(nurej, nuevo, at)
    }

    /// Create a proceso under an existing NUREJ (imports).
    pub fn crear_proceso_con_nurej(
        &self,
        nurej: Nurej,
        nuevo: NuevoProceso,
        at: Timestamp,
    ) -> Result<Proceso, EngineError> {
        let _registry = self.registry.lock();
        let _store = self.store_lock(LockScope::Registry)?;
        if self.repo.find_by_nurej(&nurej)?.is_some() {
            return Err(EngineError::DuplicateNurej(nurej));
        }
        self.insert_new(nurej, nuevo, at)
    }

    fn insert_new(&self, nurej: Nurej, nuevo: NuevoProceso, at: Timestamp) -> Result<Proceso, EngineError> {
        let proceso = Proceso::new(
            nurej,
            nuevo.materia,
            nuevo.juzgado,
            nuevo.partes,
            nuevo.demanda,
            at,
        )?;
        self.repo.save(&proceso)?;
        tracing::info!(
            proceso_id = %proceso.id,
            nurej = %proceso.nurej,
            "proceso created"
        );
        self.sink.notify(&DomainEvent::ProcesoCreado {
            proceso_id: proceso.id.clone(),
            nurej: proceso.nurej.clone(),
        });
        Ok(proceso)
    }

    /// `{prefix}{year}{sequence:06}`, first free sequence number.
    fn allocate_nurej(&self, year: i32) -> Result<Nurej, EngineError> {
        let mut seq = self.repo.list_ids()?.len() as u64 + 1;
        loop {
            let nurej = Nurej::new(format!("{}{year}{seq:06}", self.config.nurej_prefix))?;
            if self.repo.find_by_nurej(&nurej)?.is_none() {
                return Ok(nurej);
            }
            seq += 1;
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Apply a transition request and return the updated proceso.
    pub fn transicionar(
        &self,
        id: &ProcesoId,
        solicitud: Solicitud,
        at: Timestamp,
    ) -> Result<Proceso, EngineError> {
        let (proceso, issued) = self.mutate(id, |machine, proceso| match solicitud {
            Solicitud::Contestar { contestacion } => {
                Ok((machine.contestar(proceso, contestacion, at)?, None))
            }
            Solicitud::EmitirSentencia { sentencia } => {
                let issued = machine.emitir_sentencia(proceso, sentencia, at)?;
                Ok((issued.transition, Some(issued.sentencia)))
            }
            simple => {
                let evento = simple
                    .simple_evento()
                    .ok_or(ProcesoError::MissingPayload { evento: "unknown" })?;
                Ok((machine.transition(proceso, evento, at)?, None))
            }
        })?;
        if let Some(sentencia) = issued {
            self.notify_sentencia(&proceso.id, &sentencia);
        }
        Ok(proceso)
    }

    /// Issue the sentencia and return it.
    pub fn emitir_sentencia(
        &self,
        id: &ProcesoId,
        borrador: BorradorSentencia,
        at: Timestamp,
    ) -> Result<Sentencia, EngineError> {
        let (_, issued) = self.mutate(id, |machine, proceso| {
            let issued = machine.emitir_sentencia(proceso, borrador, at)?;
            Ok((issued.transition, issued.sentencia))
        })?;
        self.notify_sentencia(id, &issued);
        Ok(issued)
    }

    fn notify_sentencia(&self, id: &ProcesoId, sentencia: &Sentencia) {
        tracing::info!(
            proceso_id = %id,
            sentencia_id = %sentencia.id,
            content_hash = %sentencia.content_hash,
            "sentencia issued"
        );
        self.sink.notify(&DomainEvent::SentenciaEmitida {
            proceso_id: id.clone(),
            sentencia_id: sentencia.id.clone(),
            content_hash: sentencia.content_hash.to_string(),
        });
    }

    /// Expire overdue plazos across every proceso. Procesos whose lock is
    /// busy are skipped and picked up by the next sweep; procesos that fail
    /// to load or save are reported and the sweep moves on.
    pub fn sweep_expirations(&self, hoy: NaiveDate) -> Result<SweepReport, EngineError> {
        let mut report = SweepReport::default();
        for id in self.repo.list_ids()? {
            let result = self.locks.with_lock(&id, self.config.lock_timeout(), || {
                let _store = self.store_lock(LockScope::Proceso(&id))?;
                let Some(mut proceso) = self.repo.load(&id)? else {
                    return Ok(Vec::new());
                };
                let flipped = self.machine.sweep_expirations(&mut proceso, hoy);
                if !flipped.is_empty() {
                    self.repo.save(&proceso)?;
                }
                Ok(flipped)
            });
            match result {
                Ok(flipped) => {
                    for plazo in &flipped {
                        tracing::warn!(
                            proceso_id = %plazo.proceso_id,
                            plazo_id = %plazo.id,
                            kind = %plazo.kind,
                            due_on = %plazo.due_on,
                            "plazo expired"
                        );
                        self.sink.notify(&DomainEvent::plazo_vencido(plazo));
                    }
                    report.vencidos.extend(flipped);
                }
                Err(EngineError::Busy { .. }) => report.ocupados.push(id),
                Err(e) => {
                    tracing::error!(proceso_id = %id, code = e.code(), error = %e, "sweep failed for proceso");
                    report.fallidos.push(SweepFailure {
                        proceso_id: id,
                        code: e.code().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Lock, load, apply `f`, save, then log and notify.
    fn mutate<R>(
        &self,
        id: &ProcesoId,
        f: impl FnOnce(&ProcesoStateMachine, &mut Proceso) -> Result<(TransitionOutcome, R), ProcesoError>,
    ) -> Result<(Proceso, R), EngineError> {
        let (proceso, outcome, extra) = self.locks.with_lock(id, self.config.lock_timeout(), || {
            let _store = self.store_lock(LockScope::Proceso(id))?;
            let mut proceso = self
                .repo
                .load(id)?
                .ok_or_else(|| EngineError::ProcesoNotFound(id.clone()))?;
            let (outcome, extra) = f(&self.machine, &mut proceso)?;
            self.repo.save(&proceso)?;
            Ok((proceso, outcome, extra))
        })?;
        self.publish(&proceso, &outcome);
        Ok((proceso, extra))
    }

    /// Take the repository's cross-process lock for `scope`, mapping a
    /// timeout to the matching busy error.
    fn store_lock(&self, scope: LockScope<'_>) -> Result<Option<StoreLock>, EngineError> {
        self.repo
            .lock_exclusive(scope, self.config.lock_timeout())
            .map_err(|e| match e {
                RepositoryError::LockTimeout { path, waited_ms } => {
                    tracing::warn!(path = %path.display(), waited_ms, "store lock contention");
                    match scope {
                        LockScope::Proceso(id) => EngineError::Busy {
                            proceso_id: id.clone(),
                            waited_ms,
                        },
                        LockScope::Registry => EngineError::RegistryBusy { waited_ms },
                    }
                }
                other => other.into(),
            })
    }

    fn publish(&self, proceso: &Proceso, outcome: &TransitionOutcome) {
        tracing::info!(
            proceso_id = %proceso.id,
            nurej = %proceso.nurej,
            from = %outcome.from,
            to = %outcome.to,
            evento = %outcome.evento,
            "transition applied"
        );
        self.sink.notify(&DomainEvent::TransicionAplicada {
            proceso_id: proceso.id.clone(),
            from: outcome.from,
            to: outcome.to,
            evento: outcome.evento,
        });
        for plazo in &outcome.resolved {
            if plazo.status == PlazoStatus::Vencido {
                tracing::warn!(proceso_id = %proceso.id, kind = %plazo.kind, "plazo expired during transition");
                self.sink.notify(&DomainEvent::plazo_vencido(plazo));
            }
        }
        for plazo in &outcome.opened {
            tracing::debug!(
                proceso_id = %proceso.id,
                kind = %plazo.kind,
                due_on = %plazo.due_on,
                business_days = plazo.business_days,
                "plazo opened"
            );
            self.sink.notify(&DomainEvent::plazo_abierto(plazo));
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn obtener(&self, id: &ProcesoId) -> Result<Proceso, EngineError> {
        self.repo
            .load(id)?
            .ok_or_else(|| EngineError::ProcesoNotFound(id.clone()))
    }

    pub fn estado(&self, id: &ProcesoId) -> Result<EstadoProceso, EngineError> {
        Ok(self.obtener(id)?.estado)
    }

    pub fn consultar_plazos(&self, id: &ProcesoId) -> Result<Vec<Plazo>, EngineError> {
        Ok(self.obtener(id)?.plazos)
    }

    pub fn buscar_por_nurej(&self, nurej: &Nurej) -> Result<Proceso, EngineError> {
        self.repo
            .find_by_nurej(nurej)?
            .ok_or_else(|| EngineError::NurejNotFound(nurej.clone()))
    }

    pub fn listar(&self) -> Result<Vec<ProcesoId>, EngineError> {
        Ok(self.repo.list_ids()?)
    }

    /// Days remaining on a plazo as of `hoy`.
    pub fn dias_restantes(&self, plazo_id: &PlazoId, hoy: NaiveDate) -> Result<DiasRestantes, EngineError> {
        let (proceso_id, plazo) = self
            .repo
            .find_plazo(plazo_id)?
            .ok_or_else(|| EngineError::PlazoNotFound(plazo_id.clone()))?;
        let engine = self.machine.plazo_engine();
        Ok(DiasRestantes {
            plazo_id: plazo.id.clone(),
            proceso_id,
            kind: plazo.kind,
            status: plazo.status,
            due_on: plazo.due_on,
            dias: engine.days_remaining(&plazo, hoy),
            dias_habiles: engine.business_days_remaining(&plazo, hoy),
        })
    }
}
