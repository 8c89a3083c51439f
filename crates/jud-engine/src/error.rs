//! # Engine Errors
//!
//! Every failure the engine surfaces, with a stable machine-readable code
//! and a coarse [`ErrorKind`] that outer layers map to transport status.

use thiserror::Error;

use jud_core::{JudError, Nurej, PlazoId, ProcesoId};
use jud_state::{ContestacionError, PlazoError, ProcesoError, SentenciaError};

use crate::config::ConfigError;
use crate::repository::RepositoryError;

/// Coarse classification for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    /// The request is well-formed but conflicts with current state.
    Conflict,
    /// The payload failed validation.
    Validation,
    /// Lock contention; retry with backoff.
    Busy,
    Internal,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("proceso {0} not found")]
    ProcesoNotFound(ProcesoId),

    #[error("plazo {0} not found")]
    PlazoNotFound(PlazoId),

    #[error("no proceso with NUREJ {0}")]
    NurejNotFound(Nurej),

    /// The proceso lock was not acquired within the configured timeout.
    #[error("proceso {proceso_id} is busy (waited {waited_ms} ms)")]
    Busy { proceso_id: ProcesoId, waited_ms: u64 },

    /// Another writer holds the store-wide NUREJ allocation lock.
    #[error("NUREJ registry is busy (waited {waited_ms} ms)")]
    RegistryBusy { waited_ms: u64 },

    #[error("NUREJ {0} is already assigned")]
    DuplicateNurej(Nurej),

    #[error(transparent)]
    Proceso(#[from] ProcesoError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] JudError),
}

impl EngineError {
    /// Stable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProcesoNotFound(_) => "PROCESO_NOT_FOUND",
            Self::PlazoNotFound(_) => "PLAZO_NOT_FOUND",
            Self::NurejNotFound(_) => "NUREJ_NOT_FOUND",
            Self::Busy { .. } | Self::RegistryBusy { .. } => "BUSY",
            Self::DuplicateNurej(_) => "DUPLICATE_NUREJ",
            Self::Repository(_) => "REPOSITORY_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Core(_) => "VALIDATION_ERROR",
            Self::Proceso(e) => proceso_code(e),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProcesoNotFound(_) | Self::PlazoNotFound(_) | Self::NurejNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Busy { .. } | Self::RegistryBusy { .. } => ErrorKind::Busy,
            Self::DuplicateNurej(_) => ErrorKind::Conflict,
            Self::Core(_) => ErrorKind::Validation,
            Self::Repository(_) | Self::Config(_) => ErrorKind::Internal,
            Self::Proceso(e) => proceso_kind(e),
        }
    }

    /// Only lock contention is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. } | Self::RegistryBusy { .. })
    }
}

fn proceso_code(e: &ProcesoError) -> &'static str {
    match e {
        ProcesoError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
        ProcesoError::InvalidPartes(_) => "INVALID_PARTES",
        ProcesoError::PlazoPending { .. } => "PLAZO_PENDING",
        ProcesoError::MissingPayload { .. } => "MISSING_PAYLOAD",
        ProcesoError::ContestacionAlreadySubmitted => "CONTESTACION_ALREADY_SUBMITTED",
        ProcesoError::Plazo(p) => match p {
            PlazoError::ConflictingPlazo { .. } => "CONFLICTING_PLAZO",
            PlazoError::AlreadyResolved { .. } => "PLAZO_ALREADY_RESOLVED",
            PlazoError::PlazoExpired { .. } => "PLAZO_VENCIDO",
            PlazoError::NotFound(_) => "PLAZO_NOT_FOUND",
            PlazoError::Calendar(_) => "CALENDAR_ERROR",
        },
        ProcesoError::Contestacion(c) => match c {
            ContestacionError::MissingField { .. } => "MISSING_FIELD",
            ContestacionError::EmptyExceptionSet => "EMPTY_EXCEPTION_SET",
            ContestacionError::DuplicateException(_) => "DUPLICATE_EXCEPTION",
            ContestacionError::MissingGrounding { .. } => "MISSING_GROUNDING",
            ContestacionError::InvalidValue { .. } => "INVALID_VALUE",
            ContestacionError::IncompleteAcceptance { .. } => "INCOMPLETE_ACCEPTANCE",
        },
        ProcesoError::Sentencia(s) => match s {
            SentenciaError::IncompleteDraft { .. } => "INCOMPLETE_DRAFT",
            SentenciaError::MissingOutcome { .. } => "MISSING_OUTCOME",
            SentenciaError::InconsistentOutcome(_) => "INCONSISTENT_OUTCOME",
            SentenciaError::AlreadyIssued { .. } => "ALREADY_ISSUED",
            SentenciaError::Canonicalization(_) => "INTERNAL_ERROR",
        },
    }
}

fn proceso_kind(e: &ProcesoError) -> ErrorKind {
    match e {
        ProcesoError::Contestacion(_)
        | ProcesoError::InvalidPartes(_)
        | ProcesoError::MissingPayload { .. } => ErrorKind::Validation,
        ProcesoError::Sentencia(SentenciaError::Canonicalization(_))
        | ProcesoError::Plazo(PlazoError::Calendar(_)) => ErrorKind::Internal,
        ProcesoError::Sentencia(
            SentenciaError::IncompleteDraft { .. }
            | SentenciaError::MissingOutcome { .. }
            | SentenciaError::InconsistentOutcome(_),
        ) => ErrorKind::Validation,
        ProcesoError::Plazo(PlazoError::NotFound(_)) => ErrorKind::NotFound,
        ProcesoError::IllegalTransition { .. }
        | ProcesoError::PlazoPending { .. }
        | ProcesoError::ContestacionAlreadySubmitted
        | ProcesoError::Plazo(_)
        | ProcesoError::Sentencia(_) => ErrorKind::Conflict,
    }
}
