//! # Plazo Engine
//!
//! Creates, fulfils and expires procedural deadlines. A proceso's plazos
//! live in an ordered `Vec<Plazo>` on the aggregate; this module is the
//! only code that mutates their status, and the only code (through
//! [`BusinessDayCalculator`]) that computes a due date.
//!
//! ## Status
//!
//! ```text
//! ACTIVO ──▶ CUMPLIDO   (acted on or before the due date)
//!    │
//!    └─────▶ VENCIDO    (due date passed: sweep, or a late court-side close)
//! ```
//!
//! Plazos are never deleted. At most one ACTIVO plazo of each kind exists
//! per proceso; [`PlazoEngine::open`] enforces it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jud_core::{BusinessDayCalculator, CalendarError, PlazoId, ProcesoId};

// ─── Kind & Status ───────────────────────────────────────────────────

/// The procedural act a plazo is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlazoKind {
    /// Court serves the citación on the defendant.
    Citacion,
    /// Claimant corrects an observed demanda.
    Subsanacion,
    /// Defendant answers the demanda.
    Contestacion,
    /// Claimant responds to procedural exceptions.
    ExcepcionesRespuesta,
    /// Claimant answers the counter-claim.
    ReconvencionRespuesta,
    /// Evidence period.
    Prueba,
    /// Court issues the sentencia.
    Sentencia,
    /// Window to appeal the sentencia.
    Apelacion,
}

impl PlazoKind {
    /// All kinds, in procedural order.
    pub const ALL: [PlazoKind; 8] = [
        Self::Citacion,
        Self::Subsanacion,
        Self::Contestacion,
        Self::ExcepcionesRespuesta,
        Self::ReconvencionRespuesta,
        Self::Prueba,
        Self::Sentencia,
        Self::Apelacion,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citacion => "CITACION",
            Self::Subsanacion => "SUBSANACION",
            Self::Contestacion => "CONTESTACION",
            Self::ExcepcionesRespuesta => "EXCEPCIONES_RESPUESTA",
            Self::ReconvencionRespuesta => "RECONVENCION_RESPUESTA",
            Self::Prueba => "PRUEBA",
            Self::Sentencia => "SENTENCIA",
            Self::Apelacion => "APELACION",
        }
    }
}

impl std::fmt::Display for PlazoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a plazo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlazoStatus {
    Activo,
    Cumplido,
    Vencido,
}

impl PlazoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activo => "ACTIVO",
            Self::Cumplido => "CUMPLIDO",
            Self::Vencido => "VENCIDO",
        }
    }
}

impl std::fmt::Display for PlazoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Plazo ───────────────────────────────────────────────────────────

/// A procedural deadline attached to one proceso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plazo {
    pub id: PlazoId,
    pub proceso_id: ProcesoId,
    pub kind: PlazoKind,
    /// Notification date. Counting starts the business day after its
    /// effective date.
    pub opened_on: NaiveDate,
    /// Statutory length in business days.
    pub business_days: u32,
    /// Last day on which the act is on time.
    pub due_on: NaiveDate,
    pub status: PlazoStatus,
    /// Date the plazo left ACTIVO.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_on: Option<NaiveDate>,
}

impl Plazo {
    pub fn is_active(&self) -> bool {
        self.status == PlazoStatus::Activo
    }

    /// Whether `date` falls after the due date.
    pub fn is_late(&self, date: NaiveDate) -> bool {
        date > self.due_on
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Deadline-engine misuse or late action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlazoError {
    /// An ACTIVO plazo of the same kind already exists.
    #[error("an active {kind} plazo already exists ({existing})")]
    ConflictingPlazo {
        kind: PlazoKind,
        existing: PlazoId,
    },

    /// The plazo is no longer ACTIVO.
    #[error("plazo {id} is already {status}")]
    AlreadyResolved {
        id: PlazoId,
        status: PlazoStatus,
    },

    /// The act came after the due date (plazo vencido).
    #[error("{kind} plazo expired on {due_on}; act dated {when} is extemporaneous")]
    PlazoExpired {
        kind: PlazoKind,
        due_on: NaiveDate,
        when: NaiveDate,
    },

    /// No plazo with this id on the proceso.
    #[error("plazo {0} not found")]
    NotFound(PlazoId),

    /// Due-date arithmetic failed.
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Opens, fulfils and expires plazos on a proceso's plazo list.
#[derive(Debug, Clone, Default)]
pub struct PlazoEngine {
    calendar: BusinessDayCalculator,
}

impl PlazoEngine {
    pub fn new(calendar: BusinessDayCalculator) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &BusinessDayCalculator {
        &self.calendar
    }

    /// Open a plazo of `kind` on `today` lasting `business_days`.
    ///
    /// Fails with [`PlazoError::ConflictingPlazo`] when an ACTIVO plazo of
    /// the same kind is already on the list.
    pub fn open(
        &self,
        plazos: &mut Vec<Plazo>,
        proceso_id: &ProcesoId,
        kind: PlazoKind,
        today: NaiveDate,
        business_days: u32,
    ) -> Result<Plazo, PlazoError> {
        if let Some(existing) = active_of_kind(plazos, kind) {
            return Err(PlazoError::ConflictingPlazo {
                kind,
                existing: existing.id.clone(),
            });
        }
        let due_on = self.calendar.add_business_days(today, business_days)?;
        let plazo = Plazo {
            id: PlazoId::new(),
            proceso_id: proceso_id.clone(),
            kind,
            opened_on: today,
            business_days,
            due_on,
            status: PlazoStatus::Activo,
            resolved_on: None,
        };
        plazos.push(plazo.clone());
        Ok(plazo)
    }

    /// Mark a plazo CUMPLIDO as of `when`.
    ///
    /// Late fulfilment is rejected with [`PlazoError::PlazoExpired`] and the
    /// plazo is left untouched.
    pub fn mark_fulfilled(
        &self,
        plazos: &mut [Plazo],
        id: &PlazoId,
        when: NaiveDate,
    ) -> Result<Plazo, PlazoError> {
        let plazo = find_active_mut(plazos, id)?;
        if plazo.is_late(when) {
            return Err(PlazoError::PlazoExpired {
                kind: plazo.kind,
                due_on: plazo.due_on,
                when,
            });
        }
        plazo.status = PlazoStatus::Cumplido;
        plazo.resolved_on = Some(when);
        Ok(plazo.clone())
    }

    /// Mark a single ACTIVO plazo VENCIDO as of `today`.
    pub fn expire(
        &self,
        plazos: &mut [Plazo],
        id: &PlazoId,
        today: NaiveDate,
    ) -> Result<Plazo, PlazoError> {
        let plazo = find_active_mut(plazos, id)?;
        plazo.status = PlazoStatus::Vencido;
        plazo.resolved_on = Some(today);
        Ok(plazo.clone())
    }

    /// Flip every ACTIVO plazo whose due date is before `today` to VENCIDO
    /// and return the flipped plazos.
    pub fn sweep_expirations(&self, plazos: &mut [Plazo], today: NaiveDate) -> Vec<Plazo> {
        plazos
            .iter_mut()
            .filter(|p| p.is_active() && p.due_on < today)
            .map(|p| {
                p.status = PlazoStatus::Vencido;
                p.resolved_on = Some(today);
                p.clone()
            })
            .collect()
    }

    /// Signed calendar days until the due date (negative when overdue).
    pub fn days_remaining(&self, plazo: &Plazo, today: NaiveDate) -> i64 {
        BusinessDayCalculator::days_remaining(plazo.opened_on, plazo.due_on, today)
    }

    /// Signed business days until the due date.
    pub fn business_days_remaining(&self, plazo: &Plazo, today: NaiveDate) -> i64 {
        self.calendar.business_days_remaining(plazo.due_on, today)
    }
}

/// The ACTIVO plazo of `kind`, if any.
pub fn active_of_kind(plazos: &[Plazo], kind: PlazoKind) -> Option<&Plazo> {
    plazos.iter().find(|p| p.kind == kind && p.is_active())
}

/// The most recently opened plazo of `kind`, whatever its status.
pub fn latest_of_kind(plazos: &[Plazo], kind: PlazoKind) -> Option<&Plazo> {
    plazos.iter().rev().find(|p| p.kind == kind)
}

fn find_active_mut<'a>(plazos: &'a mut [Plazo], id: &PlazoId) -> Result<&'a mut Plazo, PlazoError> {
    let plazo = plazos
        .iter_mut()
        .find(|p| &p.id == id)
        .ok_or_else(|| PlazoError::NotFound(id.clone()))?;
    if !plazo.is_active() {
        return Err(PlazoError::AlreadyResolved {
            id: plazo.id.clone(),
            status: plazo.status,
        });
    }
    Ok(plazo)
}

// ─── Tests ───────────────────────────────────────────────────────────
