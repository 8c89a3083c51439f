//! # Statutory Plazo Lengths
//!
//! Every business-day count the state machine uses comes from
//! [`PlazoConfig`]. Nothing else in the workspace hard-codes a plazo length.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plazo::PlazoKind;

/// Which configured length a newly opened plazo uses.
///
/// Mostly one per [`PlazoKind`]; the SENTENCIA plazo has two lengths
/// depending on whether the proceso went through a hearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlazoTerm {
    Citacion,
    Subsanacion,
    Contestacion,
    ExcepcionesRespuesta,
    ReconvencionRespuesta,
    Prueba,
    SentenciaOrdinaria,
    SentenciaAllanamiento,
    Apelacion,
}

impl PlazoTerm {
    /// The plazo kind this term applies to.
    pub fn kind(&self) -> PlazoKind {
        match self {
            Self::Citacion => PlazoKind::Citacion,
            Self::Subsanacion => PlazoKind::Subsanacion,
            Self::Contestacion => PlazoKind::Contestacion,
            Self::ExcepcionesRespuesta => PlazoKind::ExcepcionesRespuesta,
            Self::ReconvencionRespuesta => PlazoKind::ReconvencionRespuesta,
            Self::Prueba => PlazoKind::Prueba,
            Self::SentenciaOrdinaria | Self::SentenciaAllanamiento => PlazoKind::Sentencia,
            Self::Apelacion => PlazoKind::Apelacion,
        }
    }
}

/// Configuration validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlazoConfigError {
    /// A plazo length of zero business days.
    #[error("plazo length `{field}` must be at least one business day")]
    ZeroDays {
        /// The offending configuration key.
        field: &'static str,
    },
}

/// Business-day length of every statutory plazo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlazoConfig {
    pub citacion: u32,
    pub subsanacion: u32,
    pub contestacion: u32,
    pub excepciones_respuesta: u32,
    pub reconvencion_respuesta: u32,
    pub prueba: u32,
    pub sentencia_ordinaria: u32,
    pub sentencia_allanamiento: u32,
    pub apelacion: u32,
}

impl Default for PlazoConfig {
    fn default() -> Self {
        Self {
            citacion: 10,
            subsanacion: 3,
            contestacion: 30,
            excepciones_respuesta: 15,
            reconvencion_respuesta: 30,
            prueba: 20,
            sentencia_ordinaria: 20,
            sentencia_allanamiento: 15,
            apelacion: 15,
        }
    }
}

impl PlazoConfig {
    /// Business days for the given term.
    pub fn business_days(&self, term: PlazoTerm) -> u32 {
        match term {
            PlazoTerm::Citacion => self.citacion,
            PlazoTerm::Subsanacion => self.subsanacion,
            PlazoTerm::Contestacion => self.contestacion,
            PlazoTerm::ExcepcionesRespuesta => self.excepciones_respuesta,
            PlazoTerm::ReconvencionRespuesta => self.reconvencion_respuesta,
            PlazoTerm::Prueba => self.prueba,
            PlazoTerm::SentenciaOrdinaria => self.sentencia_ordinaria,
            PlazoTerm::SentenciaAllanamiento => self.sentencia_allanamiento,
            PlazoTerm::Apelacion => self.apelacion,
        }
    }

    /// Reject zero-length plazos.
    pub fn validate(&self) -> Result<(), PlazoConfigError> {
        let fields = [
            ("citacion", self.citacion),
            ("subsanacion", self.subsanacion),
            ("contestacion", self.contestacion),
            ("excepciones_respuesta", self.excepciones_respuesta),
            ("reconvencion_respuesta", self.reconvencion_respuesta),
            ("prueba", self.prueba),
            ("sentencia_ordinaria", self.sentencia_ordinaria),
            ("sentencia_allanamiento", self.sentencia_allanamiento),
            ("apelacion", self.apelacion),
        ];
        match fields.iter().find(|(_, days)| *days == 0) {
            Some((field, _)) => Err(PlazoConfigError::ZeroDays { field }),
            None => Ok(()),
        }
    }
}
