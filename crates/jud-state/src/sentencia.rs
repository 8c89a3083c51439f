//! # Sentencia Issuance
//!
//! A sentencia is issued once per proceso. The issuer checks the draft,
//! fingerprints the four-part body, moves the proceso to SENTENCIADO (which
//! opens the APELACION plazo) and marks the sentencia NOTIFICADA. A
//! NOTIFICADA sentencia is never modified.
//!
//! ## Content hash
//!
//! Each section has `\r\n` normalized to `\n` and surrounding whitespace
//! trimmed; the four sections are serialized as a JCS object and hashed
//! with SHA-256. This is an integrity fingerprint, not a signature.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use jud_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, ProcesoId, SentenciaId, Timestamp};

use crate::estado::Evento;
use crate::proceso::{Proceso, ProcesoError, ProcesoStateMachine, TransitionOutcome};

/// The four sections of a ruling, treated as opaque text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuerpoSentencia {
    pub encabezamiento: String,
    pub narrativa: String,
    pub motiva: String,
    pub resolutiva: String,
}

impl CuerpoSentencia {
    /// Line endings unified and surrounding whitespace trimmed.
    pub fn normalized(&self) -> Self {
        let norm = |s: &str| s.replace("\r\n", "\n").trim().to_string();
        Self {
            encabezamiento: norm(&self.encabezamiento),
            narrativa: norm(&self.narrativa),
            motiva: norm(&self.motiva),
            resolutiva: norm(&self.resolutiva),
        }
    }

    /// Names of sections that are blank after normalization.
    pub fn empty_sections(&self) -> Vec<&'static str> {
        [
            ("encabezamiento", &self.encabezamiento),
            ("narrativa", &self.narrativa),
            ("motiva", &self.motiva),
            ("resolutiva", &self.resolutiva),
        ]
        .into_iter()
        .filter(|(_, text)| text.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// SHA-256 over the canonical form of the normalized body.
    pub fn content_digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        let canonical = CanonicalBytes::new(&self.normalized())?;
        Ok(sha256_digest(&canonical))
    }
}

/// Outcome for one party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultadoParte {
    Favorable,
    Desfavorable,
    Parcial,
}

impl ResultadoParte {
    /// Parse a wire tag. Anything but the three tags yields `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "FAVORABLE" => Some(Self::Favorable),
            "DESFAVORABLE" => Some(Self::Desfavorable),
            "PARCIAL" => Some(Self::Parcial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Favorable => "FAVORABLE",
            Self::Desfavorable => "DESFAVORABLE",
            Self::Parcial => "PARCIAL",
        }
    }
}

impl std::fmt::Display for ResultadoParte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoSentencia {
    Borrador,
    Notificada,
}

/// An issued ruling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentencia {
    pub id: SentenciaId,
    pub proceso_id: ProcesoId,
    pub cuerpo: CuerpoSentencia,
    pub resultado_actor: ResultadoParte,
    pub resultado_demandado: ResultadoParte,
    pub content_hash: ContentDigest,
    pub emitida_en: Timestamp,
    pub estado: EstadoSentencia,
}

/// What the judge submits. Outcomes arrive as raw tags so that an unknown
/// tag is reported as a missing outcome rather than a decoding error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorradorSentencia {
    #[serde(default)]
    pub cuerpo: CuerpoSentencia,
    #[serde(default)]
    pub resultado_actor: Option<String>,
    #[serde(default)]
    pub resultado_demandado: Option<String>,
}

/// The notified sentencia and the transition that issuing it applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSentencia {
    pub sentencia: Sentencia,
    pub transition: TransitionOutcome,
}

/// Sentencing misuse.
#[derive(Error, Debug)]
pub enum SentenciaError {
    /// One or more body sections are blank.
    #[error("sentencia draft is incomplete; empty sections: {}", .sections.join(", "))]
    IncompleteDraft { sections: Vec<&'static str> },

    /// A party outcome is absent or not FAVORABLE/DESFAVORABLE/PARCIAL.
    #[error("missing or unknown outcome for {parte}: {value:?}")]
    MissingOutcome {
        parte: &'static str,
        value: Option<String>,
    },

    /// Outcomes contradict the procedural path.
    #[error("inconsistent outcome: {0}")]
    InconsistentOutcome(String),

    /// A sentencia was already notified for this proceso.
    #[error("sentencia {sentencia_id} has already been issued")]
    AlreadyIssued { sentencia_id: SentenciaId },

    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}

/// Finalizes rulings through a [`ProcesoStateMachine`].
#[derive(Debug, Clone, Copy)]
pub struct SentenciaIssuer<'a> {
    machine: &'a ProcesoStateMachine,
}

impl<'a> SentenciaIssuer<'a> {
    pub fn new(machine: &'a ProcesoStateMachine) -> Self {
        Self { machine }
    }

    /// Issue and notify the sentencia for `proceso`.
    ///
    /// Checks, in order: not already issued, proceso in SENTENCIA_PENDIENTE,
    /// all four sections present, both outcomes valid, outcomes consistent
    /// with an allanamiento. On any failure `proceso` is unchanged.
    pub fn issue(
        &self,
        proceso: &mut Proceso,
        borrador: BorradorSentencia,
        at: Timestamp,
    ) -> Result<IssuedSentencia, ProcesoError> {
        if let Some(existing) = &proceso.sentencia {
            if existing.estado == EstadoSentencia::Notificada {
                return Err(SentenciaError::AlreadyIssued {
                    sentencia_id: existing.id.clone(),
                }
                .into());
            }
        }
        let rule = self.machine.rule_for(proceso, &Evento::EmitirSentencia)?;

        let empty = borrador.cuerpo.empty_sections();
        if !empty.is_empty() {
            return Err(SentenciaError::IncompleteDraft { sections: empty }.into());
        }
        let resultado_actor = outcome("actor", borrador.resultado_actor)?;
        let resultado_demandado = outcome("demandado", borrador.resultado_demandado)?;
        if proceso.allanado() && resultado_actor != ResultadoParte::Favorable {
            return Err(SentenciaError::InconsistentOutcome(format!(
                "the defendant accepted the claim; actor outcome must be FAVORABLE, got {resultado_actor}"
            ))
            .into());
        }

        let cuerpo = borrador.cuerpo.normalized();
        let content_hash = cuerpo.content_digest().map_err(SentenciaError::from)?;
        let mut sentencia = Sentencia {
            id: SentenciaId::new(),
            proceso_id: proceso.id.clone(),
            cuerpo,
            resultado_actor,
            resultado_demandado,
            content_hash,
            emitida_en: at,
            estado: EstadoSentencia::Borrador,
        };

        let (mut next, transition) =
            self.machine
                .apply(proceso, Evento::EmitirSentencia, rule, at)?;
        sentencia.estado = EstadoSentencia::Notificada;
        next.sentencia = Some(sentencia.clone());
        *proceso = next;
        Ok(IssuedSentencia {
            sentencia,
            transition,
        })
    }

    /// Recompute the content hash and compare with the stored one.
    pub fn verify_integrity(sentencia: &Sentencia) -> bool {
        sentencia
            .cuerpo
            .content_digest()
            .is_ok_and(|digest| digest == sentencia.content_hash)
    }
}

fn outcome(parte: &'static str, tag: Option<String>) -> Result<ResultadoParte, SentenciaError> {
    tag.as_deref()
        .and_then(ResultadoParte::parse)
        .ok_or(SentenciaError::MissingOutcome { parte, value: tag })
}

// ─── Tests ───────────────────────────────────────────────────────────
