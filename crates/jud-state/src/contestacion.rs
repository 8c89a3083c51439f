//! # Contestación Payloads and Router
//!
//! A defendant answers a demanda in exactly one of four ways. Each way is
//! its own payload type carrying only its own fields; the JSON is
//! internally tagged by `"tipo"`.
//!
//! [`ContestacionRouter::route`] validates a payload and returns the
//! [`Evento`] to feed the state machine. It never touches a proceso.
//! Every validation failure names the offending field or exception type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use jud_core::{ProcesoId, Timestamp};

use crate::estado::{Evento, TipoContestacion};

// ─── Money ───────────────────────────────────────────────────────────

/// Monetary amount with currency.
///
/// The amount is a decimal string so that canonicalization never sees a
/// float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Decimal string, e.g. `"150000"` or `"25000.50"`.
    pub monto: String,
    /// ISO 4217 code, e.g. `"BOB"`.
    pub moneda: String,
}

impl Money {
    pub fn new(monto: impl Into<String>, moneda: impl Into<String>) -> Self {
        Self {
            monto: monto.into(),
            moneda: moneda.into(),
        }
    }

    /// True when `monto` is an unsigned decimal with at least one non-zero digit.
    pub fn is_positive(&self) -> bool {
        is_unsigned_decimal(&self.monto) && self.monto.chars().any(|c| matches!(c, '1'..='9'))
    }

    /// Three ASCII uppercase letters.
    pub fn has_valid_currency(&self) -> bool {
        self.moneda.len() == 3 && self.moneda.chars().all(|c| c.is_ascii_uppercase())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.monto, self.moneda)
    }
}

fn is_unsigned_decimal(s: &str) -> bool {
    let mut has_dot = false;
    let mut has_digit = false;
    for c in s.chars() {
        match c {
            '.' if has_dot => return false,
            '.' => has_dot = true,
            '0'..='9' => has_digit = true,
            _ => return false,
        }
    }
    has_digit
}

// ─── Exception types ─────────────────────────────────────────────────

/// Procedural exceptions a defendant may raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoExcepcion {
    Incompetencia,
    Litispendencia,
    FaltaDePersoneria,
    ObscuridadDemanda,
    CosaJuzgada,
    Prescripcion,
    Transaccion,
    ConciliacionPrevia,
}

impl TipoExcepcion {
    /// Stable identifier (the wire name).
    pub fn id(&self) -> &'static str {
        match self {
            Self::Incompetencia => "INCOMPETENCIA",
            Self::Litispendencia => "LITISPENDENCIA",
            Self::FaltaDePersoneria => "FALTA_DE_PERSONERIA",
            Self::ObscuridadDemanda => "OBSCURIDAD_DEMANDA",
            Self::CosaJuzgada => "COSA_JUZGADA",
            Self::Prescripcion => "PRESCRIPCION",
            Self::Transaccion => "TRANSACCION",
            Self::ConciliacionPrevia => "CONCILIACION_PREVIA",
        }
    }
}

impl std::fmt::Display for TipoExcepcion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// One raised exception with its grounding text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcepcionItem {
    pub tipo: TipoExcepcion,
    #[serde(default)]
    pub fundamento: String,
}

// ─── Payloads ────────────────────────────────────────────────────────

/// Plain contestation: rebuttal of facts and law.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contestar {
    pub refutacion_hechos: String,
    pub refutacion_derecho: String,
    pub ofrecimiento_prueba: Vec<String>,
    /// Opaque document references.
    pub anexos: Vec<String>,
}

/// Procedural exceptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Excepciones {
    pub excepciones: Vec<ExcepcionItem>,
    pub anexos: Vec<String>,
}

/// Counter-claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reconvencion {
    pub objeto: String,
    pub hechos: String,
    pub derecho: String,
    pub petitorio: String,
    pub valor: Option<Money>,
    pub ofrecimiento_prueba: Vec<String>,
    pub anexos: Vec<String>,
}

/// Full acceptance of the claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Allanamiento {
    pub acepta_hechos: bool,
    pub acepta_pretensiones: bool,
    pub acepta_consecuencias: bool,
    pub irrevocable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivo: Option<String>,
}

/// The four response shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tipo", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestacionPayload {
    Contestar(Contestar),
    Excepciones(Excepciones),
    Reconvencion(Reconvencion),
    Allanamiento(Allanamiento),
}

impl ContestacionPayload {
    pub fn tipo(&self) -> TipoContestacion {
        match self {
            Self::Contestar(_) => TipoContestacion::Contestar,
            Self::Excepciones(_) => TipoContestacion::Excepciones,
            Self::Reconvencion(_) => TipoContestacion::Reconvencion,
            Self::Allanamiento(_) => TipoContestacion::Allanamiento,
        }
    }
}

/// A validated contestación as stored on the proceso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contestacion {
    pub proceso_id: ProcesoId,
    pub submitted_at: Timestamp,
    pub payload: ContestacionPayload,
}

impl Contestacion {
    pub fn tipo(&self) -> TipoContestacion {
        self.payload.tipo()
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Payload validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContestacionError {
    /// A required text field is empty.
    #[error("required field `{field}` is empty")]
    MissingField { field: &'static str },

    /// EXCEPCIONES with no exception selected.
    #[error("at least one exception must be raised")]
    EmptyExceptionSet,

    /// The same exception type raised twice.
    #[error("exception {0} raised more than once")]
    DuplicateException(TipoExcepcion),

    /// Exceptions raised without grounding text.
    #[error("missing grounding for exception(s): {}", join(.excepciones))]
    MissingGrounding { excepciones: Vec<TipoExcepcion> },

    /// A field holds a value outside its domain.
    #[error("invalid value for `{field}`: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    /// ALLANAMIENTO with one or more acceptances withheld.
    #[error("allanamiento requires every acceptance; missing: {}", .missing.join(", "))]
    IncompleteAcceptance { missing: Vec<&'static str> },
}

fn join(items: &[TipoExcepcion]) -> String {
    items.iter().map(TipoExcepcion::id).collect::<Vec<_>>().join(", ")
}

// ─── Router ──────────────────────────────────────────────────────────

/// A validated contestación plus the event it triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedContestacion {
    pub contestacion: Contestacion,
    pub evento: Evento,
}

/// Validates contestación payloads by kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContestacionRouter;

impl ContestacionRouter {
    /// Validate `payload` and return the contestación with its event.
    pub fn route(
        &self,
        proceso_id: &ProcesoId,
        payload: ContestacionPayload,
        submitted_at: Timestamp,
    ) -> Result<RoutedContestacion, ContestacionError> {
        self.validate(&payload)?;
        let evento = Evento::Contestar {
            tipo: payload.tipo(),
        };
        Ok(RoutedContestacion {
            contestacion: Contestacion {
                proceso_id: proceso_id.clone(),
                submitted_at,
                payload,
            },
            evento,
        })
    }

    /// Shape validation for each payload kind.
    pub fn validate(&self, payload: &ContestacionPayload) -> Result<(), ContestacionError> {
        match payload {
            ContestacionPayload::Contestar(c) => {
                require_text("refutacion_hechos", &c.refutacion_hechos)?;
                require_text("refutacion_derecho", &c.refutacion_derecho)
            }
            ContestacionPayload::Excepciones(e) => validate_excepciones(e),
            ContestacionPayload::Reconvencion(r) => validate_reconvencion(r),
            ContestacionPayload::Allanamiento(a) => validate_allanamiento(a),
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ContestacionError> {
    if value.trim().is_empty() {
        return Err(ContestacionError::MissingField { field });
    }
    Ok(())
}

fn validate_excepciones(e: &Excepciones) -> Result<(), ContestacionError> {
    if e.excepciones.is_empty() {
        return Err(ContestacionError::EmptyExceptionSet);
    }
    let mut seen = std::collections::BTreeSet::new();
    for item in &e.excepciones {
        if !seen.insert(item.tipo) {
            return Err(ContestacionError::DuplicateException(item.tipo));
        }
    }
    let ungrounded: Vec<TipoExcepcion> = e
        .excepciones
        .iter()
        .filter(|item| item.fundamento.trim().is_empty())
        .map(|item| item.tipo)
        .collect();
    if !ungrounded.is_empty() {
        return Err(ContestacionError::MissingGrounding {
            excepciones: ungrounded,
        });
    }
    Ok(())
}

fn validate_reconvencion(r: &Reconvencion) -> Result<(), ContestacionError> {
    require_text("objeto", &r.objeto)?;
    require_text("hechos", &r.hechos)?;
    require_text("derecho", &r.derecho)?;
    require_text("petitorio", &r.petitorio)?;
    // An absent amount fails the same monetary rule as a non-positive one.
    let valor = r.valor.as_ref().ok_or(ContestacionError::InvalidValue {
        field: "valor",
        value: String::new(),
    })?;
    if !valor.is_positive() {
        return Err(ContestacionError::InvalidValue {
            field: "valor.monto",
            value: valor.monto.clone(),
        });
    }
    if !valor.has_valid_currency() {
        return Err(ContestacionError::InvalidValue {
            field: "valor.moneda",
            value: valor.moneda.clone(),
        });
    }
    Ok(())
}

fn validate_allanamiento(a: &Allanamiento) -> Result<(), ContestacionError> {
    let missing: Vec<&'static str> = [
        ("acepta_hechos", a.acepta_hechos),
        ("acepta_pretensiones", a.acepta_pretensiones),
        ("acepta_consecuencias", a.acepta_consecuencias),
        ("irrevocable", a.irrevocable),
    ]
    .into_iter()
    .filter(|(_, accepted)| !accepted)
    .map(|(field, _)| field)
    .collect();
    if !missing.is_empty() {
        return Err(ContestacionError::IncompleteAcceptance { missing });
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn route(payload: ContestacionPayload) -> Result<RoutedContestacion, ContestacionError> {
        ContestacionRouter.route(&ProcesoId::new(), payload, Timestamp::now())
    }

    fn reconvencion(monto: &str) -> ContestacionPayload {
        ContestacionPayload::Reconvencion(Reconvencion {
            objeto: "Pago de daños".into(),
            hechos: "El actor incumplió el contrato".into(),
            derecho: "Art. 984 Código Civil".into(),
            petitorio: "Se condene al actor".into(),
            valor: Some(Money::new(monto, "BOB")),
            ofrecimiento_prueba: vec!["Contrato original".into()],
            anexos: vec![],
        })
    }

    fn allanamiento(all: bool) -> ContestacionPayload {
        ContestacionPayload::Allanamiento(Allanamiento {
            acepta_hechos: true,
            acepta_pretensiones: all,
            acepta_consecuencias: true,
            irrevocable: all,
            motivo: None,
        })
    }

    #[test]
    fn test_contestar_routes_to_contestar_event() {
        let routed = route(ContestacionPayload::Contestar(Contestar {
            refutacion_hechos: "Niego los hechos".into(),
            refutacion_derecho: "No aplica el art. 568".into(),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(
            routed.evento,
            Evento::Contestar {
                tipo: TipoContestacion::Contestar
            }
        );
        assert_eq!(routed.contestacion.tipo(), TipoContestacion::Contestar);
    }

    #[test]
    fn test_contestar_requires_both_rebuttals() {
        let err = route(ContestacionPayload::Contestar(Contestar {
            refutacion_hechos: "Niego".into(),
            refutacion_derecho: "   ".into(),
            ..Default::default()
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ContestacionError::MissingField {
                field: "refutacion_derecho"
            }
        );
    }

    #[test]
    fn test_excepciones_missing_grounding_names_each() {
        let err = route(ContestacionPayload::Excepciones(Excepciones {
            excepciones: vec![
                ExcepcionItem {
                    tipo: TipoExcepcion::Incompetencia,
                    fundamento: "Juzgado civil no competente".into(),
                },
                ExcepcionItem {
                    tipo: TipoExcepcion::Prescripcion,
                    fundamento: String::new(),
                },
            ],
            anexos: vec![],
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ContestacionError::MissingGrounding {
                excepciones: vec![TipoExcepcion::Prescripcion]
            }
        );
        assert!(err.to_string().contains("PRESCRIPCION"));
    }

    #[test]
    fn test_excepciones_empty_and_duplicate() {
        assert_eq!(
            route(ContestacionPayload::Excepciones(Excepciones::default())).unwrap_err(),
            ContestacionError::EmptyExceptionSet
        );
        let item = ExcepcionItem {
            tipo: TipoExcepcion::CosaJuzgada,
            fundamento: "Sentencia previa".into(),
        };
        let err = route(ContestacionPayload::Excepciones(Excepciones {
            excepciones: vec![item.clone(), item],
            anexos: vec![],
        }))
        .unwrap_err();
        assert_eq!(err, ContestacionError::DuplicateException(TipoExcepcion::CosaJuzgada));
    }

    #[test]
    fn test_reconvencion_value_must_be_positive() {
        assert!(route(reconvencion("15000.50")).is_ok());
        for bad in ["0", "0.00", "-10", "", "1.2.3", "1e5", "abc"] {
            let err = route(reconvencion(bad)).unwrap_err();
            assert!(
                matches!(err, ContestacionError::InvalidValue { field: "valor.monto", .. }),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn test_reconvencion_requires_value_and_currency() {
        let ContestacionPayload::Reconvencion(mut r) = reconvencion("100") else {
            unreachable!()
        };
        r.valor.as_mut().unwrap().moneda = "bs".into();
        let err = route(ContestacionPayload::Reconvencion(r.clone())).unwrap_err();
        assert!(matches!(err, ContestacionError::InvalidValue { field: "valor.moneda", .. }));

        r.valor = None;
        let err = route(ContestacionPayload::Reconvencion(r)).unwrap_err();
        assert_eq!(
            err,
            ContestacionError::InvalidValue {
                field: "valor",
                value: String::new()
            }
        );
    }

    #[test]
    fn test_allanamiento_lists_withheld_acceptances() {
        assert!(route(allanamiento(true)).is_ok());
        let err = route(allanamiento(false)).unwrap_err();
        assert_eq!(
            err,
            ContestacionError::IncompleteAcceptance {
                missing: vec!["acepta_pretensiones", "irrevocable"]
            }
        );
    }

    #[test]
    fn test_payload_json_is_tagged_by_tipo() {
        let json = serde_json::json!({
            "tipo": "ALLANAMIENTO",
            "acepta_hechos": true,
            "acepta_pretensiones": true,
            "acepta_consecuencias": true,
            "irrevocable": true
        });
        let payload: ContestacionPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.tipo(), TipoContestacion::Allanamiento);

        let back = serde_json::to_value(&payload).unwrap();
        assert_eq!(back["tipo"], "ALLANAMIENTO");
    }

    #[test]
    fn test_missing_booleans_default_to_false() {
        let payload: ContestacionPayload =
            serde_json::from_value(serde_json::json!({"tipo": "ALLANAMIENTO", "acepta_hechos": true}))
                .unwrap();
        let err = route(payload).unwrap_err();
        assert!(matches!(err, ContestacionError::IncompleteAcceptance { ref missing } if missing.len() == 3));
    }
}
