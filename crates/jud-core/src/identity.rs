//! # Identifier Newtypes
//!
//! Distinct types for each identifier namespace. Internal ids are UUIDs;
//! the NUREJ is the human-readable case number printed on every filing and
//! is treated as an opaque, immutable string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JudError;

/// Internal identifier of a proceso (case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcesoId(pub Uuid);

/// Identifier of a single plazo (deadline) record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlazoId(pub Uuid);

/// Identifier of a sentencia (ruling).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentenciaId(pub Uuid);

macro_rules! uuid_id {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(ProcesoId, "proceso");
uuid_id!(PlazoId, "plazo");
uuid_id!(SentenciaId, "sentencia");

/// Número Único de Registro Judicial.
///
/// Unique across the repository and never reassigned. The engine does not
/// interpret its structure beyond rejecting empty or whitespace-bearing values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nurej(String);

impl Nurej {
    /// Validate and wrap a NUREJ string.
    pub fn new(value: impl Into<String>) -> Result<Self, JudError> {
        let value = value.into();
        if value.is_empty() {
            return Err(JudError::Validation("NUREJ must not be empty".to_string()));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(JudError::Validation(format!(
                "NUREJ must not contain whitespace: {value:?}"
            )));
        }
        Ok(Self(value))
    }

    /// The NUREJ as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Nurej {
    type Error = JudError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Nurej> for String {
    fn from(value: Nurej) -> Self {
        value.0
    }
}

impl std::fmt::Display for Nurej {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
