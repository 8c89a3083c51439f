//! # Error Types
//!
//! Errors shared by every crate in the workspace. Domain-specific failures
//! (illegal transitions, plazo misuse, payload validation) live next to the
//! domain types in `jud-state`; this module only covers the primitives
//! defined here.

use thiserror::Error;

/// Top-level error type for the foundational primitives.
#[derive(Error, Debug)]
pub enum JudError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Content integrity violation (digest mismatch, malformed digest).
    #[error("integrity error: {0}")]
    Integrity(String),

    /// A primitive value failed validation (empty NUREJ, non-UTC timestamp).
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer for amount: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
