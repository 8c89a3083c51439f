//! # jud-core — Foundational Types for the Judicial Process Engine
//!
//! The leaf crate of the workspace. Every other `jud-*` crate depends on it;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ProcesoId`, `PlazoId`,
//!    `SentenciaId` and the human-readable `Nurej` are distinct types. A
//!    plazo id cannot be passed where a proceso id is expected.
//!
//! 2. **`CanonicalBytes` newtype.** All digest computation flows through
//!    `CanonicalBytes::new()` (RFC 8785 JCS with float rejection).
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! 4. **One calendar.** Due dates are computed exclusively by
//!    [`BusinessDayCalculator`]; no other code performs date arithmetic on
//!    procedural deadlines.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jud-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod calendar;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use calendar::{BusinessDayCalculator, CalendarError, FixedHolidays, HolidayCalendar, NoHolidays};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, JudError};
pub use identity::{Nurej, PlazoId, ProcesoId, SentenciaId};
pub use temporal::Timestamp;
