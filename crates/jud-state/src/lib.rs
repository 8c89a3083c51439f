//! # jud-state — Judicial Process Lifecycle
//!
//! The procedural core: which states a proceso can be in, which events move
//! it, which plazos each move opens and closes, and what must hold before a
//! move is allowed. No I/O, no locking, no clock reads; callers pass the
//! instant at which each act happens.
//!
//! ## Components
//!
//! - **Estado** (`estado.rs`): `EstadoProceso`, `Evento`, and the pure
//!   transition table.
//!
//! - **Plazo** (`plazo.rs`): deadline records and the `PlazoEngine` that
//!   opens, fulfils and expires them.
//!
//! - **Contestación** (`contestacion.rs`): the four response payloads and
//!   the `ContestacionRouter` that validates them.
//!
//! - **Sentencia** (`sentencia.rs`): ruling body, content hash and the
//!   `SentenciaIssuer`.
//!
//! - **Proceso** (`proceso.rs`): the aggregate and the
//!   `ProcesoStateMachine` that ties the above together.
//!
//! - **Config** (`config.rs`): statutory plazo lengths.

pub mod config;
pub mod contestacion;
pub mod estado;
pub mod plazo;
pub mod proceso;
pub mod sentencia;

pub use config::{PlazoConfig, PlazoConfigError, PlazoTerm};
pub use contestacion::{
    Allanamiento, Contestacion, ContestacionError, ContestacionPayload, ContestacionRouter,
    Contestar, ExcepcionItem, Excepciones, Money, Reconvencion, RoutedContestacion,
    TipoExcepcion,
};
pub use estado::{
    transition_rule, EstadoProceso, Evento, PlazoClose, PlazoOpen, Requirement, TipoContestacion,
    TransitionRule,
};
pub use plazo::{Plazo, PlazoEngine, PlazoError, PlazoKind, PlazoStatus};
pub use proceso::{
    validate_partes, Demanda, Parte, Proceso, ProcesoError, ProcesoStateMachine, RolParte,
    TransitionOutcome, TransitionRecord,
};
pub use sentencia::{
    BorradorSentencia, CuerpoSentencia, EstadoSentencia, IssuedSentencia, ResultadoParte,
    Sentencia, SentenciaError, SentenciaIssuer,
};
