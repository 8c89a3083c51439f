//! # jud-engine — Process Engine Service Layer
//!
//! Wraps the pure state machine from `jud-state` with everything needed to
//! serve concurrent callers: persistence, per-proceso locking, notification
//! and configuration.
//!
//! ## Components
//!
//! - **Engine** (`engine.rs`): `ProcesoEngine`, the API consumed by the HTTP
//!   server and the CLI.
//! - **Repository** (`repository.rs`): the `ProcesoRepository` trait with
//!   in-memory and JSON-file implementations.
//! - **Lock** (`lock.rs`): per-proceso mutexes with bounded waits. File
//!   stores add cross-process lock files on top.
//! - **Notify** (`notify.rs`): domain events and sinks.
//! - **Config** (`config.rs`): YAML + environment configuration.
//! - **Error** (`error.rs`): `EngineError` with stable codes.

pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod notify;
pub mod repository;

pub use config::{ConfigError, EngineConfig, CONFIG_ENV, LOCK_TIMEOUT_ENV};
pub use engine::{DiasRestantes, NuevoProceso, ProcesoEngine, Solicitud, SweepFailure, SweepReport};
pub use error::{EngineError, ErrorKind};
pub use lock::ProcesoLocks;
pub use notify::{DomainEvent, NotificationSink, RecordingSink, TracingSink};
pub use repository::{
    InMemoryRepository, JsonFileRepository, LockScope, ProcesoRepository, RepositoryError,
    Store, StoreLock,
};
