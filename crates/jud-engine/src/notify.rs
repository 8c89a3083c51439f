//! # Notifications
//!
//! The engine tells a [`NotificationSink`] about committed changes. Delivery
//! (e-mail, casilla electrónica) is someone else's job; sinks must not fail
//! the operation that produced the event.

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Serialize;

use jud_core::{Nurej, PlazoId, ProcesoId, SentenciaId};
use jud_state::{EstadoProceso, Evento, Plazo, PlazoKind};

/// A committed domain change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tipo", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    ProcesoCreado {
        proceso_id: ProcesoId,
        nurej: Nurej,
    },
    TransicionAplicada {
        proceso_id: ProcesoId,
        from: EstadoProceso,
        to: EstadoProceso,
        evento: Evento,
    },
    PlazoAbierto {
        proceso_id: ProcesoId,
        plazo_id: PlazoId,
        kind: PlazoKind,
        due_on: NaiveDate,
    },
    PlazoVencido {
        proceso_id: ProcesoId,
        plazo_id: PlazoId,
        kind: PlazoKind,
        due_on: NaiveDate,
    },
    SentenciaEmitida {
        proceso_id: ProcesoId,
        sentencia_id: SentenciaId,
        content_hash: String,
    },
}

impl DomainEvent {
    pub fn plazo_abierto(plazo: &Plazo) -> Self {
        Self::PlazoAbierto {
            proceso_id: plazo.proceso_id.clone(),
            plazo_id: plazo.id.clone(),
            kind: plazo.kind,
            due_on: plazo.due_on,
        }
    }

    pub fn plazo_vencido(plazo: &Plazo) -> Self {
        Self::PlazoVencido {
            proceso_id: plazo.proceso_id.clone(),
            plazo_id: plazo.id.clone(),
            kind: plazo.kind,
            due_on: plazo.due_on,
        }
    }
}

/// Fire-and-forget receiver of domain events.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &DomainEvent);
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &DomainEvent) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::info!(target: "jud::notify", event = %json, "domain event"),
            Err(e) => tracing::warn!(target: "jud::notify", error = %e, "unserializable domain event"),
        }
    }
}

/// Keeps every event in memory, for tests and the CLI.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &DomainEvent) {
        self.events.lock().push(event.clone());
    }
}
