//! # Per-Proceso Locks
//!
//! One `parking_lot::Mutex<()>` per proceso id, created on first use and
//! dropped from the table once no caller holds or waits on it. Acquisition
//! waits at most the configured timeout and then fails with
//! [`EngineError::Busy`]; it never blocks indefinitely.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use jud_core::ProcesoId;

use crate::error::EngineError;

#[derive(Debug, Default)]
pub struct ProcesoLocks {
    locks: Mutex<HashMap<ProcesoId, Arc<Mutex<()>>>>,
}

impl ProcesoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: &ProcesoId) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock();
        Arc::clone(map.entry(id.clone()).or_default())
    }

    /// Drop the entry for `id` when `lock` is the last handle outside the
    /// table. Handles are only cloned under the table lock, so the count
    /// cannot grow while it is held.
    fn release(&self, id: &ProcesoId, lock: Arc<Mutex<()>>) {
        let mut map = self.locks.lock();
        let unused = Arc::strong_count(&lock) == 2;
        drop(lock);
        if unused {
            map.remove(id);
        }
    }

    /// Run `f` while holding the lock for `id`.
    pub fn with_lock<R>(
        &self,
        id: &ProcesoId,
        timeout: Duration,
        f: impl FnOnce() -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let lock = self.lock_for(id);
        let result = match lock.try_lock_for(timeout) {
            Some(_guard) => f(),
            None => {
                tracing::warn!(
                    proceso_id = %id,
                    waited_ms = timeout.as_millis() as u64,
                    "proceso lock contention"
                );
                Err(EngineError::Busy {
                    proceso_id: id.clone(),
                    waited_ms: timeout.as_millis() as u64,
                })
            }
        };
        self.release(id, lock);
        result
    }

    /// Whether the lock for `id` is currently held.
    pub fn is_locked(&self, id: &ProcesoId) -> bool {
        self.locks
            .lock()
            .get(id)
            .is_some_and(|lock| lock.is_locked())
    }

    /// Number of ids with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}
