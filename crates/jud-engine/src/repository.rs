//! # Proceso Repositories
//!
//! The engine persists whole aggregates through [`ProcesoRepository`]. Two
//! implementations ship with the crate:
//!
//! - [`InMemoryRepository`]: `parking_lot::RwLock<HashMap>`, for the API
//!   server and tests.
//! - [`JsonFileRepository`]: one pretty-printed JSON file per proceso,
//!   written to a temporary file and renamed into place.
//!
//! The engine serializes writers per proceso inside one process. Stores that
//! several processes can open at once also hand out [`StoreLock`]s through
//! [`ProcesoRepository::lock_exclusive`]; the file repository backs them with
//! `fs2` advisory locks under `<dir>/.locks/`.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs2::FileExt;
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use jud_core::{Nurej, PlazoId, ProcesoId};
use jud_state::{Plazo, Proceso};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot (de)serialize {path}: {source}")]
    Serde {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Another process held the lock file for the whole bounded wait.
    #[error("lock {path} still held after {waited_ms} ms")]
    LockTimeout { path: PathBuf, waited_ms: u64 },
}

/// What a cross-process lock protects.
#[derive(Debug, Clone, Copy)]
pub enum LockScope<'a> {
    /// Writes to one proceso.
    Proceso(&'a ProcesoId),
    /// NUREJ allocation across the whole store.
    Registry,
}

/// Exclusive advisory lock on a file; released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

const LOCK_POLL: Duration = Duration::from_millis(5);

impl StoreLock {
    /// Poll `try_lock_exclusive` until it succeeds or `timeout` elapses.
    pub fn acquire(path: PathBuf, timeout: Duration) -> Result<Self, RepositoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RepositoryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| RepositoryError::Io {
                path: path.clone(),
                source,
            })?;

        let started = Instant::now();
        let contended = fs2::lock_contended_error().raw_os_error();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(Self { file, path }),
                Err(e) if e.raw_os_error() == contended => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(RepositoryError::LockTimeout {
                            path,
                            waited_ms: timeout.as_millis() as u64,
                        });
                    }
                    std::thread::sleep(LOCK_POLL.min(timeout - waited));
                }
                Err(source) => return Err(RepositoryError::Io { path, source }),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

/// Load/save access to proceso aggregates.
pub trait ProcesoRepository: Send + Sync {
    fn load(&self, id: &ProcesoId) -> Result<Option<Proceso>, RepositoryError>;

    /// Insert or replace.
    fn save(&self, proceso: &Proceso) -> Result<(), RepositoryError>;

    fn list_ids(&self) -> Result<Vec<ProcesoId>, RepositoryError>;

    /// Keep writers in other processes out of `scope` until the returned
    /// guard drops. Stores private to one process return `None`.
    fn lock_exclusive(
        &self,
        _scope: LockScope<'_>,
        _timeout: Duration,
    ) -> Result<Option<StoreLock>, RepositoryError> {
        Ok(None)
    }

    fn find_by_nurej(&self, nurej: &Nurej) -> Result<Option<Proceso>, RepositoryError> {
        for id in self.list_ids()? {
            if let Some(p) = self.load(&id)? {
                if &p.nurej == nurej {
                    return Ok(Some(p));
                }
            }
        }
        Ok(None)
    }

    /// Locate a plazo and the proceso that owns it.
    fn find_plazo(&self, id: &PlazoId) -> Result<Option<(ProcesoId, Plazo)>, RepositoryError> {
        for pid in self.list_ids()? {
            if let Some(p) = self.load(&pid)? {
                if let Some(plazo) = p.plazo(id) {
                    return Ok(Some((pid, plazo.clone())));
                }
            }
        }
        Ok(None)
    }
}

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is `parking_lot` and never held across calls, so a panicking
/// writer cannot poison it.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Clone, T: Clone> Store<K, T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: K, value: T) -> Option<T> {
        self.data.write().insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<T> {
        self.data.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<K> {
        self.data.read().keys().cloned().collect()
    }

    /// First value matching `pred`, cloned out under a single read lock.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Apply `f` to every value under a single read lock, returning the
    /// first `Some`.
    pub fn find_map<R>(&self, f: impl Fn(&T) -> Option<R>) -> Option<R> {
        self.data.read().values().find_map(f)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- In-memory repository ------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    procesos: Store<ProcesoId, Proceso>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.procesos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procesos.is_empty()
    }
}

impl ProcesoRepository for InMemoryRepository {
    fn load(&self, id: &ProcesoId) -> Result<Option<Proceso>, RepositoryError> {
        Ok(self.procesos.get(id))
    }

    fn save(&self, proceso: &Proceso) -> Result<(), RepositoryError> {
        self.procesos.insert(proceso.id.clone(), proceso.clone());
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<ProcesoId>, RepositoryError> {
        let mut ids = self.procesos.keys();
        ids.sort();
        Ok(ids)
    }

    fn find_by_nurej(&self, nurej: &Nurej) -> Result<Option<Proceso>, RepositoryError> {
        Ok(self.procesos.find(|p| &p.nurej == nurej))
    }

    fn find_plazo(&self, id: &PlazoId) -> Result<Option<(ProcesoId, Plazo)>, RepositoryError> {
        Ok(self
            .procesos
            .find_map(|p| p.plazo(id).map(|plazo| (p.id.clone(), plazo.clone()))))
    }
}

// -- JSON file repository ------------------------------------------------------

/// One `<uuid>.json` file per proceso under a directory, with lock files
/// in a `.locks/` subdirectory.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    /// Open (creating if needed) a repository rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| RepositoryError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ProcesoId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_uuid()))
    }

    fn lock_dir(&self) -> PathBuf {
        self.dir.join(".locks")
    }
}

impl ProcesoRepository for JsonFileRepository {
    fn load(&self, id: &ProcesoId) -> Result<Option<Proceso>, RepositoryError> {
        let path = self.path_for(id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(RepositoryError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| RepositoryError::Serde { path, source })
    }

    fn save(&self, proceso: &Proceso) -> Result<(), RepositoryError> {
        let path = self.path_for(&proceso.id);
        let json = serde_json::to_vec_pretty(proceso).map_err(|source| RepositoryError::Serde {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| RepositoryError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| RepositoryError::Io { path, source })
    }

    fn list_ids(&self) -> Result<Vec<ProcesoId>, RepositoryError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| RepositoryError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RepositoryError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let uuid = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok());
            match uuid {
                Some(uuid) => ids.push(ProcesoId::from_uuid(uuid)),
                None => tracing::debug!(path = %path.display(), "skipping non-proceso file"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn lock_exclusive(
        &self,
        scope: LockScope<'_>,
        timeout: Duration,
    ) -> Result<Option<StoreLock>, RepositoryError> {
        let path = match scope {
            // No lock file for ids that were never saved; the caller's load
            // reports them missing.
            LockScope::Proceso(id) if !self.path_for(id).exists() => return Ok(None),
            LockScope::Proceso(id) => self.lock_dir().join(format!("{}.lock", id.as_uuid())),
            LockScope::Registry => self.lock_dir().join("registry.lock"),
        };
        StoreLock::acquire(path, timeout).map(Some)
    }
}
