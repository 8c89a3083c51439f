//! # Concurrency Tests
//!
//! Writers on the same proceso are serialized by the per-proceso lock;
//! readers never wait for it. A writer that cannot get the lock within the
//! configured timeout fails with a retryable `BUSY` error instead of
//! blocking. Engines opened separately over one file store exclude each
//! other through the store's lock files.

use std::collections::HashSet;
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;

use jud_core::{ProcesoId, Timestamp};
use jud_engine::{
    EngineConfig, EngineError, JsonFileRepository, NuevoProceso, ProcesoEngine, RecordingSink,
    Solicitud,
};
use jud_state::{EstadoProceso, Parte};

fn at() -> Timestamp {
    Timestamp::start_of(NaiveDate::from_ymd_opt(2026, 7, 6).unwrap())
}

fn engine(lock_timeout_ms: u64) -> Arc<ProcesoEngine> {
    Arc::new(
        ProcesoEngine::in_memory(EngineConfig {
            lock_timeout_ms,
            nurej_prefix: "PTS".into(),
            ..EngineConfig::default()
        })
        .unwrap(),
    )
}

fn nuevo(n: usize) -> NuevoProceso {
    NuevoProceso {
        partes: vec![
            Parte::actor(format!("Actor {n}")),
            Parte::demandado(format!("Demandado {n}")),
        ],
        materia: "civil".into(),
        juzgado: "Juzgado Público Civil 1º de Potosí".into(),
        demanda: None,
    }
}

fn presentado(engine: &ProcesoEngine) -> ProcesoId {
    let p = engine.crear_proceso(nuevo(0), at()).unwrap();
    engine.transicionar(&p.id, Solicitud::Presentar, at()).unwrap();
    p.id
}

#[test]
fn racing_admitir_and_observar_commit_exactly_once() {
    let engine = engine(2_000);
    let id = presentado(&engine);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let id = id.clone();
            thread::spawn(move || {
                let solicitud = if i % 2 == 0 {
                    Solicitud::Admitir
                } else {
                    Solicitud::Observar
                };
                barrier.wait();
                engine.transicionar(&id, solicitud, at())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1, "{results:?}");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code(), "ILLEGAL_TRANSITION");
    }

    let p = engine.obtener(&id).unwrap();
    assert!(matches!(p.estado, EstadoProceso::Admitido | EstadoProceso::Observado));
    assert_eq!(p.transitions.len(), 2);
    assert_eq!(p.plazos.len(), 1);
    assert!(p.active_plazos_unique());
}

#[test]
fn held_lock_makes_writers_busy_but_not_readers() {
    let engine = engine(20);
    let id = presentado(&engine);

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = {
        let engine = Arc::clone(&engine);
        let id = id.clone();
        thread::spawn(move || {
            engine
                .locks()
                .with_lock(&id, Duration::from_secs(5), || {
                    locked_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                })
                .unwrap();
        })
    };
    locked_rx.recv().unwrap();
    assert!(engine.locks().is_locked(&id));

    let err = engine.transicionar(&id, Solicitud::Admitir, at()).unwrap_err();
    assert!(matches!(err, EngineError::Busy { waited_ms: 20, .. }));
    assert!(err.is_retryable());
    assert_eq!(err.code(), "BUSY");

    // Reads and writes on other procesos are unaffected.
    assert_eq!(engine.estado(&id).unwrap(), EstadoProceso::Presentado);
    let other = engine.crear_proceso(nuevo(1), at()).unwrap();
    engine.transicionar(&other.id, Solicitud::Presentar, at()).unwrap();

    // Sweeping skips the locked proceso instead of failing.
    let report = engine
        .sweep_expirations(NaiveDate::from_ymd_opt(2099, 1, 1).unwrap())
        .unwrap();
    assert_eq!(report.ocupados, vec![id.clone()]);
    assert!(report.fallidos.is_empty());
    assert!(report.vencidos.iter().all(|p| p.proceso_id != id));

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    let p = engine.transicionar(&id, Solicitud::Admitir, at()).unwrap();
    assert_eq!(p.estado, EstadoProceso::Admitido);
}

#[test]
fn concurrent_creation_allocates_distinct_nurejs() {
    let engine = engine(2_000);
    let threads = 12;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.crear_proceso(nuevo(i), at()).unwrap()
            })
        })
        .collect();

    let nurejs: HashSet<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().nurej.as_str().to_string())
        .collect();
    assert_eq!(nurejs.len(), threads);
    assert!(nurejs.contains("PTS2026000001"));
    assert!(nurejs.contains("PTS2026000012"));
    assert_eq!(engine.listar().unwrap().len(), threads);
}

#[test]
fn independent_procesos_progress_in_parallel() {
    let engine = engine(2_000);
    let ids: Vec<_> = (0..6).map(|_| presentado(&engine)).collect();

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for solicitud in [Solicitud::Admitir, Solicitud::LibrarCitacion, Solicitud::Citar] {
                    engine.transicionar(&id, solicitud, at()).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for id in ids {
        let p = engine.obtener(&id).unwrap();
        assert_eq!(p.estado, EstadoProceso::ContestacionPendiente);
        assert_eq!(p.plazos.len(), 2);
    }
}

/// Separate engines over one directory, as separate `jud` invocations are.
fn file_engines(dir: &std::path::Path, n: usize) -> Vec<Arc<ProcesoEngine>> {
    (0..n)
        .map(|_| {
            Arc::new(
                ProcesoEngine::new(
                    EngineConfig {
                        lock_timeout_ms: 5_000,
                        nurej_prefix: "SCZ".into(),
                        ..EngineConfig::default()
                    },
                    Arc::new(JsonFileRepository::open(dir).unwrap()),
                    Arc::new(RecordingSink::new()),
                )
                .unwrap(),
            )
        })
        .collect()
}

#[test]
fn separate_engines_over_one_store_commit_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let engines = file_engines(dir.path(), 6);
    let id = presentado(&engines[0]);
    let barrier = Arc::new(Barrier::new(engines.len()));

    let handles: Vec<_> = engines
        .iter()
        .enumerate()
        .map(|(i, engine)| {
            let engine = Arc::clone(engine);
            let barrier = Arc::clone(&barrier);
            let id = id.clone();
            thread::spawn(move || {
                let solicitud = if i % 2 == 0 {
                    Solicitud::Admitir
                } else {
                    Solicitud::Observar
                };
                barrier.wait();
                engine.transicionar(&id, solicitud, at())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code(), "ILLEGAL_TRANSITION");
    }

    let p = file_engines(dir.path(), 1)[0].obtener(&id).unwrap();
    assert_eq!(p.transitions.len(), 2);
    assert_eq!(p.plazos.len(), 1);
}

#[test]
fn separate_engines_over_one_store_allocate_distinct_nurejs() {
    let dir = tempfile::tempdir().unwrap();
    let engines = file_engines(dir.path(), 8);
    let barrier = Arc::new(Barrier::new(engines.len()));

    let handles: Vec<_> = engines
        .iter()
        .enumerate()
        .map(|(i, engine)| {
            let engine = Arc::clone(engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.crear_proceso(nuevo(i), at()).unwrap()
            })
        })
        .collect();

    let nurejs: HashSet<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().nurej.as_str().to_string())
        .collect();
    assert_eq!(nurejs.len(), engines.len());
    assert!(nurejs.contains("SCZ2026000008"));
    assert_eq!(engines[0].listar().unwrap().len(), engines.len());
}
