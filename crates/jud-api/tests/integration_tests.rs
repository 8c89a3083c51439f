//! # Integration Tests for jud-api
//!
//! Drives the router with `oneshot`: health probes, proceso creation and
//! transitions, plazo queries, sentencia issuance, and the mapping of engine
//! failures to HTTP status codes.

use std::sync::mpsc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use jud_api::state::AppState;
use jud_engine::{EngineConfig, ProcesoEngine};

fn test_state() -> AppState {
    let config = EngineConfig {
        lock_timeout_ms: 20,
        nurej_prefix: "LPZ".into(),
        ..EngineConfig::default()
    };
    AppState::new(ProcesoEngine::in_memory(config).unwrap())
}

async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&v).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = jud_api::app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

fn nuevo_proceso() -> Value {
    json!({
        "materia": "civil",
        "juzgado": "Juzgado Público Civil 4º de La Paz",
        "partes": [
            {"nombre": "Ana Quispe", "rol": "ACTOR"},
            {"nombre": "Carlos Mamani", "rol": "DEMANDADO", "documento": "4812345 LP"}
        ]
    })
}

async fn create(state: &AppState) -> String {
    let (status, body) = send(state, "POST", "/v1/procesos", Some(nuevo_proceso())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn transition(state: &AppState, id: &str, body: Value) -> (StatusCode, Value) {
    send(state, "POST", &format!("/v1/procesos/{id}/transiciones"), Some(body)).await
}

/// Drive a fresh proceso to CONTESTACION_PENDIENTE.
async fn citado(state: &AppState) -> String {
    let id = create(state).await;
    for evento in ["presentar", "admitir", "citar"] {
        let (status, body) = transition(state, &id, json!({"evento": evento})).await;
        assert_eq!(status, StatusCode::OK, "{evento}: {body}");
    }
    id
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let (status, body) = send(&test_state(), "GET", "/health/liveness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let (status, body) = send(&test_state(), "GET", "/health/readiness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

// -- Procesos -----------------------------------------------------------------

#[tokio::test]
async fn test_create_and_get_proceso() {
    let state = test_state();
    let (status, created) = send(&state, "POST", "/v1/procesos", Some(nuevo_proceso())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["estado"], "BORRADOR");
    assert!(created["nurej"].as_str().unwrap().starts_with("LPZ"));
    assert_eq!(created["eventos_validos"], json!(["presentar", "archivar"]));

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&state, "GET", &format!("/v1/procesos/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["nurej"], created["nurej"]);
}

#[tokio::test]
async fn test_create_with_explicit_nurej_and_duplicate() {
    let state = test_state();
    let mut body = nuevo_proceso();
    body["nurej"] = json!("LPZ2020000042");
    let (status, created) = send(&state, "POST", "/v1/procesos", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["nurej"], "LPZ2020000042");

    let (status, err) = send(&state, "POST", "/v1/procesos", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "DUPLICATE_NUREJ");
}

#[tokio::test]
async fn test_create_rejects_two_actors() {
    let state = test_state();
    let body = json!({
        "materia": "civil",
        "juzgado": "Juzgado 1º",
        "partes": [
            {"nombre": "A", "rol": "ACTOR"},
            {"nombre": "B", "rol": "ACTOR"}
        ]
    });
    let (status, err) = send(&state, "POST", "/v1/procesos", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "INVALID_PARTES");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let state = test_state();
    let (status, err) = send(&state, "POST", "/v1/procesos", Some(json!({"materia": 3}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let state = test_state();
    let missing = uuid::Uuid::new_v4();
    let (status, err) = send(&state, "GET", &format!("/v1/procesos/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"]["code"], "PROCESO_NOT_FOUND");

    let (status, _) = send(&state, "GET", "/v1/procesos/nope", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Transitions --------------------------------------------------------------

#[tokio::test]
async fn test_admission_opens_citacion_plazo() {
    let state = test_state();
    let id = create(&state).await;
    transition(&state, &id, json!({"evento": "presentar"})).await;
    let (status, proceso) = transition(&state, &id, json!({"evento": "admitir"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proceso["estado"], "ADMITIDO");

    let (status, plazos) = send(&state, "GET", &format!("/v1/procesos/{id}/plazos"), None).await;
    assert_eq!(status, StatusCode::OK);
    let plazos = plazos.as_array().unwrap();
    assert_eq!(plazos.len(), 1);
    assert_eq!(plazos[0]["kind"], "CITACION");
    assert_eq!(plazos[0]["status"], "ACTIVO");
    assert_eq!(plazos[0]["business_days"], 10);
}

#[tokio::test]
async fn test_illegal_transition_is_conflict() {
    let state = test_state();
    let id = create(&state).await;
    let (status, err) = transition(&state, &id, json!({"evento": "admitir"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "ILLEGAL_TRANSITION");
    assert!(err["error"]["message"].as_str().unwrap().contains("BORRADOR"));
}

#[tokio::test]
async fn test_unknown_event_is_bad_request() {
    let state = test_state();
    let id = create(&state).await;
    let (status, _) = transition(&state, &id, json!({"evento": "apelar"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_excepciones_without_grounding_rejected() {
    let state = test_state();
    let id = citado(&state).await;
    let body = json!({
        "evento": "contestar",
        "contestacion": {
            "tipo": "EXCEPCIONES",
            "excepciones": [
                {"tipo": "PRESCRIPCION", "fundamento": "Art. 1492 CC"},
                {"tipo": "INCOMPETENCIA"}
            ]
        }
    });
    let (status, err) = transition(&state, &id, body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "MISSING_GROUNDING");
    assert!(err["error"]["message"].as_str().unwrap().contains("INCOMPETENCIA"));

    let (_, proceso) = send(&state, "GET", &format!("/v1/procesos/{id}"), None).await;
    assert_eq!(proceso["estado"], "CONTESTACION_PENDIENTE");
}

#[tokio::test]
async fn test_allanamiento_then_sentencia() {
    let state = test_state();
    let id = citado(&state).await;
    let body = json!({
        "evento": "contestar",
        "contestacion": {
            "tipo": "ALLANAMIENTO",
            "acepta_hechos": true,
            "acepta_pretensiones": true,
            "acepta_consecuencias": true,
            "irrevocable": true
        }
    });
    let (status, proceso) = transition(&state, &id, body).await;
    assert_eq!(status, StatusCode::OK, "{proceso}");
    assert_eq!(proceso["estado"], "SENTENCIA_PENDIENTE");

    let borrador = json!({
        "cuerpo": {
            "encabezamiento": "SENTENCIA N° 12/2026",
            "narrativa": "VISTOS: la demanda de cumplimiento de contrato...",
            "motiva": "CONSIDERANDO: que el demandado se allanó...",
            "resolutiva": "POR TANTO: se declara PROBADA la demanda."
        },
        "resultado_actor": "FAVORABLE",
        "resultado_demandado": "DESFAVORABLE"
    });
    let uri = format!("/v1/procesos/{id}/sentencia");
    let (status, sentencia) = send(&state, "POST", &uri, Some(borrador.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{sentencia}");
    assert_eq!(sentencia["estado"], "NOTIFICADA");
    assert!(sentencia["content_hash"].is_object() || sentencia["content_hash"].is_string());

    let (status, err) = send(&state, "POST", &uri, Some(borrador)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "ALREADY_ISSUED");
}

#[tokio::test]
async fn test_incomplete_draft_rejected() {
    let state = test_state();
    let id = citado(&state).await;
    let body = json!({
        "evento": "contestar",
        "contestacion": {
            "tipo": "ALLANAMIENTO",
            "acepta_hechos": true,
            "acepta_pretensiones": true,
            "acepta_consecuencias": true,
            "irrevocable": true
        }
    });
    transition(&state, &id, body).await;
    let borrador = json!({
        "cuerpo": {"encabezamiento": "S", "narrativa": "N", "motiva": "", "resolutiva": "R"},
        "resultado_actor": "FAVORABLE",
        "resultado_demandado": "DESFAVORABLE"
    });
    let (status, err) = send(&state, "POST", &format!("/v1/procesos/{id}/sentencia"), Some(borrador)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "INCOMPLETE_DRAFT");
}

// -- Plazos -------------------------------------------------------------------

#[tokio::test]
async fn test_dias_restantes_for_citacion() {
    let state = test_state();
    let id = create(&state).await;
    transition(&state, &id, json!({"evento": "presentar"})).await;
    transition(&state, &id, json!({"evento": "admitir"})).await;
    let (_, plazos) = send(&state, "GET", &format!("/v1/procesos/{id}/plazos"), None).await;
    let plazo_id = plazos[0]["id"].as_str().unwrap();
    let due_on = plazos[0]["due_on"].as_str().unwrap();

    let uri = format!("/v1/plazos/{plazo_id}/dias-restantes?hoy={due_on}");
    let (status, dias) = send(&state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dias["dias"], 0);
    assert_eq!(dias["dias_habiles"], 0);
    assert_eq!(dias["kind"], "CITACION");

    let (status, _) = send(
        &state,
        "GET",
        &format!("/v1/plazos/{plazo_id}/dias-restantes?hoy=2026-13-01"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_sweep_expires_overdue_plazos() {
    let state = test_state();
    let id = create(&state).await;
    transition(&state, &id, json!({"evento": "presentar"})).await;
    transition(&state, &id, json!({"evento": "observar"})).await;

    let (status, body) = send(&state, "POST", "/v1/plazos/sweep?hoy=2099-01-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["vencidos"][0]["kind"], "SUBSANACION");
    assert_eq!(body["vencidos"][0]["status"], "VENCIDO");
    assert_eq!(body["ocupados"], json!([]));
    assert_eq!(body["fallidos"], json!([]));

    let (_, body) = send(&state, "POST", "/v1/plazos/sweep?hoy=2099-01-02", None).await;
    assert_eq!(body["total"], 0);
}

// -- Concurrency --------------------------------------------------------------

#[tokio::test]
async fn test_held_lock_returns_503() {
    let state = test_state();
    let id = create(&state).await;
    let proceso_id = jud_api::extractors::parse_proceso_id(&id).unwrap();

    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let engine = state.engine.clone();
    let holder = std::thread::spawn(move || {
        engine
            .locks()
            .with_lock(&proceso_id, Duration::from_secs(5), || {
                held_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                Ok(())
            })
            .unwrap();
    });
    held_rx.recv().unwrap();

    let (status, err) = transition(&state, &id, json!({"evento": "presentar"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err["error"]["code"], "BUSY");
    assert_eq!(err["error"]["details"]["retryable"], true);

    release_tx.send(()).unwrap();
    holder.join().unwrap();
    let (status, _) = transition(&state, &id, json!({"evento": "presentar"})).await;
    assert_eq!(status, StatusCode::OK);
}
