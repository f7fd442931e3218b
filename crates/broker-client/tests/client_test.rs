//! Integration tests for the broker HTTP client against a stub broker

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use eden_broker::{Broker, InstanceRef, LastOperationQuery, OpenServiceBroker};
use eden_common::{Error, OperationState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

/// A request as seen by the stub broker
#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    uri: String,
    api_version: Option<String>,
    authorized: bool,
}

#[derive(Default)]
struct StubState {
    requests: Mutex<Vec<Recorded>>,
    bodies: Mutex<Vec<Value>>,
}

async fn record(State(state): State<Arc<StubState>>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let recorded = Recorded {
        method: request.method().to_string(),
        uri: request.uri().to_string(),
        api_version: headers
            .get("X-Broker-API-Version")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        authorized: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("Basic "))
            .unwrap_or(false),
    };
    state.requests.lock().unwrap().push(recorded);
    next.run(request).await
}

async fn catalog_handler() -> Json<Value> {
    Json(json!({
        "services": [{
            "id": "svc-pg",
            "name": "postgresql",
            "bindable": true,
            "plans": [{"id": "pg-small", "name": "small", "description": "1 GB"}]
        }]
    }))
}

async fn provision_handler(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.bodies.lock().unwrap().push(body);
    if id == "async-1" {
        (
            StatusCode::ACCEPTED,
            Json(json!({"operation": "op-123", "dashboard_url": "http://dash/async-1"})),
        )
            .into_response()
    } else if id == "conflict" {
        (
            StatusCode::CONFLICT,
            Json(json!({"error": "Conflict", "description": "already exists"})),
        )
            .into_response()
    } else {
        (StatusCode::CREATED, Json(json!({}))).into_response()
    }
}

async fn update_handler(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> Response {
    state.bodies.lock().unwrap().push(body);
    (StatusCode::ACCEPTED, Json(json!({"operation": "upd-1"}))).into_response()
}

async fn deprovision_handler(Path(id): Path<String>) -> Response {
    if id == "gone" {
        (StatusCode::GONE, Json(json!({}))).into_response()
    } else {
        (StatusCode::OK, Json(json!({}))).into_response()
    }
}

async fn last_operation_handler(
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match id.as_str() {
        "garbled" => (StatusCode::OK, "<html>not json</html>").into_response(),
        "failing" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": "database down"})),
        )
            .into_response(),
        "vanished" => (StatusCode::GONE, Json(json!({}))).into_response(),
        _ => {
            let token = query.get("operation").cloned().unwrap_or_default();
            Json(json!({"state": "in progress", "description": format!("working on {}", token)}))
                .into_response()
        }
    }
}

async fn bind_handler(
    State(state): State<Arc<StubState>>,
    Path((_id, binding_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.bodies.lock().unwrap().push(body);
    Json(json!({"credentials": {"uri": format!("postgres://{}@db", binding_id), "port": 5432}}))
}

async fn unbind_handler(_headers: HeaderMap) -> Json<Value> {
    Json(json!({}))
}

async fn spawn_stub() -> (OpenServiceBroker, Arc<StubState>) {
    let state = Arc::new(StubState::default());

    let app = Router::new()
        .route("/v2/catalog", get(catalog_handler))
        .route(
            "/v2/service_instances/{id}",
            put(provision_handler)
                .patch(update_handler)
                .delete(deprovision_handler),
        )
        .route(
            "/v2/service_instances/{id}/last_operation",
            get(last_operation_handler),
        )
        .route(
            "/v2/service_instances/{id}/service_bindings/{binding_id}",
            put(bind_handler).delete(unbind_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let broker = OpenServiceBroker::new(format!("http://{}", addr), "admin", "secret", "2.14");
    (broker, state)
}

fn instance(id: &str) -> InstanceRef {
    InstanceRef::new("svc-pg", "pg-small", id)
}

#[tokio::test]
async fn test_catalog_sends_auth_and_version() {
    let (broker, state) = spawn_stub().await;

    let catalog = broker.catalog().await.unwrap();
    assert_eq!(catalog.services.len(), 1);
    assert_eq!(catalog.services[0].plans[0].name, "small");

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].uri, "/v2/catalog");
    assert_eq!(requests[0].api_version.as_deref(), Some("2.14"));
    assert!(requests[0].authorized);
}

#[tokio::test]
async fn test_synchronous_provision() {
    let (broker, state) = spawn_stub().await;

    let response = broker
        .provision(&instance("sync-1"), Some(&json!({"size": 2})))
        .await
        .unwrap();
    assert!(!response.is_async);
    assert!(response.operation_token.is_none());

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(
        requests[0].uri,
        "/v2/service_instances/sync-1?accepts_incomplete=true"
    );
    let bodies = state.bodies.lock().unwrap();
    assert_eq!(bodies[0]["service_id"], "svc-pg");
    assert_eq!(bodies[0]["plan_id"], "pg-small");
    assert_eq!(bodies[0]["parameters"]["size"], 2);
}

#[tokio::test]
async fn test_asynchronous_provision_returns_token() {
    let (broker, _state) = spawn_stub().await;

    let response = broker.provision(&instance("async-1"), None).await.unwrap();
    assert!(response.is_async);
    assert_eq!(response.operation_token.as_deref(), Some("op-123"));
    assert_eq!(response.dashboard_url.as_deref(), Some("http://dash/async-1"));
}

#[tokio::test]
async fn test_provision_conflict_is_remote_failure() {
    let (broker, _state) = spawn_stub().await;

    let err = broker.provision(&instance("conflict"), None).await.unwrap_err();
    match err {
        Error::RemoteOperationFailed(msg) => {
            assert!(msg.contains("409"));
            assert!(msg.contains("already exists"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_update_is_async_with_previous_values() {
    let (broker, state) = spawn_stub().await;

    let response = broker.update(&instance("i-1"), None).await.unwrap();
    assert!(response.is_async);
    assert_eq!(response.operation_token.as_deref(), Some("upd-1"));

    let bodies = state.bodies.lock().unwrap();
    assert_eq!(bodies[0]["previous_values"]["plan_id"], "pg-small");
}

#[tokio::test]
async fn test_deprovision_sends_service_and_plan() {
    let (broker, state) = spawn_stub().await;

    let response = broker.deprovision(&instance("i-1")).await.unwrap();
    assert!(!response.is_async);

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests[0].method, "DELETE");
    assert!(requests[0].uri.contains("service_id=svc-pg"));
    assert!(requests[0].uri.contains("plan_id=pg-small"));
}

#[tokio::test]
async fn test_deprovision_gone_is_success() {
    let (broker, _state) = spawn_stub().await;

    let response = broker.deprovision(&instance("gone")).await.unwrap();
    assert!(!response.is_async);
}

#[tokio::test]
async fn test_bind_and_unbind() {
    let (broker, state) = spawn_stub().await;

    let bound = broker.bind(&instance("i-1"), "b-1", None).await.unwrap();
    assert_eq!(bound.credentials["uri"], "postgres://b-1@db");
    assert_eq!(bound.credentials["port"], 5432);

    broker.unbind(&instance("i-1"), "b-1").await.unwrap();

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests[1].method, "DELETE");
    assert!(requests[1]
        .uri
        .starts_with("/v2/service_instances/i-1/service_bindings/b-1?"));
    let bodies = state.bodies.lock().unwrap();
    assert_eq!(bodies[0]["bind_resource"]["app_guid"], "eden-unknown");
}

#[tokio::test]
async fn test_last_operation_echoes_token() {
    let (broker, _state) = spawn_stub().await;

    let op = broker
        .last_operation(&LastOperationQuery {
            instance: instance("i-1"),
            operation_token: Some("op-123".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(op.state, OperationState::InProgress);
    assert_eq!(op.description, "working on op-123");
}

#[tokio::test]
async fn test_last_operation_decode_failure_is_ambiguous() {
    let (broker, _state) = spawn_stub().await;

    let err = broker
        .last_operation(&LastOperationQuery {
            instance: instance("garbled"),
            operation_token: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PollDecodeAmbiguous(_)));
}

#[tokio::test]
async fn test_last_operation_server_error_is_remote_failure() {
    let (broker, _state) = spawn_stub().await;

    let err = broker
        .last_operation(&LastOperationQuery {
            instance: instance("failing"),
            operation_token: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RemoteOperationFailed(msg) if msg.contains("database down")));
}

#[tokio::test]
async fn test_last_operation_gone_means_succeeded() {
    let (broker, _state) = spawn_stub().await;

    let op = broker
        .last_operation(&LastOperationQuery {
            instance: instance("vanished"),
            operation_token: None,
        })
        .await
        .unwrap();
    assert_eq!(op.state, OperationState::Succeeded);
}

#[tokio::test]
async fn test_unreachable_broker_is_remote_failure() {
    let broker = OpenServiceBroker::new("http://127.0.0.1:1", "u", "p", "2.14");

    let err = broker.catalog().await.unwrap_err();
    assert!(matches!(err, Error::RemoteOperationFailed(_)));
}
