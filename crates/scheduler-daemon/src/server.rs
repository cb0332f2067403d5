use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use scheduler_core::{dispatcher, scheduler, CheckpointStore, Event, SchedulerConfig, SchedulerHandle, StatusEntry};

use crate::error::ApiError;
use crate::models::{DeleteFunctionBody, EventBody, FunctionBody, HealthBody};

/// Shared application state handed to every axum handler, mirroring the
/// reference daemon's `Arc<AppState>` pattern.
struct AppState {
    handle: SchedulerHandle,
    event_tx: mpsc::Sender<Event>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/event", post(post_event))
        .route("/api/function", post(post_function).delete(delete_function))
        .route("/api/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EventBody>,
) -> Result<StatusCode, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("event name must not be empty"));
    }
    let event = Event::new(body.name, body.data);
    state
        .event_tx
        .send(event)
        .await
        .map_err(|_| ApiError::internal("event queue is closed"))?;
    Ok(StatusCode::OK)
}

async fn post_function(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FunctionBody>,
) -> Result<StatusCode, ApiError> {
    let def = body.into_def().map_err(ApiError::bad_request)?;
    state.handle.register(def).await?;
    Ok(StatusCode::OK)
}

async fn delete_function(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeleteFunctionBody>,
) -> StatusCode {
    state.handle.delete(&body.name).await;
    StatusCode::OK
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<Vec<StatusEntry>> {
    Json(state.handle.snapshot().await)
}

/// Boots configuration, restores the checkpoint, spawns the scheduler and
/// dispatcher loops, and serves the HTTP surface until a shutdown signal is
/// received — the daemon's equivalent of the reference `cave-daemon::server::run`.
pub async fn run() -> anyhow::Result<()> {
    let config = SchedulerConfig::from_env()?;

    let checkpoint = CheckpointStore::new(&config.checkpoint_path);
    let registry = checkpoint.load()?;
    let handle = SchedulerHandle::new(registry, checkpoint);

    let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity);
    let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_queue_capacity);
    let cancel = CancellationToken::new();

    let client = dispatcher::build_client(config.dispatch_timeout)?;

    let scheduler_task = tokio::spawn(scheduler::run_scheduler_loop(
        handle.clone(),
        event_rx,
        dispatch_tx,
        cancel.clone(),
    ));
    let dispatcher_task = tokio::spawn(dispatcher::run_dispatcher_loop(dispatch_rx, client, cancel.clone()));

    let state = Arc::new(AppState { handle, event_tx });
    let app = build_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "scheduler-daemon listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            shutdown_cancel.cancel();
        })
        .await?;

    cancel.cancel();
    scheduler_task.await?;
    dispatcher_task.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use scheduler_core::FunctionDef;
    use tower::ServiceExt;

    fn test_state() -> (Arc<AppState>, mpsc::Receiver<Event>) {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointStore::new(dir.path().join("c.chk"));
        let handle = SchedulerHandle::new(scheduler_core::Registry::new(), checkpoint);
        let (event_tx, event_rx) = mpsc::channel(8);
        (Arc::new(AppState { handle, event_tx }), event_rx)
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let (state, _rx) = test_state();
        let app = build_router(state);
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_event_rejects_empty_name() {
        let (state, _rx) = test_state();
        let app = build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/event")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_then_status_round_trips() {
        let (state, _rx) = test_state();
        state
            .handle
            .register(FunctionDef {
                name: "f".into(),
                subs: vec!["A".into()],
                url: "http://example.invalid/f".into(),
                method: scheduler_core::InvocationMethod::Post,
                mock: true,
            })
            .await
            .unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        // assert against the raw wire JSON, not by deserializing back into
        // `StatusEntry` — that would pass even if the field names drifted
        // from the documented `/api/status` contract.
        let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let entries = raw.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["name"], "f");
        assert!(entries[0].get("rows").is_none(), "wire contract uses `events`, not `rows`");
        assert!(entries[0]["events"].is_array());
        assert!(entries[0]["last_invoke"].is_null());

        let entries: Vec<StatusEntry> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "f");
    }

    #[tokio::test]
    async fn delete_function_is_idempotent() {
        let (state, _rx) = test_state();
        let app = build_router(state);
        let body = r#"{"name":"missing"}"#;
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/function")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
