//! Web server module for the basking relay.
//!
//! Receives the SMS gateway webhook and serves the report, the JSON feed and
//! health checks.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::ingest::{ACKNOWLEDGEMENT, Ingestor, RawPayload};
use crate::report;
use crate::storage::{StoreReader, StoreWriter};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Ingestor,
    pub reader: StoreReader,
    pub writer: StoreWriter,
}

impl AppState {
    /// State wired to one store: ingestion appends through `writer`.
    pub fn new(reader: StoreReader, writer: StoreWriter) -> Self {
        Self {
            ingestor: Ingestor::new(writer.clone()),
            reader,
            writer,
        }
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<String>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(report_handler))
        .route("/sms", post(sms_handler))
        .route("/api/readings", get(readings_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// SMS gateway webhook. Always answers with the fixed acknowledgement.
async fn sms_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let payload = RawPayload::from_form(&body);
    let ingestor = state.ingestor.clone();

    if let Err(e) = tokio::task::spawn_blocking(move || ingestor.handle(payload)).await {
        tracing::error!(error = %e, "Ingestion task failed");
    }

    (
        [(header::CONTENT_TYPE, "application/xml")],
        ACKNOWLEDGEMENT,
    )
        .into_response()
}

/// Full history as an HTML table.
async fn report_handler(State(state): State<Arc<AppState>>) -> Response {
    let reader = state.reader.clone();
    match tokio::task::spawn_blocking(move || reader.read_all()).await {
        Ok(Ok(readings)) => match report::render(&readings) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Template render failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to read store for report");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response(),
    }
}

/// Full history as JSON.
async fn readings_handler(State(state): State<Arc<AppState>>) -> Response {
    let reader = state.reader.clone();
    match tokio::task::spawn_blocking(move || reader.read_all()).await {
        Ok(Ok(readings)) => Json(readings).into_response(),
        Ok(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response(),
    }
}

/// Liveness check.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        store: None,
    })
}

/// Readiness check that runs the storage guard.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    let writer = state.writer.clone();
    let store_status = match tokio::task::spawn_blocking(move || writer.check()).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match store_status {
        Ok(()) => Json(HealthResponse {
            status: "ok".to_string(),
            store: Some("ready".to_string()),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "not_ready".to_string(),
                    store: Some(err),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageBuilder;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    fn create_test_state() -> (AppState, crate::storage::StorageHandles, TempDir) {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("SBSBS.csv");

        let handles = StorageBuilder::new(&store_path)
            .channel_capacity(16)
            .build()
            .expect("Failed to build storage");

        let state = AppState::new(handles.reader.clone(), handles.writer.clone());

        // Return handles AND dir to keep tempdir alive
        (state, handles, dir)
    }

    fn sms_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/sms")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_sms_appends_and_acknowledges() {
        let (state, handles, _dir) = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(sms_request(
                "MessageSid=SM1&From=%2B440000&Body=1548460799000%2C21.5%2C55.0%2C312.4%2CTAG001%0A",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], ACKNOWLEDGEMENT.as_bytes());

        let readings = handles.reader.read_all().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].message_id, "SM1");
        assert_eq!(readings[0].from_address, "+440000");
    }

    #[tokio::test]
    async fn test_sms_garbage_body_still_acknowledged() {
        let (state, handles, _dir) = create_test_state();
        let app = create_router(state);

        let response = app.oneshot(sms_request("%%%not a form")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], ACKNOWLEDGEMENT.as_bytes());
        assert!(handles.reader.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_readings_endpoint() {
        let (state, _handles, _dir) = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/readings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"[]");
    }

    #[tokio::test]
    async fn test_report_endpoint() {
        let (state, _handles, _dir) = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8_lossy(&bytes);
        assert_eq!(status, StatusCode::OK, "Body: {}", body);
        assert!(body.contains("0 readings"));
    }

    #[tokio::test]
    async fn test_report_lists_ingested_readings() {
        let (state, _handles, _dir) = create_test_state();
        let app = create_router(state);

        app.clone()
            .oneshot(sms_request(
                "MessageSid=SM7&From=%2B440000&Body=1548460799000%2C21.5%2C55.0%2C312.4%2CTAG001%2CTAG002",
            ))
            .await
            .unwrap();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("1 readings"), "Body: {}", body);
        assert!(body.contains("SM7"));
        assert!(body.contains("TAG001"));
        assert!(body.contains("TAG002"));
    }

    #[tokio::test]
    async fn test_readyz_reports_unavailable_store() {
        let (state, handles, _dir) = create_test_state();
        std::fs::create_dir(handles.reader.path()).unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
