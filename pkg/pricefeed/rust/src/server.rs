// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! HTTP JSON API over the dashboard.
//!
//! - `GET  /api/health` - liveness
//! - `GET  /api/catalog` - query definitions in load order
//! - `POST /api/catalog/reload` - re-read the query directory
//! - `GET  /api/live` - the live panel
//! - `GET  /api/sessions/:id` - session phase, selection and executed panel
//! - `POST /api/sessions/:id/select` - `{"key": "..."}`
//! - `POST /api/sessions/:id/execute` - run the selection
//! - `GET  /api/sessions/:id/export.csv` - executed result as CSV
//! - `POST /api/query` - `{"text": "...", "kind": "..."}` ad-hoc panel
//!
//! The optional background refresh only pre-warms the shared cache so the
//! next `GET /api/live` is served without a store round-trip. Its period
//! should be at least the live TTL, or ticks land on a fresh entry and do
//! nothing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::{Catalog, VisualizationKind};
use crate::dashboard::{Dashboard, Panel, SessionView};
use crate::error::DashboardError;

pub struct ServerConfig {
    pub port: u16,
    /// Background live-panel cache pre-warm; `None` disables it.
    pub live_refresh: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8050,
            live_refresh: Some(Duration::from_secs(20)),
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match self {
            DashboardError::UnknownKey(_) => StatusCode::NOT_FOUND,
            DashboardError::NothingSelected | DashboardError::NothingExecuted => {
                StatusCode::CONFLICT
            }
            DashboardError::EmptyQuery => StatusCode::BAD_REQUEST,
            DashboardError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/catalog", get(catalog_handler))
        .route("/api/catalog/reload", post(reload_handler))
        .route("/api/live", get(live_handler))
        .route("/api/sessions/:id", get(session_handler))
        .route("/api/sessions/:id/select", post(select_handler))
        .route("/api/sessions/:id/execute", post(execute_handler))
        .route("/api/sessions/:id/export.csv", get(export_handler))
        .route("/api/query", post(query_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(dashboard)
}

/// Serve until `shutdown` flips to true.
pub async fn run_server(
    dashboard: Arc<Dashboard>,
    config: ServerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    if let Some(every) = config.live_refresh {
        spawn_live_refresh(dashboard.clone(), every, shutdown.clone());
        tracing::info!(interval_ms = every.as_millis() as u64, "Background live refresh enabled");
    }

    let app = router(dashboard);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;
    Ok(())
}

/// Re-run the live query every `every` until shutdown, keeping its cache
/// entry warm.
pub fn spawn_live_refresh(
    dashboard: Arc<Dashboard>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = dashboard.live_panel().await {
                        tracing::warn!(error = %e, "Live panel refresh failed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn catalog_handler(State(dashboard): State<Arc<Dashboard>>) -> Json<Catalog> {
    Json(dashboard.catalog().as_ref().clone())
}

async fn reload_handler(State(dashboard): State<Arc<Dashboard>>) -> Json<Catalog> {
    Json(dashboard.reload_catalog().as_ref().clone())
}

async fn live_handler(
    State(dashboard): State<Arc<Dashboard>>,
) -> Result<Json<Panel>, DashboardError> {
    dashboard.live_panel().await.map(Json)
}

async fn session_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Path(id): Path<String>,
) -> Json<SessionView> {
    Json(dashboard.session_view(&id))
}

#[derive(Deserialize)]
struct SelectRequest {
    key: String,
}

async fn select_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Path(id): Path<String>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SessionView>, DashboardError> {
    dashboard.select(&id, &req.key).map(Json)
}

async fn execute_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, DashboardError> {
    dashboard.execute(&id).await.map(Json)
}

async fn export_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Path(id): Path<String>,
) -> Result<Response, DashboardError> {
    let (file_name, bytes) = dashboard.export_csv(&id)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Deserialize)]
struct QueryRequest {
    text: String,
    /// Unknown or missing kinds render as a time series.
    #[serde(default)]
    kind: Option<String>,
}

async fn query_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Panel>, DashboardError> {
    let kind = req
        .kind
        .as_deref()
        .map_or(VisualizationKind::TimeSeries, VisualizationKind::parse_lenient);
    dashboard.execute_text(&req.text, kind).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::store::FakeStore;
    use crate::store::fake::raw;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value as JsonValue;
    use std::fs;
    use tower::ServiceExt;

    const LATEST: &str = "SELECT ?hora ?valor WHERE { } LIMIT 20";

    fn app() -> (tempfile::TempDir, Router) {
        let (dir, _store, dashboard) = dashboard();
        (dir, router(dashboard))
    }

    fn dashboard() -> (tempfile::TempDir, Arc<FakeStore>, Arc<Dashboard>) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("latest_20.rq"), LATEST).unwrap();

        let store = Arc::new(FakeStore::new());
        store.respond(
            LATEST,
            raw(
                &["hora", "valor"],
                &[&[Some("2024-01-01T00:00:00"), Some("100")]],
            ),
        );
        let config = DashboardConfig {
            queries_dir: dir.path().to_path_buf(),
            live_query_key: "latest_20".to_string(),
            live_ttl: Duration::from_secs(20),
            query_ttl: Duration::from_secs(60),
            currency_prefix: "R$".to_string(),
            session_idle_ttl: Duration::from_secs(1800),
            max_sessions: 100,
        };
        let dashboard = Arc::new(Dashboard::new(store.clone(), &config, Duration::from_secs(5)));
        (dir, store, dashboard)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json(bytes: &[u8]) -> JsonValue {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_catalog() {
        let (_dir, app) = app();
        let (status, body) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "ok");

        let (status, body) = call(&app, "GET", "/api/catalog", None).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["definitions"][0]["key"], "latest_20");
        assert_eq!(body["definitions"][0]["kind"], "time-series");
        assert_eq!(body["definitions"][0]["title"], "Latest 20");
    }

    #[tokio::test]
    async fn test_live_panel() {
        let (_dir, app) = app();
        let (status, body) = call(&app, "GET", "/api/live", None).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["render"]["type"], "time_series");
        assert_eq!(body["render"]["points"][0]["y"], 100.0);
        assert_eq!(body["render"]["points"][0]["x"], "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_session_flow_and_csv_download() {
        let (_dir, app) = app();

        let (status, _) = call(&app, "POST", "/api/sessions/s1/execute", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(
            &app,
            "POST",
            "/api/sessions/s1/select",
            Some(serde_json::json!({"key": "missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            &app,
            "POST",
            "/api/sessions/s1/select",
            Some(serde_json::json!({"key": "latest_20"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["phase"], "selected");

        let (status, body) = call(&app, "POST", "/api/sessions/s1/execute", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["phase"], "executed");

        let req = Request::builder()
            .uri("/api/sessions/s1/export.csv")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"latest_20.csv\""
        );
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"hora,valor\n"));
    }

    #[tokio::test]
    async fn test_custom_query_unknown_kind_falls_back() {
        let (_dir, app) = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/query",
            Some(serde_json::json!({"text": LATEST, "kind": "pie"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["kind"], "time-series");
        assert_eq!(body["key"], "custom");

        let (status, _) = call(
            &app,
            "POST",
            "/api/query",
            Some(serde_json::json!({"text": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_refresh_reaches_the_store_every_tick() {
        let (_dir, store, dashboard) = dashboard();
        let every = ServerConfig::default().live_refresh.unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresh = spawn_live_refresh(dashboard, every, shutdown_rx);

        tokio::time::sleep(every * 3 + Duration::from_millis(1)).await;
        // 20s live TTL: every tick, including the immediate first one, misses
        assert_eq!(store.submit_count(), 4);

        shutdown_tx.send(true).unwrap();
        refresh.await.unwrap();
    }
}
