//! ---
//! bakery_section: "05-http-interface"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "HTTP routes for sensors, reports, artifacts and metrics."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bakery_metrics::SharedRegistry;
use bakery_persistence::PersistenceError;
use bakery_report::{ReportError, ReportResponse, ReportService};
use bakery_sim::Reading;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
const EXPORT_DISPOSITION: &str = "attachment; filename=bakery_data.csv";

/// Shared state handed to every handler.
pub struct ApiState {
    reports: ReportService,
    metrics: Option<SharedRegistry>,
}

impl ApiState {
    pub fn new(reports: ReportService, metrics: Option<SharedRegistry>) -> Self {
        Self { reports, metrics }
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("reports", &self.reports)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    /// Address actually bound, including the resolved port when `0` was requested.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Assemble the router with CORS and request tracing applied.
pub fn build_router(state: Arc<ApiState>, cors_origins: &[String]) -> Result<Router> {
    let cors = create_cors_layer(cors_origins)?;
    Ok(Router::new()
        .route("/api/sensors", get(get_sensors))
        .route(
            "/api/generate_report",
            get(generate_report).post(generate_report),
        )
        .route("/api/export_csv", get(export_csv))
        .route("/data/:filename", get(get_artifact))
        .route("/healthz", get(healthz))
        .route("/metrics", get(get_metrics))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

fn create_cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid CORS origin {origin}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .expose_headers([header::CONTENT_DISPOSITION]))
}

/// Bind `addr` and serve the router until [`ApiServer::shutdown`] is called.
pub fn spawn_api_server(
    state: Arc<ApiState>,
    addr: SocketAddr,
    cors_origins: &[String],
) -> Result<ApiServer> {
    let router = build_router(state, cors_origins)?;

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let bound = listener
        .local_addr()
        .context("failed to read bound API address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %bound, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %bound, error = %err, "api server exited with error");
            return Err(err.into());
        }
        info!(address = %bound, "api server stopped");
        Ok(())
    });

    Ok(ApiServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    /// Kept raw; sizing rules live in the report service.
    n: Option<String>,
}

async fn get_sensors(State(state): State<Arc<ApiState>>) -> Json<Reading> {
    Json(state.reports.sample())
}

async fn generate_report(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, ApiError> {
    let response = state.reports.generate(query.n.as_deref()).await?;
    Ok(Json(response))
}

async fn export_csv(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let bytes = state.reports.export_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, EXPORT_DISPOSITION),
        ],
        bytes,
    )
        .into_response())
}

async fn get_artifact(
    State(state): State<Arc<ApiState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    match state.reports.store().read_artifact_bytes(&filename) {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], bytes).into_response()),
        Err(PersistenceError::NotFound(_) | PersistenceError::InvalidName(_)) => Err(
            ApiError::new(StatusCode::NOT_FOUND, format!("artifact {filename} not found")),
        ),
        Err(err) => {
            warn!(artifact = %filename, error = %err, "artifact read failed");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
            ))
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let Some(registry) = &state.metrics else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics disabled",
        ));
    };
    let body = bakery_metrics::encode_text(registry)
        .map_err(|err| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, bakery_metrics::text_content_type())],
        body,
    )
        .into_response())
}
