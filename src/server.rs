//! REST binding for the workflow engine
//!
//! A thin front-end: every route maps one-to-one onto an engine operation.

use crate::engine::{ExecMode, Operation, Outcome, ResumeDecision, WorkflowEngine};
use crate::error::Error;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// API server exposing the engine's operations
pub struct ApiServer {
    engine: Arc<WorkflowEngine>,
    port: u16,
}

impl ApiServer {
    pub fn new(engine: WorkflowEngine, port: u16) -> Self {
        Self {
            engine: Arc::new(engine),
            port,
        }
    }

    /// Bind and serve until the process is terminated
    pub async fn start(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let app = self.build_router();

        info!("starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    fn build_router(self) -> Router {
        Router::new()
            .route("/api/v1/health", get(health))
            .route("/api/v1/instances/{id}/generate", post(generate))
            .route("/api/v1/instances/{id}/send", post(send))
            .route("/api/v1/instances/{id}/run", post(run))
            .route("/api/v1/instances/{id}/resume", post(resume))
            .route("/api/v1/instances/{id}/status", get(status))
            .route("/api/v1/instances/{id}/progress", get(progress))
            .layer(CorsLayer::permissive())
            .with_state(self.engine)
    }
}

/// Body for generate and generate-then-send
#[derive(Debug, Default, Deserialize)]
struct RunRequest {
    instructions: Option<String>,
    #[serde(default)]
    edit: bool,
    #[serde(default, rename = "async")]
    run_async: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SendRequest {
    #[serde(default, rename = "async")]
    run_async: bool,
}

#[derive(Debug, Deserialize)]
struct ResumeRequest {
    decision: ResumeDecision,
    information: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProgressQuery {
    #[serde(default)]
    full: bool,
}

type ApiResult = std::result::Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)>;

fn ok(outcome: &Outcome) -> ApiResult {
    Ok(Json(serde_json::to_value(outcome).unwrap_or(json!(null))))
}

fn fail(error: Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &error {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation(_)
        | Error::Config(_)
        | Error::ConfigMismatch { .. }
        | Error::MissingReviewConfig(_)
        | Error::NoRecipientsConfigured(_)
        | Error::BaseArtifactNotFound(_) => StatusCode::BAD_REQUEST,
        // reviewer-policy outcomes, not server faults
        Error::ReviewRejected(_) | Error::UnknownDecision(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() })))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate(
    State(engine): State<Arc<WorkflowEngine>>,
    Path(id): Path<String>,
    Json(request): Json<RunRequest>,
) -> ApiResult {
    let op = Operation::generate_only()
        .with_instructions(request.instructions)
        .with_edit(request.edit);
    let outcome = engine
        .execute(&id, op, ExecMode::from_async_flag(request.run_async))
        .await
        .map_err(fail)?;
    ok(&outcome)
}

async fn send(
    State(engine): State<Arc<WorkflowEngine>>,
    Path(id): Path<String>,
    Json(request): Json<SendRequest>,
) -> ApiResult {
    let outcome = engine
        .execute(
            &id,
            Operation::send_only(),
            ExecMode::from_async_flag(request.run_async),
        )
        .await
        .map_err(fail)?;
    ok(&outcome)
}

async fn run(
    State(engine): State<Arc<WorkflowEngine>>,
    Path(id): Path<String>,
    Json(request): Json<RunRequest>,
) -> ApiResult {
    let op = Operation::generate_then_send()
        .with_instructions(request.instructions)
        .with_edit(request.edit);
    let outcome = engine
        .execute(&id, op, ExecMode::from_async_flag(request.run_async))
        .await
        .map_err(fail)?;
    ok(&outcome)
}

async fn resume(
    State(engine): State<Arc<WorkflowEngine>>,
    Path(id): Path<String>,
    Json(request): Json<ResumeRequest>,
) -> ApiResult {
    let outcome = engine
        .resume(&id, request.decision, request.information)
        .await
        .map_err(fail)?;
    ok(&outcome)
}

async fn status(
    State(engine): State<Arc<WorkflowEngine>>,
    Path(id): Path<String>,
) -> ApiResult {
    let state = engine.status(&id).await.map_err(fail)?;
    Ok(Json(serde_json::to_value(&state).unwrap_or(json!(null))))
}

async fn progress(
    State(engine): State<Arc<WorkflowEngine>>,
    Path(id): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult {
    let entries = engine.progress(&id, query.full).await.map_err(fail)?;
    Ok(Json(serde_json::to_value(&entries).unwrap_or(json!(null))))
}
