//! Axum JSON API: job lookup and search over the pipeline, plus CRUD for
//! tracked applications.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jobtrack_core::{ApplicationDraft, ApplicationPatch};
use jobtrack_pipeline::{JobPipeline, ParseJobRequest, SearchJobsRequest};
use jobtrack_storage::{ApplicationStore, StoreError};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobtrack-web";

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<JobPipeline>,
    pub applications: Arc<dyn ApplicationStore>,
}

impl AppState {
    pub fn new(pipeline: JobPipeline, applications: Arc<dyn ApplicationStore>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            applications,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InterviewNoteRequest {
    title: String,
    content: String,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/test", get(health_handler))
        .route("/parse-job", post(parse_job_handler))
        .route("/search-jobs", post(search_jobs_handler))
        .route("/applications", get(list_applications).post(create_application))
        .route(
            "/applications/{id}",
            get(get_application)
                .put(update_application)
                .delete(delete_application),
        )
        .route("/applications/{id}/interview-prep", post(add_interview_note))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("JOBTRACK_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let pipeline = jobtrack_pipeline::pipeline_from_env(Path::new("."))?;
    let applications = jobtrack_storage::store_from_env().await?;
    let state = AppState::new(pipeline, applications);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "job tracker api listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": "Job tracker API is running" }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "scraper_available": true }))
}

async fn parse_job_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ParseJobRequest>,
) -> Response {
    Json(state.pipeline.parse_job(&request).await).into_response()
}

async fn search_jobs_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchJobsRequest>,
) -> Response {
    Json(state.pipeline.search(&request).await).into_response()
}

async fn list_applications(State(state): State<Arc<AppState>>) -> Response {
    match state.applications.list().await {
        Ok(records) => Json(records).into_response(),
        Err(err) => store_error(err),
    }
}

async fn create_application(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ApplicationDraft>,
) -> Response {
    match state.applications.create(draft).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => store_error(err),
    }
}

async fn get_application(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return not_found(&id);
    };
    match state.applications.get(id).await {
        Ok(record) => Json(record).into_response(),
        Err(err) => store_error(err),
    }
}

async fn update_application(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(patch): Json<ApplicationPatch>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return not_found(&id);
    };
    match state.applications.update(id, patch).await {
        Ok(record) => Json(record).into_response(),
        Err(err) => store_error(err),
    }
}

async fn delete_application(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return not_found(&id);
    };
    match state.applications.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => store_error(err),
    }
}

async fn add_interview_note(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(note): Json<InterviewNoteRequest>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return not_found(&id);
    };
    match state
        .applications
        .add_interview_note(id, note.title, note.content)
        .await
    {
        Ok(record) => Json(record).into_response(),
        Err(err) => store_error(err),
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("job application not found: {id}") })),
    )
        .into_response()
}

fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(id) => not_found(&id.to_string()),
        other => {
            error!(error = %other, "application store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": other.to_string() })),
            )
                .into_response()
        }
    }
}
