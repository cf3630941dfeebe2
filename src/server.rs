use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use metrics::counter;
use std::sync::Arc;

use crate::engine::{ModelRegistry, ReloadReport};
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::types::{Analysis, FeedbackRecord, RespondBatchRequest, RespondRequest};

const DASHBOARD_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    models: ModelRegistry,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, models: ModelRegistry) -> Self {
        Self { pipeline, models }
    }
}

pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            PipelineError::Validation(_) | PipelineError::NoValidInput => StatusCode::BAD_REQUEST,
            PipelineError::Store(_) | PipelineError::Model(_) => {
                tracing::error!(error = %self.0, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/respond", post(respond_handler))
        .route("/api/respond_batch", post(respond_batch_handler))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/models/reload", post(reload_handler))
        .with_state(state)
}

#[tracing::instrument(skip(state, request))]
async fn respond_handler(
    State(state): State<AppState>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<Analysis>, ApiError> {
    counter!("feedback_requests_total", "endpoint" => "respond").increment(1);
    let analysis = state.pipeline.respond(request.customer_text.as_ref()).await?;
    Ok(Json(analysis))
}

#[tracing::instrument(skip(state, request))]
async fn respond_batch_handler(
    State(state): State<AppState>,
    Json(request): Json<RespondBatchRequest>,
) -> Result<Json<Vec<Analysis>>, ApiError> {
    counter!("feedback_requests_total", "endpoint" => "respond_batch").increment(1);
    let results = state
        .pipeline
        .process_batch(request.customer_texts.as_ref())
        .await?;
    Ok(Json(results))
}

async fn dashboard_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedbackRecord>>, ApiError> {
    Ok(Json(state.pipeline.store().recent(DASHBOARD_LIMIT).await?))
}

async fn reload_handler(State(state): State<AppState>) -> Result<Json<ReloadReport>, ApiError> {
    tracing::info!("Reloading model artifacts");
    Ok(Json(state.models.reload().await?))
}
