//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::response::api_success;
use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::error::{CandorError, CandorResult};
use crate::protocol_constants::{APP_NAME, SERVICE_ID};
use crate::scoring::{summarize, JobRole, JobRoleWeights};

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .route("/api/session/{id}/start", post(start_session))
        .route("/api/session/{id}/stop", post(stop_session))
        .route(
            "/api/session/{id}/calculate-final-scores",
            post(calculate_final_scores),
        )
        .route("/api/session/{id}/final-scores", get(final_scores))
        .route("/api/session/{id}/live", get(live_session))
        .route("/api/session/{id}/summary", get(session_summary))
        .route("/api/job-roles", post(create_job_role))
        .route("/api/job-roles/{id}", get(get_job_role))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health probe; clients identify the engine by the service id.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "service": SERVICE_ID,
        "name": APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.session_manager.session_count(),
        "ws_connections": state.ws_manager.connection_count(),
    }))
}

#[derive(Deserialize)]
struct StartSessionRequest {
    user_id: String,
    #[serde(default)]
    job_role_id: Option<String>,
}

async fn start_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<StartSessionRequest>,
) -> CandorResult<impl IntoResponse> {
    if request.user_id.is_empty() {
        return Err(CandorError::InvalidRequest("user_id is required".into()));
    }
    state.session_manager.start(
        &session_id,
        &request.user_id,
        request.job_role_id.as_deref(),
    )?;
    Ok(api_success(json!({
        "success": true,
        "session_id": session_id,
    })))
}

async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> CandorResult<impl IntoResponse> {
    state.session_manager.stop(&session_id).await?;
    Ok(api_success(json!({
        "success": true,
        "session_id": session_id,
    })))
}

#[derive(Deserialize)]
struct FinalizeRequest {
    user_id: String,
    #[serde(default)]
    job_role_id: Option<String>,
}

/// Directly invokes aggregation, bypassing the stop path. Used for sessions
/// that were closed without a graceful stop.
async fn calculate_final_scores(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<FinalizeRequest>,
) -> CandorResult<impl IntoResponse> {
    let score = state
        .session_manager
        .aggregator()
        .finalize(
            &session_id,
            &request.user_id,
            request.job_role_id.as_deref(),
        )
        .await?;
    Ok(api_success(score))
}

async fn final_scores(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> CandorResult<impl IntoResponse> {
    let score = state.session_manager.aggregator().final_score(&session_id).await?;
    Ok(api_success(score))
}

/// Last known sample and lifecycle state of a live session.
async fn live_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> CandorResult<impl IntoResponse> {
    let view = state
        .session_manager
        .lookup(&session_id)
        .ok_or(CandorError::SessionNotFound(session_id))?;
    Ok(api_success(view))
}

/// Post-hoc summary over the session's persisted samples.
async fn session_summary(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> CandorResult<impl IntoResponse> {
    let samples = state.store.list_samples(&session_id).await?;
    if samples.is_empty() && !state.session_manager.is_active(&session_id) {
        return Err(CandorError::SessionNotFound(session_id));
    }
    Ok(api_success(summarize(&samples)))
}

#[derive(Deserialize)]
struct CreateJobRoleRequest {
    name: String,
    weights: JobRoleWeights,
}

/// Creates a job role; weights are normalized to sum to 100 here (and only
/// here - finalization consumes stored weights as-given).
async fn create_job_role(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRoleRequest>,
) -> CandorResult<impl IntoResponse> {
    if request.name.is_empty() {
        return Err(CandorError::InvalidRequest("name is required".into()));
    }
    let role = JobRole::create(request.name, request.weights);
    state.store.create_job_role(&role).await?;
    Ok(api_success(role))
}

async fn get_job_role(
    State(state): State<AppState>,
    Path(job_role_id): Path<String>,
) -> CandorResult<impl IntoResponse> {
    let role = state
        .store
        .get_job_role(&job_role_id)
        .await?
        .ok_or(CandorError::JobRoleNotFound(job_role_id))?;
    Ok(api_success(role))
}
