//! Dashboard HTTP surface — reviewer-facing endpoints over the pending queue.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::queue::ReviewQueue;

/// Shared state for the dashboard router.
pub struct DashboardState {
    pub queue: Arc<ReviewQueue>,
    pub api_key: String,
}

/// Assemble the dashboard's Axum router.
pub fn build_router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/reviews/pending", get(pending_handler))
        .route("/api/reviews/{id}/approve", post(approve_handler))
        .route("/api/reviews/{id}/reject", post(reject_handler))
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
struct PendingQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

async fn pending_handler(
    State(state): State<Arc<DashboardState>>,
    headers: HeaderMap,
    axum::extract::Query(query): axum::extract::Query<PendingQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_bearer(&headers, &state.api_key)?;

    let interactions = state.queue.list_pending(query.limit).await.map_err(to_response_error)?;
    Ok(Json(json!({ "reviews": interactions })))
}

#[derive(Debug, Deserialize)]
struct ApproveRequest {
    final_bubbles: Vec<String>,
    #[serde(default)]
    edit_tags: Vec<String>,
    #[serde(default)]
    quality_score: Option<i32>,
    #[serde(default)]
    notes: Option<String>,
}

async fn approve_handler(
    State(state): State<Arc<DashboardState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_bearer(&headers, &state.api_key)?;

    state
        .queue
        .approve(&id, &body.final_bubbles, &body.edit_tags, body.quality_score, body.notes.as_deref())
        .await
        .map_err(to_response_error)?;

    info!(id, "review approved via dashboard");
    Ok(Json(json!({"ok": true, "id": id})))
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    reason: String,
}

async fn reject_handler(
    State(state): State<Arc<DashboardState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_bearer(&headers, &state.api_key)?;

    state.queue.reject(&id, &body.reason).await.map_err(to_response_error)?;

    info!(id, "review rejected via dashboard");
    Ok(Json(json!({"ok": true, "id": id})))
}

/// Static bearer-token check against the configured dashboard API key.
fn verify_bearer(headers: &HeaderMap, expected: &str) -> Result<(), (StatusCode, Json<Value>)> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(t) if t == expected => Ok(()),
        _ => {
            warn!("dashboard request rejected: missing or invalid bearer token");
            Err((StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))))
        }
    }
}

fn to_response_error(e: crate::error::ReviewError) -> (StatusCode, Json<Value>) {
    let status = match e.code() {
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        "STALE_REVIEW" => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": e.to_string(), "code": e.code()})))
}
