//! Inbound message ingestion — POST /inbound.
//!
//! Accepts a JSON payload describing one incoming chat-platform message,
//! authenticates it with the same bearer token the dashboard uses, then
//! forks on the cognitive router's (C5) verdict: fast-path commands are
//! answered immediately over the transport, everything else is handed to
//! the activity tracker (C2) to be batched and fed into the slow pipeline.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use nadia_core::{ChatTransport, Route, UserId};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/inbound", post(inbound_handler))
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    user_id: String,
    text: String,
}

async fn inbound_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<InboundMessage>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_bearer_token(&headers, &state.config.dashboard.api_key).map_err(|e| {
        warn!(error = %e, "rejected inbound message");
        (StatusCode::UNAUTHORIZED, Json(json!({"error": e})))
    })?;

    let user_id = UserId::from(body.user_id);

    match state.router.route(&body.text) {
        Route::Fast => {
            info!(user = %user_id, "fast-path command");
            let peer = state
                .resolver
                .ensure_resolved(&user_id)
                .await
                .map_err(|e| internal_error(&e))?;
            state
                .transport
                .send_message(&peer, "working on it")
                .await
                .map_err(|e| internal_error(&e))?;
            Ok(Json(json!({"route": "fast"})))
        }
        Route::Slow => {
            state
                .tracker
                .handle_message(user_id, body.text)
                .await
                .map_err(|e| internal_error(&e))?;
            Ok(Json(json!({"route": "slow"})))
        }
    }
}

fn verify_bearer_token(headers: &HeaderMap, expected: &str) -> Result<(), String> {
    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Authorization header".to_string())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| "Authorization header must use Bearer scheme".to_string())?;

    if token == expected {
        Ok(())
    } else {
        Err("bearer token mismatch".to_string())
    }
}

fn internal_error(e: &impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
}
