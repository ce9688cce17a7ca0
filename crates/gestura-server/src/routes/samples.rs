//! Sample capture routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error_response, frame_payloads, ApiError, AuthUser};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/samples", post(save_samples))
}

#[derive(Deserialize)]
struct SaveSamplesRequest {
    gesture_name: String,
    action: String,
    #[serde(default)]
    frames: Vec<Value>,
}

/// POST /api/samples — extract, normalize, augment and store a batch of frames.
async fn save_samples(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SaveSamplesRequest>,
) -> Result<Json<Value>, ApiError> {
    let engine = state.engine.clone();
    let payloads = frame_payloads(&req.frames);

    // Pose extraction holds an exclusive lock; keep it off the async workers.
    let report = tokio::task::spawn_blocking(move || {
        engine.capture(&user_id, &req.gesture_name, &req.action, &payloads)
    })
    .await
    .map_err(|e| error_response(gestura_core::Error::Internal(e.to_string())))?
    .map_err(error_response)?;

    Ok(Json(json!({
        "message": format!("{} frames saved", report.saved()),
        "saved": report.saved(),
        "real": report.real,
        "synthetic": report.synthetic,
        "dropped": report.dropped,
    })))
}
