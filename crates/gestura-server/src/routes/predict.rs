//! One-shot batch prediction route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use gestura_core::Error;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error_response, frame_payloads, ApiError, AuthUser};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/predict", post(predict))
}

#[derive(Deserialize)]
struct PredictRequest {
    #[serde(default)]
    frames: Vec<Value>,
}

/// POST /api/predict — majority label over the frames; triggers nothing.
async fn predict(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<PredictRequest>,
) -> Result<Json<Value>, ApiError> {
    let engine = state.engine.clone();
    let payloads = frame_payloads(&req.frames);

    let prediction = tokio::task::spawn_blocking(move || engine.predict_batch(&user_id, &payloads))
        .await
        .map_err(|e| error_response(Error::Internal(e.to_string())))?
        .map_err(error_response)?;

    Ok(Json(json!({ "prediction": prediction })))
}
