//! Model retraining route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use gestura_runtime::retrain_in_background;
use serde_json::{json, Value};

use super::{error_response, ApiError, AuthUser};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/model/retrain", post(retrain_model))
}

/// POST /api/model/retrain — train on every stored sample and replace the model.
async fn retrain_model(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let outcome = retrain_in_background(state.engine.clone(), user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Model trained",
        "classes": outcome.report.classes,
        "samples": outcome.report.samples,
        "epochs": outcome.report.epochs,
        "accuracy": outcome.report.accuracy,
        "loss": outcome.report.loss,
        "updatedAt": outcome.updated_at,
    })))
}
