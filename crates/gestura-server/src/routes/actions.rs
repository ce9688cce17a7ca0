//! Action map and catalogue routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::{error_response, ApiError, AuthUser};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/actions", get(action_catalogue))
        .route("/actions/map", get(action_map))
}

/// GET /api/actions/map — the caller's gesture → action bindings.
async fn action_map(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let map = state.engine.action_map(&user_id).map_err(error_response)?;
    Ok(Json(json!({ "map": map })))
}

/// GET /api/actions — every action identifier and whether it can run here.
async fn action_catalogue(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Json<Value> {
    Json(json!({ "actions": state.engine.action_catalogue() }))
}
