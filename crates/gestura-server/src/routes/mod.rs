//! HTTP and WebSocket route handlers.

pub mod actions;
pub mod gestures;
pub mod predict;
pub mod samples;
pub mod stats;
pub mod stream;
pub mod training;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use gestura_core::Error;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/predict", get(stream::ws_predict))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(stats::routes())
        .merge(samples::routes())
        .merge(training::routes())
        .merge(gestures::routes())
        .merge(actions::routes())
        .merge(predict::routes())
}

pub type ApiError = (StatusCode, Json<Value>);

pub fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
        Error::ModelNotTrained(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::TrainingInProgress(_) => StatusCode::CONFLICT,
        e if e.is_user_recoverable() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map an engine error to a JSON error response.
pub fn error_response(e: Error) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }
    (status, Json(json!({ "error": e.to_string() })))
}

/// The user identified by the request's `Authorization: Bearer` token.
pub struct AuthUser(pub String);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| error_response(Error::InvalidCredential("missing bearer token".into())))?;

        state
            .engine
            .authenticate(token)
            .map(AuthUser)
            .map_err(error_response)
    }
}

/// Extractor payloads for a list of JSON frames. Null and empty frames
/// become empty payloads so they count as frames without a hand.
pub fn frame_payloads(frames: &[Value]) -> Vec<Vec<u8>> {
    frames
        .iter()
        .map(|f| gestura_runtime::frame_bytes(f).unwrap_or_default())
        .collect()
}
