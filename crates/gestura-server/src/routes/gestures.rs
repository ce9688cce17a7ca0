//! Gesture management routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use gestura_core::Error;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error_response, ApiError, AuthUser};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/gestures", get(list_gestures))
        .route("/gestures/delete", post(delete_gesture))
}

#[derive(Deserialize)]
struct DeleteGestureRequest {
    gesture_name: String,
}

/// GET /api/gestures — gestures with stored samples, the sample total and
/// the save time of the current model.
async fn list_gestures(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let engine = state.engine.clone();
    let (gestures, total, model) = tokio::task::spawn_blocking(move || -> Result<_, Error> {
        let gestures = engine.store().list_gestures(&user_id)?;
        let total = engine.store().count_samples(&user_id)?;
        // A stored model that fails to decode is an error, not "untrained".
        let model = engine.model(&user_id)?;
        Ok((gestures, total, model))
    })
    .await
    .map_err(|e| error_response(Error::Internal(e.to_string())))?
    .map_err(error_response)?;

    Ok(Json(json!({
        "gestures": gestures,
        "samples": total,
        "modelUpdatedAt": model.map(|m| m.updated_at),
    })))
}

/// POST /api/gestures/delete — drop a gesture's samples and action binding.
async fn delete_gesture(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<DeleteGestureRequest>,
) -> Result<Json<Value>, ApiError> {
    let engine = state.engine.clone();
    let deletion = tokio::task::spawn_blocking(move || engine.delete_gesture(&user_id, &req.gesture_name))
        .await
        .map_err(|e| error_response(Error::Internal(e.to_string())))?
        .map_err(error_response)?;

    Ok(Json(json!({
        "response": "Gesture deleted. Retrain model.",
        "samplesDeleted": deletion.samples_deleted,
        "bindingDeleted": deletion.binding_deleted,
    })))
}

#[cfg(test)]
mod tests {
    use crate::routes::tests::{call, hand, test_state};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_gestures_reports_samples_and_model() {
        let (state, _dir) = test_state();
        let (status, body) = call(&state, "GET", "/api/gestures", Some("alice"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gestures"], json!([]));
        assert!(body["modelUpdatedAt"].is_null());

        let frames = json!([hand(1.0, 0.0)]);
        call(
            &state,
            "POST",
            "/api/samples",
            Some("alice"),
            Some(json!({ "gesture_name": "wave", "action": "Mute", "frames": frames })),
        )
        .await;
        let (_, body) = call(&state, "GET", "/api/gestures", Some("alice"), None).await;
        assert_eq!(body["gestures"], json!(["wave"]));
        assert_eq!(body["samples"], 6);
    }

    #[tokio::test]
    async fn test_corrupt_model_is_not_reported_as_untrained() {
        let (state, _dir) = test_state();
        state.engine.store().upsert_model("alice", b"garbage").unwrap();

        let (status, body) = call(&state, "GET", "/api/gestures", Some("alice"), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("Corrupt model"));

        // Other users are unaffected.
        let (status, _) = call(&state, "GET", "/api/gestures", Some("bob"), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
