//! Stats and server info routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/server-info", get(get_server_info))
}

/// GET /api/stats — storage statistics.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let engine = &state.engine;
    let store_stats = engine.store().get_stats().unwrap_or_else(|e| {
        tracing::warn!("Failed to read store stats: {}", e);
        gestura_store::StoreStats {
            total_samples: 0,
            synthetic_samples: 0,
            users: 0,
            models: 0,
            bindings: 0,
            db_path: String::new(),
            db_size_mb: 0.0,
        }
    });

    Json(serde_json::json!({
        "samples": store_stats.total_samples,
        "syntheticSamples": store_stats.synthetic_samples,
        "users": store_stats.users,
        "models": store_stats.models,
        "bindings": store_stats.bindings,
        "dbSizeMb": store_stats.db_size_mb,
        "cachedModels": engine.cache().len(),
        "registeredActions": engine.actions().len(),
    }))
}

/// GET /api/server-info — listening port and capture settings.
async fn get_server_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(serde_json::json!({
        "port": config.port,
        "normalization": config.normalization.as_str(),
        "minSamples": config.training.min_samples,
        "augmentVariants": config.training.augment_variants,
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    }))
}
