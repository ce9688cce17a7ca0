//! Database schema SQL.

/// Labeled samples, one row per (real or augmented) landmark vector.
pub const SAMPLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS gesture_samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    gesture TEXT NOT NULL,
    features_json TEXT NOT NULL,
    normalization TEXT NOT NULL,
    synthetic INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_samples_user ON gesture_samples(user_id);
CREATE INDEX IF NOT EXISTS idx_samples_user_gesture ON gesture_samples(user_id, gesture);
"#;

/// One trained model per user; a retrain replaces the row.
pub const MODELS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS user_models (
    user_id TEXT PRIMARY KEY,
    model_blob BLOB NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// Gesture → action bindings.
pub const BINDINGS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS gesture_actions (
    user_id TEXT NOT NULL,
    gesture TEXT NOT NULL,
    action TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, gesture)
);
"#;
