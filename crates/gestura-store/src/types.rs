//! Row types for samples, models and bindings.

use gestura_core::{LabeledSample, NormalizedSample};
use serde::{Deserialize, Serialize};

/// A sample to insert; `synthetic` marks augmented copies.
#[derive(Debug, Clone)]
pub struct NewSample {
    pub sample: NormalizedSample,
    pub synthetic: bool,
}

/// A sample row from the database.
#[derive(Debug, Clone)]
pub struct StoredSample {
    pub id: i64,
    pub user_id: String,
    pub gesture: String,
    pub sample: NormalizedSample,
    pub synthetic: bool,
    pub created_at: i64,
}

impl StoredSample {
    pub fn into_labeled(self) -> LabeledSample {
        LabeledSample {
            user_id: self.user_id,
            label: self.gesture,
            sample: self.sample,
        }
    }
}

/// A serialized model row.
#[derive(Debug, Clone)]
pub struct ModelRecord {
    pub user_id: String,
    pub blob: Vec<u8>,
    pub updated_at: i64,
}

/// A gesture → action binding row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBindingRecord {
    pub gesture: String,
    pub action: String,
    #[serde(skip)]
    pub updated_at: i64,
}

/// What `delete_gesture` removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureDeletion {
    pub samples_deleted: usize,
    pub binding_deleted: bool,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_samples: i64,
    pub synthetic_samples: i64,
    pub users: i64,
    pub models: i64,
    pub bindings: i64,
    pub db_path: String,
    pub db_size_mb: f64,
}
