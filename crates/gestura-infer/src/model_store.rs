//! Per-user model persistence on top of the SQLite store.

use gestura_core::{
    Error, GestureClassSet, NormalizationMode, NormalizedSample, Result,
};
use gestura_store::SqliteStore;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::classifier::Classifier;
use crate::codec;

/// A loaded, ready-to-classify model.
#[derive(Debug, Clone)]
pub struct UserModel {
    pub classifier: Classifier,
    pub classes: GestureClassSet,
    pub mode: NormalizationMode,
    /// Save time, unix millis.
    pub updated_at: i64,
}

/// A classification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

impl UserModel {
    /// Most likely gesture for a sample normalized with this model's mode.
    pub fn classify(&self, sample: &NormalizedSample) -> Result<Prediction> {
        if sample.mode() != self.mode {
            return Err(Error::InvalidInput(format!(
                "sample normalized as {} but model expects {}",
                sample.mode(),
                self.mode
            )));
        }
        let (index, confidence) = self.classifier.predict(&sample.features())?;
        let label = self
            .classes
            .label(index)
            .ok_or_else(|| Error::Internal(format!("class index {} out of range", index)))?;
        Ok(Prediction {
            label: label.to_string(),
            confidence,
        })
    }
}

pub struct ModelStore<'a> {
    store: &'a SqliteStore,
}

impl<'a> ModelStore<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Serialize and persist, replacing any previous model. Returns the save time.
    pub fn save(
        &self,
        user_id: &str,
        classifier: &Classifier,
        classes: &GestureClassSet,
        mode: NormalizationMode,
    ) -> Result<i64> {
        if classifier.output_dim() != classes.len() {
            return Err(Error::Training(format!(
                "classifier has {} outputs for {} classes",
                classifier.output_dim(),
                classes.len()
            )));
        }
        let blob = codec::encode(classifier, classes, mode);
        let updated_at = self.store.upsert_model(user_id, &blob)?;
        info!(
            "Saved model for {} ({} classes, {} bytes)",
            user_id,
            classes.len(),
            blob.len()
        );
        Ok(updated_at)
    }

    /// `Ok(None)` when the user never trained; `CorruptModel` when the stored
    /// blob cannot be decoded.
    pub fn load(&self, user_id: &str) -> Result<Option<UserModel>> {
        let Some(record) = self.store.find_model(user_id)? else {
            debug!("No stored model for {}", user_id);
            return Ok(None);
        };

        let decoded = codec::decode(&record.blob).map_err(|e| {
            error!("Stored model for {} is corrupt: {}", user_id, e);
            Error::CorruptModel {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Some(UserModel {
            classifier: decoded.classifier,
            classes: decoded.classes,
            mode: decoded.mode,
            updated_at: record.updated_at,
        }))
    }

    pub fn delete(&self, user_id: &str) -> Result<bool> {
        self.store.delete_model(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gestura_core::{FEATURE_DIM, NUM_LANDMARKS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn classifier(classes: usize) -> Classifier {
        let mut rng = StdRng::seed_from_u64(2);
        Classifier::new_random(FEATURE_DIM, &[12], classes, &mut rng)
    }

    #[test]
    fn test_save_then_load() {
        let (store, _dir) = test_store();
        let models = ModelStore::new(&store);
        let classes = GestureClassSet::from_labels(["fist", "open"]);
        let clf = classifier(2);

        assert!(models.load("u1").unwrap().is_none());
        let saved_at = models
            .save("u1", &clf, &classes, NormalizationMode::TranslationOnly)
            .unwrap();

        let loaded = models.load("u1").unwrap().unwrap();
        assert_eq!(loaded.classifier, clf);
        assert_eq!(loaded.classes, classes);
        assert_eq!(loaded.updated_at, saved_at);

        let sample = NormalizedSample::from_points(
            [[0.01; 3]; NUM_LANDMARKS],
            NormalizationMode::TranslationOnly,
        );
        let prediction = loaded.classify(&sample).unwrap();
        assert!(classes.index_of(&prediction.label).is_some());

        let scaled = NormalizedSample::from_points(
            [[0.01; 3]; NUM_LANDMARKS],
            NormalizationMode::TranslationAndScale,
        );
        assert!(matches!(loaded.classify(&scaled), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_corrupt_blob_is_not_untrained() {
        let (store, _dir) = test_store();
        store.upsert_model("u1", b"garbage").unwrap();
        let err = ModelStore::new(&store).load("u1").unwrap_err();
        assert!(matches!(err, Error::CorruptModel { .. }));
    }

    #[test]
    fn test_save_rejects_mismatched_classes() {
        let (store, _dir) = test_store();
        let models = ModelStore::new(&store);
        let classes = GestureClassSet::from_labels(["a", "b", "c"]);
        assert!(models
            .save("u1", &classifier(2), &classes, NormalizationMode::TranslationOnly)
            .is_err());
        assert!(models.load("u1").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let (store, _dir) = test_store();
        let models = ModelStore::new(&store);
        let classes = GestureClassSet::from_labels(["a", "b"]);
        models
            .save("u1", &classifier(2), &classes, NormalizationMode::TranslationOnly)
            .unwrap();
        assert!(models.delete("u1").unwrap());
        assert!(models.load("u1").unwrap().is_none());
    }
}
