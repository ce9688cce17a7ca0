//! Shared gesture engine: store, model cache, normalizer, credentials, actions.
//!
//! One `Engine` per process, shared behind an `Arc` by HTTP handlers,
//! streaming sessions and the training worker.

use std::collections::HashSet;
use std::sync::Arc;

use gestura_core::{
    ActionId, Error, GesturaConfig, NormalizationMode, Result, TrainingSettings,
};
use gestura_infer::{ModelCache, ModelStore, UserModel};
use gestura_ingest::{
    Augmenter, CaptureReport, ExtractorHandle, LandmarkNormalizer, SampleRecorder,
};
use gestura_store::{ActionBindingRecord, GestureDeletion, SqliteStore};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::auth::{CredentialVerifier, SignedTokenVerifier};
use crate::executor::ActionRegistry;

/// One catalogue entry for `GET /api/actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionInfo {
    pub id: ActionId,
    pub registered: bool,
}

pub struct Engine {
    store: SqliteStore,
    cache: ModelCache,
    normalizer: LandmarkNormalizer,
    augmenter: Augmenter,
    verifier: Box<dyn CredentialVerifier>,
    actions: ActionRegistry,
    training: TrainingSettings,
    pub(crate) training_in_flight: Mutex<HashSet<String>>,
}

impl Engine {
    pub fn new(
        store: SqliteStore,
        normalizer: LandmarkNormalizer,
        verifier: impl CredentialVerifier + 'static,
        actions: ActionRegistry,
        training: TrainingSettings,
    ) -> Self {
        Self {
            store,
            cache: ModelCache::new(),
            normalizer,
            augmenter: Augmenter::with_variants(training.augment_variants),
            verifier: Box::new(verifier),
            actions,
            training,
            training_in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Wire an engine from configuration: signed-token credentials and the
    /// action table from `actions.json`.
    pub fn from_config(config: &GesturaConfig, store: SqliteStore, extractor: ExtractorHandle) -> Result<Self> {
        let actions = ActionRegistry::from_config(&config.data_paths.actions_file)?;
        let normalizer = LandmarkNormalizer::new(extractor, config.normalization);
        info!(
            "Engine ready: normalization={}, min_samples={}, {} actions registered",
            config.normalization,
            config.training.min_samples,
            actions.len()
        );
        Ok(Self::new(
            store,
            normalizer,
            SignedTokenVerifier::new(config.auth_secret.clone()),
            actions,
            config.training.clone(),
        ))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn normalizer(&self) -> &LandmarkNormalizer {
        &self.normalizer
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn training_settings(&self) -> &TrainingSettings {
        &self.training
    }

    pub fn capture_mode(&self) -> NormalizationMode {
        self.normalizer.mode()
    }

    /// Resolve a credential to a user id.
    pub fn authenticate(&self, token: &str) -> Result<String> {
        self.verifier.verify(token)
    }

    /// Cached model for `user_id`, loading it from the store on a miss.
    pub fn model(&self, user_id: &str) -> Result<Option<Arc<UserModel>>> {
        self.cache
            .get_or_load(user_id, || ModelStore::new(&self.store).load(user_id))
    }

    /// Store labeled frames and the gesture's action binding.
    pub fn capture<P: AsRef<[u8]>>(
        &self,
        user_id: &str,
        gesture: &str,
        action: &str,
        payloads: &[P],
    ) -> Result<CaptureReport> {
        self.capture_with_rng(user_id, gesture, action, payloads, &mut rand::thread_rng())
    }

    pub fn capture_with_rng<P: AsRef<[u8]>, R: Rng + ?Sized>(
        &self,
        user_id: &str,
        gesture: &str,
        action: &str,
        payloads: &[P],
        rng: &mut R,
    ) -> Result<CaptureReport> {
        SampleRecorder::new(&self.store, &self.normalizer, &self.augmenter).record(
            user_id,
            gesture,
            action,
            payloads.iter(),
            rng,
        )
    }

    pub fn delete_gesture(&self, user_id: &str, gesture: &str) -> Result<GestureDeletion> {
        SampleRecorder::new(&self.store, &self.normalizer, &self.augmenter)
            .delete_gesture(user_id, gesture)
    }

    pub fn action_map(&self, user_id: &str) -> Result<Vec<ActionBindingRecord>> {
        self.store.list_bindings(user_id)
    }

    /// Every known action and whether this process can run it.
    pub fn action_catalogue(&self) -> Vec<ActionInfo> {
        ActionId::all()
            .iter()
            .map(|&id| ActionInfo {
                id,
                registered: self.actions.is_registered(id),
            })
            .collect()
    }

    /// Run the action bound to `(user_id, gesture)`, if any.
    ///
    /// Returns the action that ran, or `None` when the gesture has no binding.
    pub fn trigger(&self, user_id: &str, gesture: &str) -> Result<Option<ActionId>> {
        let Some(binding) = self.store.find_binding(user_id, gesture)? else {
            return Ok(None);
        };
        let id: ActionId = binding.action.parse()?;
        self.actions.execute(id)?;
        info!("{}: gesture {} → {}", user_id, gesture, id);
        Ok(Some(id))
    }

    /// `trigger`, with failures logged instead of returned.
    pub(crate) fn trigger_logged(&self, user_id: &str, gesture: &str) -> Option<ActionId> {
        match self.trigger(user_id, gesture) {
            Ok(id) => id,
            Err(e @ Error::UnregisteredAction(_)) | Err(e @ Error::UnknownAction(_)) => {
                error!("{}: gesture {} is bound to an unusable action: {}", user_id, gesture, e);
                None
            }
            Err(e) => {
                warn!("{}: action for gesture {} failed: {}", user_id, gesture, e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gestura_ingest::JsonLandmarkExtractor;
    use tempfile::TempDir;

    pub(crate) const SECRET: &str = "test-secret";

    pub(crate) fn test_engine(actions: ActionRegistry, training: TrainingSettings) -> (Engine, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        let engine = Engine::new(
            store,
            LandmarkNormalizer::new(
                ExtractorHandle::new(JsonLandmarkExtractor),
                NormalizationMode::TranslationOnly,
            ),
            SignedTokenVerifier::new(SECRET),
            actions,
            training,
        );
        (engine, dir)
    }

    #[test]
    fn test_catalogue_marks_registered() {
        let mut actions = ActionRegistry::new();
        actions.register(ActionId::Mute, || -> Result<()> { Ok(()) });
        let (engine, _dir) = test_engine(actions, TrainingSettings::default());

        let catalogue = engine.action_catalogue();
        assert_eq!(catalogue.len(), ActionId::all().len());
        let registered: Vec<_> = catalogue.iter().filter(|a| a.registered).collect();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].id, ActionId::Mute);
    }

    #[test]
    fn test_trigger_without_binding_is_noop() {
        let (engine, _dir) = test_engine(ActionRegistry::new(), TrainingSettings::default());
        assert_eq!(engine.trigger("u1", "wave").unwrap(), None);

        engine.store().upsert_binding("u1", "wave", "Mute").unwrap();
        assert!(matches!(
            engine.trigger("u1", "wave"),
            Err(Error::UnregisteredAction(_))
        ));
        assert_eq!(engine.trigger_logged("u1", "wave"), None);
    }

    #[test]
    fn test_authenticate_uses_secret() {
        let (engine, _dir) = test_engine(ActionRegistry::new(), TrainingSettings::default());
        let token = SignedTokenVerifier::new(SECRET).issue("u1", chrono::Duration::minutes(5)).unwrap();
        assert_eq!(engine.authenticate(&token).unwrap(), "u1");
        let bad = SignedTokenVerifier::new("other").issue("u1", chrono::Duration::minutes(5)).unwrap();
        assert!(engine.authenticate(&bad).is_err());
    }
}
