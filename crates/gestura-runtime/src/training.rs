//! Retraining: dataset → train → save → invalidate, one run per user at a time.

use std::sync::Arc;

use gestura_core::{Error, Result};
use gestura_infer::{ModelStore, Trainer, TrainerConfig, TrainingReport};
use gestura_ingest::DatasetBuilder;
use rand::Rng;
use serde::Serialize;
use tracing::{error, info};

use crate::engine::Engine;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrainOutcome {
    #[serde(flatten)]
    pub report: TrainingReport,
    /// Save time of the new model, unix millis.
    pub updated_at: i64,
}

/// Marks a user's retrain as in flight until dropped.
struct TrainingGuard<'a> {
    engine: &'a Engine,
    user_id: String,
}

impl<'a> TrainingGuard<'a> {
    fn acquire(engine: &'a Engine, user_id: &str) -> Result<Self> {
        let mut in_flight = engine.training_in_flight.lock();
        if !in_flight.insert(user_id.to_string()) {
            return Err(Error::TrainingInProgress(user_id.to_string()));
        }
        Ok(Self {
            engine,
            user_id: user_id.to_string(),
        })
    }
}

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.engine.training_in_flight.lock().remove(&self.user_id);
    }
}

impl Engine {
    /// Retrain `user_id` synchronously. Blocks for the whole run.
    pub fn retrain(&self, user_id: &str) -> Result<RetrainOutcome> {
        self.retrain_with_rng(user_id, &mut rand::thread_rng())
    }

    /// Retrain with a caller-supplied RNG for weight init and batch order.
    ///
    /// On any failure the previously stored and cached model stays in place.
    pub fn retrain_with_rng<R: Rng + ?Sized>(&self, user_id: &str, rng: &mut R) -> Result<RetrainOutcome> {
        let _guard = TrainingGuard::acquire(self, user_id)?;
        let settings = self.training_settings();

        let set = DatasetBuilder::new(self.store(), settings.min_samples).build(user_id)?;
        let trained = Trainer::new(TrainerConfig::from(settings)).train(&set, rng)?;

        let updated_at = ModelStore::new(self.store()).save(
            user_id,
            &trained.classifier,
            &trained.classes,
            trained.mode,
        )?;
        self.cache().invalidate(user_id);

        info!(
            "Retrained {}: {:?}, accuracy {:.3}",
            user_id, trained.report.classes, trained.report.accuracy
        );
        Ok(RetrainOutcome {
            report: trained.report,
            updated_at,
        })
    }

    pub fn is_training(&self, user_id: &str) -> bool {
        self.training_in_flight.lock().contains(user_id)
    }
}

/// Run a retrain on the blocking pool so streaming sessions keep their threads.
pub async fn retrain_in_background(engine: Arc<Engine>, user_id: String) -> Result<RetrainOutcome> {
    let user = user_id.clone();
    tokio::task::spawn_blocking(move || engine.retrain(&user))
        .await
        .map_err(|e| {
            error!("Training worker for {} panicked: {}", user_id, e);
            Error::Internal(format!("training worker failed: {}", e))
        })?
}
