//! Training set assembly from a user's stored samples.

use gestura_core::{
    Error, GestureClassSet, LabeledSample, NormalizationMode, Result, FEATURE_DIM,
};
use gestura_store::SqliteStore;
use ndarray::Array2;
use tracing::{debug, info};

/// Feature matrix plus class indices, ready for training.
///
/// Row `i` of `features` is labeled `labels[i]`, an index into `classes`.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub classes: GestureClassSet,
    pub features: Array2<f32>,
    pub labels: Vec<usize>,
    pub mode: NormalizationMode,
}

impl TrainingSet {
    /// Assemble a training set from labeled samples.
    ///
    /// Empty input is `NoTrainingData`; fewer than `min_samples` rows is
    /// `InsufficientTrainingData`. A `min_samples` of 0 behaves like 1.
    pub fn from_samples(user_id: &str, samples: Vec<LabeledSample>, min_samples: usize) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::NoTrainingData(user_id.to_string()));
        }
        let required = min_samples.max(1);
        if samples.len() < required {
            return Err(Error::InsufficientTrainingData {
                found: samples.len(),
                required,
            });
        }

        let mode = samples[0].sample.mode();
        if let Some(other) = samples.iter().find(|s| s.sample.mode() != mode) {
            return Err(Error::Training(format!(
                "samples for user {} mix normalization modes ({} and {}); delete and recapture",
                user_id,
                mode,
                other.sample.mode()
            )));
        }

        let classes = GestureClassSet::from_labels(samples.iter().map(|s| s.label.as_str()));

        let mut flat = Vec::with_capacity(samples.len() * FEATURE_DIM);
        let mut labels = Vec::with_capacity(samples.len());
        for s in &samples {
            let index = classes
                .index_of(&s.label)
                .ok_or_else(|| Error::Internal(format!("label {} missing from class set", s.label)))?;
            flat.extend(s.sample.features());
            labels.push(index);
        }

        let features = Array2::from_shape_vec((samples.len(), FEATURE_DIM), flat)
            .map_err(|e| Error::Internal(e.to_string()))?;

        debug!(
            "Training set for {}: {} rows, {} classes",
            user_id,
            labels.len(),
            classes.len()
        );

        Ok(Self {
            classes,
            features,
            labels,
            mode,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows per class, in class order.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }
}

/// Loads a user's samples from the store and builds a `TrainingSet`.
pub struct DatasetBuilder<'a> {
    store: &'a SqliteStore,
    min_samples: usize,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(store: &'a SqliteStore, min_samples: usize) -> Self {
        Self { store, min_samples }
    }

    pub fn build(&self, user_id: &str) -> Result<TrainingSet> {
        let samples: Vec<LabeledSample> = self
            .store
            .find_samples(user_id, None)?
            .into_iter()
            .map(|s| s.into_labeled())
            .collect();

        let set = TrainingSet::from_samples(user_id, samples, self.min_samples)?;
        info!(
            "Built dataset for {}: {} samples across {:?}",
            user_id,
            set.len(),
            set.classes.labels()
        );
        Ok(set)
    }
}
