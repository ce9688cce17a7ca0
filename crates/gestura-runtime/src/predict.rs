//! One-shot batch prediction by majority vote.

use gestura_core::{Error, Result, NO_HAND_LABEL};
use gestura_ingest::Observation;
use tracing::debug;

use crate::engine::Engine;

/// Most frequent label; ties go to the label seen first.
pub fn majority_vote<S: AsRef<str>>(labels: &[S]) -> Option<&str> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        let label = label.as_ref();
        match tally.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => tally.push((label, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (label, n) in tally {
        if best.map_or(true, |(_, b)| n > b) {
            best = Some((label, n));
        }
    }
    best.map(|(label, _)| label)
}

impl Engine {
    /// Classify every frame and return the majority label, or `no_hand`
    /// when no frame contains a hand. Does not trigger actions.
    pub fn predict_batch<P: AsRef<[u8]>>(&self, user_id: &str, payloads: &[P]) -> Result<String> {
        let model = self
            .model(user_id)?
            .ok_or_else(|| Error::ModelNotTrained(user_id.to_string()))?;

        let mut labels = Vec::with_capacity(payloads.len());
        for payload in payloads {
            if let Observation::Hand(sample) = self.normalizer().observe_as(payload.as_ref(), model.mode) {
                labels.push(model.classify(&sample)?.label);
            }
        }
        debug!(
            "Batch prediction for {}: {} of {} frames had a hand",
            user_id,
            labels.len(),
            payloads.len()
        );
        Ok(majority_vote(&labels).unwrap_or(NO_HAND_LABEL).to_string())
    }
}
