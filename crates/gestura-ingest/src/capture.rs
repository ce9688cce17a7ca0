//! Sample capture: frames → normalized samples + augmented copies → store.

use gestura_core::{ActionId, Error, Result, NO_HAND_LABEL};
use gestura_store::{GestureDeletion, NewSample, SqliteStore};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::augment::Augmenter;
use crate::normalize::{LandmarkNormalizer, Observation};

/// Outcome of one capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureReport {
    /// Frames that contained a hand.
    pub real: usize,
    /// Augmented copies stored alongside them.
    pub synthetic: usize,
    /// Frames dropped for lack of a hand.
    pub dropped: usize,
}

impl CaptureReport {
    pub fn saved(&self) -> usize {
        self.real + self.synthetic
    }
}

/// Records labeled samples and their action binding for a user.
pub struct SampleRecorder<'a> {
    store: &'a SqliteStore,
    normalizer: &'a LandmarkNormalizer,
    augmenter: &'a Augmenter,
}

impl<'a> SampleRecorder<'a> {
    pub fn new(
        store: &'a SqliteStore,
        normalizer: &'a LandmarkNormalizer,
        augmenter: &'a Augmenter,
    ) -> Self {
        Self {
            store,
            normalizer,
            augmenter,
        }
    }

    /// Normalize every payload, augment the ones with a hand, and store them
    /// together with the gesture → action binding in one transaction.
    ///
    /// The action is validated before any frame is processed. Fails with
    /// `NoValidFrames` when no payload contains a hand.
    pub fn record<I, P, R>(
        &self,
        user_id: &str,
        gesture: &str,
        action: &str,
        payloads: I,
        rng: &mut R,
    ) -> Result<CaptureReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
        R: Rng + ?Sized,
    {
        let gesture = validate_gesture_name(gesture)?;
        let action: ActionId = action.parse()?;

        let mut samples = Vec::new();
        let mut report = CaptureReport {
            real: 0,
            synthetic: 0,
            dropped: 0,
        };

        for payload in payloads {
            match self.normalizer.observe(payload.as_ref()) {
                Observation::Hand(sample) => {
                    let copies = self.augmenter.augment(&sample, rng);
                    report.real += 1;
                    report.synthetic += copies.len();
                    samples.push(NewSample {
                        sample,
                        synthetic: false,
                    });
                    samples.extend(copies.into_iter().map(|sample| NewSample {
                        sample,
                        synthetic: true,
                    }));
                }
                Observation::NoHand => report.dropped += 1,
            }
        }

        if report.real == 0 {
            debug!(
                "Capture for {}/{} had no usable frames ({} dropped)",
                user_id, gesture, report.dropped
            );
            return Err(Error::NoValidFrames);
        }

        self.store
            .record_capture(user_id, gesture, &samples, action.as_str())?;

        info!(
            "Captured {}/{} → {}: {} real, {} synthetic, {} dropped",
            user_id,
            gesture,
            action,
            report.real,
            report.synthetic,
            report.dropped
        );
        Ok(report)
    }

    /// Remove a gesture's samples and binding. The trained model is left as is.
    pub fn delete_gesture(&self, user_id: &str, gesture: &str) -> Result<GestureDeletion> {
        let gesture = validate_gesture_name(gesture)?;
        let deletion = self.store.delete_gesture(user_id, gesture)?;
        info!(
            "Deleted gesture {}/{}: {} samples, binding removed: {}",
            user_id, gesture, deletion.samples_deleted, deletion.binding_deleted
        );
        Ok(deletion)
    }
}

fn validate_gesture_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("gesture name is empty".into()));
    }
    if trimmed.len() > 64 {
        return Err(Error::InvalidInput(format!(
            "gesture name longer than 64 bytes: {}",
            trimmed
        )));
    }
    if trimmed == NO_HAND_LABEL {
        return Err(Error::InvalidInput(format!("{} is reserved", NO_HAND_LABEL)));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractorHandle, JsonLandmarkExtractor};
    use gestura_core::{NormalizationMode, NUM_LANDMARKS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn normalizer() -> LandmarkNormalizer {
        LandmarkNormalizer::new(
            ExtractorHandle::new(JsonLandmarkExtractor),
            NormalizationMode::TranslationOnly,
        )
    }

    fn hand_payload(offset: f32) -> Vec<u8> {
        let points: Vec<[f32; 3]> = (0..NUM_LANDMARKS)
            .map(|i| [0.5 + offset + i as f32 * 0.01, 0.5 - i as f32 * 0.02, 0.0])
            .collect();
        serde_json::to_vec(&points).unwrap()
    }

    #[test]
    fn test_record_stores_real_and_synthetic_and_binding() {
        let (store, _dir) = test_store();
        let normalizer = normalizer();
        let augmenter = Augmenter::default();
        let recorder = SampleRecorder::new(&store, &normalizer, &augmenter);
        let mut rng = StdRng::seed_from_u64(3);

        let payloads = vec![hand_payload(0.0), b"no hand here".to_vec(), hand_payload(0.1)];
        let report = recorder
            .record("u1", " wave ", "volume_up", &payloads, &mut rng)
            .unwrap();

        assert_eq!(report.real, 2);
        assert_eq!(report.synthetic, 10);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.saved(), 12);

        let stored = store.find_samples("u1", Some("wave")).unwrap();
        assert_eq!(stored.len(), 12);
        assert_eq!(stored.iter().filter(|s| !s.synthetic).count(), 2);

        let binding = store.find_binding("u1", "wave").unwrap().unwrap();
        assert_eq!(binding.action, "VolumeUp");
    }

    #[test]
    fn test_record_rejects_before_storing() {
        let (store, _dir) = test_store();
        let normalizer = normalizer();
        let augmenter = Augmenter::default();
        let recorder = SampleRecorder::new(&store, &normalizer, &augmenter);
        let mut rng = StdRng::seed_from_u64(3);

        let err = recorder
            .record("u1", "wave", "Teleport", [hand_payload(0.0)], &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAction(_)));

        let err = recorder
            .record("u1", "wave", "Mute", [b"".to_vec(), b"{}".to_vec()], &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::NoValidFrames));

        let err = recorder
            .record("u1", "  ", "Mute", [hand_payload(0.0)], &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        assert_eq!(store.count_samples("u1").unwrap(), 0);
        assert!(store.find_binding("u1", "wave").unwrap().is_none());
    }

    #[test]
    fn test_delete_gesture_removes_samples_and_binding() {
        let (store, _dir) = test_store();
        let normalizer = normalizer();
        let augmenter = Augmenter::with_variants(1);
        let recorder = SampleRecorder::new(&store, &normalizer, &augmenter);
        let mut rng = StdRng::seed_from_u64(9);

        recorder
            .record("u1", "fist", "Mute", [hand_payload(0.0)], &mut rng)
            .unwrap();
        recorder
            .record("u1", "open", "PlayMedia", [hand_payload(0.2)], &mut rng)
            .unwrap();

        let deletion = recorder.delete_gesture("u1", "fist").unwrap();
        assert_eq!(deletion.samples_deleted, 2);
        assert!(deletion.binding_deleted);
        assert_eq!(store.list_gestures("u1").unwrap(), vec!["open".to_string()]);
    }
}
