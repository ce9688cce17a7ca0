//! Landmark normalization: wrist-relative translation, optional bone-length scaling.

use gestura_core::{LandmarkFrame, NormalizationMode, NormalizedSample, MIDDLE_MCP, NUM_LANDMARKS, WRIST};
use tracing::debug;

use crate::extractor::ExtractorHandle;

/// Result of looking at one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Hand(NormalizedSample),
    NoHand,
}

impl Observation {
    pub fn sample(&self) -> Option<&NormalizedSample> {
        match self {
            Self::Hand(s) => Some(s),
            Self::NoHand => None,
        }
    }
}

/// Normalize a raw landmark frame.
///
/// Every keypoint is translated so the wrist sits at the origin. With
/// `TranslationAndScale`, coordinates are then divided by the wrist→middle-MCP
/// distance, unless that distance is zero.
pub fn normalize(frame: &LandmarkFrame, mode: NormalizationMode) -> NormalizedSample {
    let raw = frame.points();
    let wrist = raw[WRIST];

    let mut points = [[0.0f32; 3]; NUM_LANDMARKS];
    for (out, p) in points.iter_mut().zip(raw.iter()) {
        *out = [p[0] - wrist[0], p[1] - wrist[1], p[2] - wrist[2]];
    }

    if mode == NormalizationMode::TranslationAndScale {
        let reference = points[MIDDLE_MCP];
        let scale = (reference[0].powi(2) + reference[1].powi(2) + reference[2].powi(2)).sqrt();
        if scale > 0.0 {
            for v in points.iter_mut().flatten() {
                *v /= scale;
            }
        } else {
            debug!("Degenerate frame (zero reference bone), keeping translation-only coordinates");
        }
    }

    NormalizedSample::from_points(points, mode)
}

/// Normalizer bound to the shared pose extractor.
#[derive(Clone)]
pub struct LandmarkNormalizer {
    extractor: ExtractorHandle,
    mode: NormalizationMode,
}

impl LandmarkNormalizer {
    pub fn new(extractor: ExtractorHandle, mode: NormalizationMode) -> Self {
        Self { extractor, mode }
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Extract and normalize one frame payload with the configured mode.
    pub fn observe(&self, payload: &[u8]) -> Observation {
        self.observe_as(payload, self.mode)
    }

    /// Extract and normalize one frame payload with an explicit mode.
    pub fn observe_as(&self, payload: &[u8], mode: NormalizationMode) -> Observation {
        let frame = self.extractor.extract(payload);
        observe_frame(frame.as_ref(), mode)
    }
}

/// Normalize an already-extracted frame; absent or non-finite frames are `NoHand`.
pub fn observe_frame(frame: Option<&LandmarkFrame>, mode: NormalizationMode) -> Observation {
    match frame {
        Some(f) if f.is_finite() => {
            let sample = normalize(f, mode);
            if sample.points().iter().flatten().all(|v| v.is_finite()) {
                Observation::Hand(sample)
            } else {
                Observation::NoHand
            }
        }
        _ => Observation::NoHand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::JsonLandmarkExtractor;

    fn frame_with(wrist: [f32; 3], mcp: [f32; 3]) -> LandmarkFrame {
        let mut points = [[0.0f32; 3]; NUM_LANDMARKS];
        for (i, p) in points.iter_mut().enumerate() {
            *p = [wrist[0] + i as f32 * 0.02, wrist[1] - i as f32 * 0.01, wrist[2] + 0.001 * i as f32];
        }
        points[WRIST] = wrist;
        points[MIDDLE_MCP] = mcp;
        LandmarkFrame::new(points)
    }

    #[test]
    fn test_wrist_is_zero_in_both_modes() {
        let frames = [
            frame_with([0.5, 0.5, -0.1], [0.5, 0.3, -0.1]),
            frame_with([0.123, 0.987, 0.333], [0.2, 0.7, 0.3]),
            frame_with([-4.0, 12.5, 7.0], [1.0, 1.0, 1.0]),
        ];
        for frame in &frames {
            for mode in [
                NormalizationMode::TranslationOnly,
                NormalizationMode::TranslationAndScale,
            ] {
                let sample = normalize(frame, mode);
                assert_eq!(sample.points()[WRIST], [0.0, 0.0, 0.0]);
                assert_eq!(sample.mode(), mode);
            }
        }
    }

    #[test]
    fn test_scale_normalization_makes_reference_bone_unit_length() {
        let frame = frame_with([0.5, 0.5, 0.0], [0.5, 0.2, 0.0]);
        let sample = normalize(&frame, NormalizationMode::TranslationAndScale);
        let mcp = sample.points()[MIDDLE_MCP];
        let len = (mcp[0].powi(2) + mcp[1].powi(2) + mcp[2].powi(2)).sqrt();
        assert!((len - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_frame_skips_scaling() {
        let frame = frame_with([0.5, 0.5, 0.0], [0.5, 0.5, 0.0]);
        let scaled = normalize(&frame, NormalizationMode::TranslationAndScale);
        let translated = normalize(&frame, NormalizationMode::TranslationOnly);
        assert_eq!(scaled.points(), translated.points());
    }

    #[test]
    fn test_translation_only_preserves_offsets() {
        let frame = frame_with([0.5, 0.5, 0.0], [0.6, 0.4, 0.0]);
        let sample = normalize(&frame, NormalizationMode::TranslationOnly);
        let mcp = sample.points()[MIDDLE_MCP];
        assert!((mcp[0] - 0.1).abs() < 1e-6);
        assert!((mcp[1] + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_missing_or_non_finite_frames_are_no_hand() {
        assert_eq!(
            observe_frame(None, NormalizationMode::TranslationOnly),
            Observation::NoHand
        );
        let mut points = [[0.1f32; 3]; NUM_LANDMARKS];
        points[4] = [f32::NAN, 0.0, 0.0];
        let frame = LandmarkFrame::new(points);
        assert_eq!(
            observe_frame(Some(&frame), NormalizationMode::TranslationOnly),
            Observation::NoHand
        );
    }

    #[test]
    fn test_normalizer_uses_extractor() {
        let normalizer = LandmarkNormalizer::new(
            ExtractorHandle::new(JsonLandmarkExtractor),
            NormalizationMode::TranslationAndScale,
        );
        let frame = frame_with([0.5, 0.5, 0.0], [0.5, 0.2, 0.0]);
        let payload = serde_json::to_vec(&frame).unwrap();

        match normalizer.observe(&payload) {
            Observation::Hand(sample) => {
                assert_eq!(sample.mode(), NormalizationMode::TranslationAndScale)
            }
            Observation::NoHand => panic!("expected a hand"),
        }
        assert_eq!(normalizer.observe(b"not landmarks"), Observation::NoHand);
        assert!(normalizer
            .observe_as(&payload, NormalizationMode::TranslationOnly)
            .sample()
            .is_some());
    }
}
