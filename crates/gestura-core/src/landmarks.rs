//! Hand landmark frames and normalized samples.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Keypoints produced per detected hand.
pub const NUM_LANDMARKS: usize = 21;

/// Length of a flattened landmark vector (21 × xyz).
pub const FEATURE_DIM: usize = NUM_LANDMARKS * 3;

/// Wrist keypoint index.
pub const WRIST: usize = 0;

/// Middle-finger metacarpal keypoint index, the reference bone for scale normalization.
pub const MIDDLE_MCP: usize = 9;

/// Label reported for frames without a detectable hand. Never a gesture class.
pub const NO_HAND_LABEL: &str = "no_hand";

/// Raw landmarks for one camera frame, one `[x, y, z]` triple per keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: [[f32; 3]; NUM_LANDMARKS],
}

impl LandmarkFrame {
    pub fn new(points: [[f32; 3]; NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[[f32; 3]; NUM_LANDMARKS] {
        &self.points
    }

    /// Whether every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.points.iter().flatten().all(|v| v.is_finite())
    }
}

impl TryFrom<Vec<[f32; 3]>> for LandmarkFrame {
    type Error = Error;

    fn try_from(points: Vec<[f32; 3]>) -> Result<Self> {
        let len = points.len();
        let points: [[f32; 3]; NUM_LANDMARKS] = points.try_into().map_err(|_| {
            Error::Internal(format!(
                "expected {} landmarks, got {}",
                NUM_LANDMARKS, len
            ))
        })?;
        Ok(Self { points })
    }
}

/// How a frame was normalized. Features are only comparable within one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Wrist-relative translation only.
    #[default]
    TranslationOnly,
    /// Wrist-relative translation, then division by the wrist→middle-MCP distance.
    TranslationAndScale,
}

impl NormalizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TranslationOnly => "translation_only",
            Self::TranslationAndScale => "translation_and_scale",
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::TranslationOnly => 0,
            Self::TranslationAndScale => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::TranslationOnly),
            1 => Some(Self::TranslationAndScale),
            _ => None,
        }
    }
}

impl std::fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NormalizationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "translation_only" => Ok(Self::TranslationOnly),
            "translation_and_scale" => Ok(Self::TranslationAndScale),
            other => Err(Error::Config(format!("unknown normalization mode: {}", other))),
        }
    }
}

/// A wrist-anchored landmark vector. The wrist keypoint is always the zero vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSample {
    mode: NormalizationMode,
    points: [[f32; 3]; NUM_LANDMARKS],
}

impl NormalizedSample {
    /// Build a sample from already wrist-relative points.
    ///
    /// The wrist is re-anchored so the zero-wrist invariant holds for any input.
    pub fn from_points(points: [[f32; 3]; NUM_LANDMARKS], mode: NormalizationMode) -> Self {
        let wrist = points[WRIST];
        let mut anchored = points;
        for p in anchored.iter_mut() {
            for (v, w) in p.iter_mut().zip(wrist.iter()) {
                *v -= w;
            }
        }
        Self {
            mode,
            points: anchored,
        }
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    pub fn points(&self) -> &[[f32; 3]; NUM_LANDMARKS] {
        &self.points
    }

    /// Flatten to `[x0, y0, z0, x1, ...]`, the classifier's input layout.
    pub fn features(&self) -> Vec<f32> {
        self.points.iter().flatten().copied().collect()
    }
}

/// A stored training sample: normalized landmarks plus the user's gesture label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub user_id: String,
    pub label: String,
    pub sample: NormalizedSample,
}
