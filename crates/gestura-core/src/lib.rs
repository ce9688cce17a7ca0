//! Gestura Core — shared types, error taxonomy, configuration.

pub mod actions;
pub mod classes;
pub mod config;
pub mod error;
pub mod landmarks;

pub use actions::ActionId;
pub use classes::GestureClassSet;
pub use config::{DataPaths, GesturaConfig, TrainingSettings};
pub use error::{Error, Result};
pub use landmarks::{
    LabeledSample, LandmarkFrame, NormalizationMode, NormalizedSample, FEATURE_DIM,
    MIDDLE_MCP, NO_HAND_LABEL, NUM_LANDMARKS, WRIST,
};
