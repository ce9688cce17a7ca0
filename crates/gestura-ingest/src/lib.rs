//! Gestura Ingest — pose extraction handle, landmark normalization, augmentation,
//! dataset building, sample capture.

pub mod augment;
pub mod capture;
pub mod dataset;
pub mod extractor;
pub mod normalize;

pub use augment::Augmenter;
pub use capture::{CaptureReport, SampleRecorder};
pub use dataset::{DatasetBuilder, TrainingSet};
pub use extractor::{ExtractorHandle, JsonLandmarkExtractor, PoseExtractor};
pub use normalize::{normalize, observe_frame, LandmarkNormalizer, Observation};
