//! Gestura Infer — gesture classifier, training, model persistence, model cache.
//!
//! `Trainer` fits a `Classifier` on a `TrainingSet`; `ModelStore` persists it
//! with its class list in the binary format from `codec`; `ModelCache` keeps
//! loaded `UserModel`s per user until a retrain invalidates them.

pub mod cache;
pub mod classifier;
pub mod codec;
pub mod model_store;
pub mod trainer;

pub use cache::ModelCache;
pub use classifier::{Classifier, Dense};
pub use codec::{CodecError, DecodedModel};
pub use model_store::{ModelStore, Prediction, UserModel};
pub use trainer::{Trainer, TrainerConfig, TrainedModel, TrainingReport};
