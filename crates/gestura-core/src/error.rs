//! Error types for Gestura.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No training data found for user {0}")]
    NoTrainingData(String),

    #[error("Not enough samples: found {found}, need at least {required}")]
    InsufficientTrainingData { found: usize, required: usize },

    #[error("Model not trained")]
    ModelNotTrained(String),

    #[error("Corrupt model for user {user_id}: {reason}")]
    CorruptModel { user_id: String, reason: String },

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("No executor registered for action {0}")]
    UnregisteredAction(String),

    #[error("Action {action} failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("No valid hand detected")]
    NoValidFrames,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Training already in progress for user {0}")]
    TrainingInProgress(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a streaming session must close after reporting this error.
    pub fn is_session_terminating(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredential(_) | Self::ModelNotTrained(_) | Self::CorruptModel { .. }
        )
    }

    /// Whether the caller can fix this by collecting or changing their own data.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoTrainingData(_)
                | Self::InsufficientTrainingData { .. }
                | Self::ModelNotTrained(_)
                | Self::UnknownAction(_)
                | Self::NoValidFrames
                | Self::InvalidInput(_)
                | Self::TrainingInProgress(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
