//! Gestura Runtime — credentials, action dispatch, streaming inference
//! sessions, retraining, batch prediction.
//!
//! `Engine` owns the shared components; `InferenceSession` drives one
//! streaming connection against it.

pub mod auth;
pub mod debounce;
pub mod engine;
pub mod executor;
pub mod predict;
pub mod session;
pub mod training;

pub use auth::{CredentialVerifier, SignedTokenVerifier};
pub use debounce::Debouncer;
pub use engine::{ActionInfo, Engine};
pub use executor::{Action, ActionRegistry, CommandAction};
pub use predict::majority_vote;
pub use session::{
    frame_bytes, ClientMessage, CloseReason, InferenceSession, ServerMessage, SessionReply, SessionState,
};
pub use training::{retrain_in_background, RetrainOutcome};
