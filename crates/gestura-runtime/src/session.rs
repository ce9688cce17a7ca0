//! Streaming inference session.
//!
//! One session per connection. Messages are handled strictly in order:
//! the first carries a credential, every later one at most one frame.
//!
//! ```text
//! AwaitingAuth --valid token, model exists--> Ready --frame--> Streaming
//!      |                                        |                  |
//!      +---------- bad token / no model --------+---- disconnect --+--> Closed
//! ```

use std::sync::Arc;

use gestura_core::{Error, NO_HAND_LABEL};
use gestura_infer::UserModel;
use gestura_ingest::Observation;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::debounce::Debouncer;
use crate::engine::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAuth,
    Ready,
    Streaming,
    Closed,
}

/// An inbound message. Both fields are optional on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct ClientMessage {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub frame: Option<serde_json::Value>,
}

impl ClientMessage {
    /// Frame payload bytes: a string is taken verbatim, anything else
    /// (a landmark array) is re-encoded as JSON.
    pub fn frame_payload(&self) -> Option<Vec<u8>> {
        frame_bytes(self.frame.as_ref()?)
    }
}

/// Extractor input for one JSON frame value. `None` for null or an empty string.
pub fn frame_bytes(frame: &serde_json::Value) -> Option<Vec<u8>> {
    match frame {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone().into_bytes()),
        other => serde_json::to_vec(other).ok(),
    }
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Prediction { prediction: String },
    Error { error: String },
}

impl ServerMessage {
    pub fn prediction(label: impl Into<String>) -> Self {
        Self::Prediction {
            prediction: label.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Missing or invalid credential.
    PolicyViolation,
    /// The user has no model yet.
    Normal,
    /// The stored model could not be loaded.
    InternalError,
}

impl CloseReason {
    /// WebSocket close code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::PolicyViolation => 1008,
            Self::InternalError => 1011,
        }
    }
}

/// What the transport should do after a message.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionReply {
    Nothing,
    Send(ServerMessage),
    /// Send `notice` (if any), then close with `reason`.
    Close {
        notice: Option<ServerMessage>,
        reason: CloseReason,
    },
}

pub struct InferenceSession {
    engine: Arc<Engine>,
    state: SessionState,
    user_id: Option<String>,
    model: Option<Arc<UserModel>>,
    debouncer: Debouncer,
    dispatched: usize,
}

impl InferenceSession {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            state: SessionState::AwaitingAuth,
            user_id: None,
            model: None,
            debouncer: Debouncer::new(),
            dispatched: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Actions successfully triggered so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Handle one raw text message from the transport.
    pub fn handle_text(&mut self, text: &str) -> SessionReply {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(m) => m,
            Err(e) if self.state == SessionState::AwaitingAuth => {
                debug!("Unparseable auth message: {}", e);
                return self.reject();
            }
            Err(e) => {
                debug!("Ignoring unparseable message: {}", e);
                return SessionReply::Nothing;
            }
        };

        match self.state {
            SessionState::AwaitingAuth => self.authenticate(message.token.as_deref()),
            SessionState::Ready | SessionState::Streaming => {
                let payload = message.frame_payload();
                self.handle_frame(payload.as_deref())
            }
            SessionState::Closed => SessionReply::Nothing,
        }
    }

    /// Verify the credential and load the user's model.
    pub fn authenticate(&mut self, token: Option<&str>) -> SessionReply {
        if self.state != SessionState::AwaitingAuth {
            return SessionReply::Nothing;
        }
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return self.reject();
        };
        let user_id = match self.engine.authenticate(token) {
            Ok(u) => u,
            Err(e) => {
                info!("Session rejected: {}", e);
                return self.reject();
            }
        };

        match self.engine.model(&user_id) {
            Ok(Some(model)) => {
                info!("Session opened for {} ({} classes)", user_id, model.classes.len());
                self.model = Some(model);
                self.user_id = Some(user_id);
                self.state = SessionState::Ready;
                SessionReply::Nothing
            }
            Ok(None) => {
                info!("Session for {} closed: no trained model", user_id);
                self.state = SessionState::Closed;
                SessionReply::Close {
                    notice: Some(ServerMessage::error(Error::ModelNotTrained(user_id).to_string())),
                    reason: CloseReason::Normal,
                }
            }
            Err(e) => {
                error!("Session for {} closed: {}", user_id, e);
                self.state = SessionState::Closed;
                SessionReply::Close {
                    notice: Some(ServerMessage::error(e.to_string())),
                    reason: CloseReason::InternalError,
                }
            }
        }
    }

    /// Classify one frame. A missing payload is ignored.
    pub fn handle_frame(&mut self, payload: Option<&[u8]>) -> SessionReply {
        match self.state {
            SessionState::Ready | SessionState::Streaming => {}
            SessionState::AwaitingAuth => return self.reject(),
            SessionState::Closed => return SessionReply::Nothing,
        }
        let Some(payload) = payload else {
            return SessionReply::Nothing;
        };
        self.state = SessionState::Streaming;
        self.refresh_model();

        let Some(model) = self.model.clone() else {
            return SessionReply::Nothing;
        };

        match self.engine.normalizer().observe_as(payload, model.mode) {
            Observation::NoHand => {
                self.apply_prediction(NO_HAND_LABEL);
                SessionReply::Send(ServerMessage::prediction(NO_HAND_LABEL))
            }
            Observation::Hand(sample) => match model.classify(&sample) {
                Ok(prediction) => {
                    self.apply_prediction(&prediction.label);
                    SessionReply::Send(ServerMessage::prediction(prediction.label))
                }
                Err(e) => {
                    warn!("Classification failed: {}", e);
                    SessionReply::Send(ServerMessage::error(e.to_string()))
                }
            },
        }
    }

    /// Transport went away. Releases the model reference.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            info!(
                "Session closed for {} after {} actions",
                self.user_id.as_deref().unwrap_or("<unauthenticated>"),
                self.dispatched
            );
        }
        self.state = SessionState::Closed;
        self.model = None;
    }

    /// Debounce a prediction and trigger its action when it changed.
    fn apply_prediction(&mut self, label: &str) {
        if label == NO_HAND_LABEL {
            self.debouncer.reset();
            return;
        }
        if !self.debouncer.observe(label) {
            return;
        }
        let Some(user_id) = self.user_id.as_deref() else {
            return;
        };
        if self.engine.trigger_logged(user_id, label).is_some() {
            self.dispatched += 1;
        }
    }

    /// Pick up a retrained model. Keeps the current one if the lookup fails.
    fn refresh_model(&mut self) {
        let Some(user_id) = self.user_id.as_deref() else {
            return;
        };
        match self.engine.model(user_id) {
            Ok(Some(model)) => self.model = Some(model),
            Ok(None) => debug!("Model for {} disappeared; keeping the loaded one", user_id),
            Err(e) => warn!("Model refresh for {} failed, keeping the loaded one: {}", user_id, e),
        }
    }

    fn reject(&mut self) -> SessionReply {
        self.state = SessionState::Closed;
        SessionReply::Close {
            notice: None,
            reason: CloseReason::PolicyViolation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SignedTokenVerifier;
    use crate::engine::tests::{test_engine, SECRET};
    use crate::executor::ActionRegistry;
    use gestura_core::{ActionId, GestureClassSet, NormalizationMode, TrainingSettings, FEATURE_DIM, NUM_LANDMARKS};
    use gestura_infer::{Classifier, Dense, ModelStore};
    use ndarray::{Array1, Array2};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Fixture {
        engine: Arc<Engine>,
        mutes: Arc<AtomicUsize>,
        plays: Arc<AtomicUsize>,
        _dir: TempDir,
    }

    /// Engine with a hand-built model: keypoint 1 right of the wrist is
    /// "fist", left of it is "open". fist → Mute, open → PlayMedia.
    fn fixture() -> Fixture {
        let mutes = Arc::new(AtomicUsize::new(0));
        let plays = Arc::new(AtomicUsize::new(0));
        let mut actions = ActionRegistry::new();
        let m = mutes.clone();
        actions.register(ActionId::Mute, move || -> gestura_core::Result<()> {
            m.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let p = plays.clone();
        actions.register(ActionId::PlayMedia, move || -> gestura_core::Result<()> {
            p.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let (engine, dir) = test_engine(actions, TrainingSettings::default());
        let mut weights = Array2::zeros((FEATURE_DIM, 2));
        weights[[3, 0]] = 10.0;
        weights[[3, 1]] = -10.0;
        let classifier = Classifier::from_layers(vec![Dense {
            weights,
            bias: Array1::zeros(2),
        }])
        .unwrap();
        ModelStore::new(engine.store())
            .save(
                "u1",
                &classifier,
                &GestureClassSet::from_labels(["fist", "open"]),
                NormalizationMode::TranslationOnly,
            )
            .unwrap();
        engine.store().upsert_binding("u1", "fist", "Mute").unwrap();
        engine.store().upsert_binding("u1", "open", "PlayMedia").unwrap();

        Fixture {
            engine: Arc::new(engine),
            mutes,
            plays,
            _dir: dir,
        }
    }

    fn token(user: &str) -> String {
        SignedTokenVerifier::new(SECRET).issue(user, chrono::Duration::minutes(5)).unwrap()
    }

    fn frame_message(gesture: &str) -> String {
        if gesture == NO_HAND_LABEL {
            return serde_json::json!({ "frame": "data:image/jpeg;base64,AAAA" }).to_string();
        }
        let dx = if gesture == "fist" { 0.1 } else { -0.1 };
        let points: Vec<[f32; 3]> = (0..NUM_LANDMARKS)
            .map(|i| match i {
                0 => [0.5, 0.5, 0.0],
                1 => [0.5 + dx, 0.45, 0.0],
                _ => [0.5, 0.5 - 0.01 * i as f32, 0.0],
            })
            .collect();
        serde_json::json!({ "frame": points }).to_string()
    }

    fn predicted(reply: SessionReply) -> String {
        match reply {
            SessionReply::Send(ServerMessage::Prediction { prediction }) => prediction,
            other => panic!("expected a prediction, got {:?}", other),
        }
    }

    fn open_session(f: &Fixture) -> InferenceSession {
        let mut session = InferenceSession::new(f.engine.clone());
        let auth = serde_json::json!({ "token": token("u1") }).to_string();
        assert_eq!(session.handle_text(&auth), SessionReply::Nothing);
        assert_eq!(session.state(), SessionState::Ready);
        session
    }

    #[test]
    fn test_invalid_credentials_close_with_policy_violation() {
        let f = fixture();
        for first in [
            r#"{"token": "nope"}"#.to_string(),
            "{}".to_string(),
            "not json".to_string(),
            serde_json::json!({ "token": SignedTokenVerifier::new("x").issue("u1", chrono::Duration::minutes(1)).unwrap() })
                .to_string(),
        ] {
            let mut session = InferenceSession::new(f.engine.clone());
            let reply = session.handle_text(&first);
            assert_eq!(
                reply,
                SessionReply::Close {
                    notice: None,
                    reason: CloseReason::PolicyViolation
                }
            );
            assert_eq!(session.state(), SessionState::Closed);
        }
    }

    #[test]
    fn test_untrained_user_gets_notice_then_close() {
        let f = fixture();
        let mut session = InferenceSession::new(f.engine.clone());
        let reply = session.authenticate(Some(&token("u2")));
        assert_eq!(
            reply,
            SessionReply::Close {
                notice: Some(ServerMessage::error("Model not trained")),
                reason: CloseReason::Normal
            }
        );
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_corrupt_model_is_reported_distinctly() {
        let f = fixture();
        f.engine.store().upsert_model("u3", b"GSTM\x01").unwrap();
        let mut session = InferenceSession::new(f.engine.clone());
        match session.authenticate(Some(&token("u3"))) {
            SessionReply::Close { notice, reason } => {
                assert_eq!(reason, CloseReason::InternalError);
                assert_ne!(notice, Some(ServerMessage::error("Model not trained")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_frames_predict_and_missing_frames_are_ignored() {
        let f = fixture();
        let mut session = open_session(&f);

        assert_eq!(session.handle_text("{}"), SessionReply::Nothing);
        assert_eq!(session.handle_text(r#"{"frame": null}"#), SessionReply::Nothing);
        assert_eq!(session.handle_text("garbage"), SessionReply::Nothing);
        assert_eq!(session.state(), SessionState::Ready);

        assert_eq!(predicted(session.handle_text(&frame_message("fist"))), "fist");
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(predicted(session.handle_text(&frame_message("open"))), "open");
        assert_eq!(predicted(session.handle_text(&frame_message(NO_HAND_LABEL))), NO_HAND_LABEL);
    }

    #[test]
    fn test_debounce_from_prior_fist() {
        let f = fixture();
        let mut session = open_session(&f);
        session.debouncer = Debouncer::with_last("fist");

        for gesture in ["fist", "fist", "open", NO_HAND_LABEL, "open"] {
            predicted(session.handle_text(&frame_message(gesture)));
        }
        assert_eq!(session.dispatched(), 2);
        assert_eq!(f.mutes.load(Ordering::SeqCst), 0);
        assert_eq!(f.plays.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unbound_and_unregistered_actions_do_not_end_session() {
        let f = fixture();
        f.engine.store().delete_binding("u1", "open").unwrap();
        f.engine.store().upsert_binding("u1", "fist", "Screenshot").unwrap();
        let mut session = open_session(&f);

        assert_eq!(predicted(session.handle_text(&frame_message("fist"))), "fist");
        assert_eq!(predicted(session.handle_text(&frame_message("open"))), "open");
        assert_eq!(predicted(session.handle_text(&frame_message("fist"))), "fist");
        assert_eq!(session.dispatched(), 0);
        assert_eq!(session.state(), SessionState::Streaming);
    }

    #[test]
    fn test_close_releases_model() {
        let f = fixture();
        let mut session = open_session(&f);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.model.is_none());
        assert_eq!(session.handle_text(&frame_message("fist")), SessionReply::Nothing);
    }
}
