//! WebSocket streaming inference: `GET /ws/predict`.
//!
//! First message `{"token": ...}`, then one `{"frame": ...}` per message.
//! Replies are `{"prediction": label}` in frame order.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use gestura_runtime::{InferenceSession, ServerMessage, SessionReply};
use tracing::{debug, error};

use crate::state::AppState;

pub async fn ws_predict(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(mut socket: WebSocket, state: Arc<AppState>) {
    let mut session = InferenceSession::new(state.engine.clone());

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => text.to_owned(),
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket receive failed: {}", e);
                break;
            }
        };

        // Extraction and action dispatch block; one message at a time keeps order.
        let handled = tokio::task::spawn_blocking(move || {
            let reply = session.handle_text(&text);
            (session, reply)
        })
        .await;
        let reply = match handled {
            Ok((s, reply)) => {
                session = s;
                reply
            }
            Err(e) => {
                error!("Session worker failed: {}", e);
                let _ = socket.send(close_frame(1011)).await;
                return;
            }
        };

        match reply {
            SessionReply::Nothing => {}
            SessionReply::Send(msg) => {
                if send_json(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
            SessionReply::Close { notice, reason } => {
                if let Some(notice) = notice {
                    let _ = send_json(&mut socket, &notice).await;
                }
                let _ = socket.send(close_frame(reason.code())).await;
                break;
            }
        }
    }

    session.close();
}

async fn send_json(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}

fn close_frame(code: u16) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: String::new().into(),
    }))
}
