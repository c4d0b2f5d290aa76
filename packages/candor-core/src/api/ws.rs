//! WebSocket handler for the bidirectional event socket.
//!
//! Producers push `video_frame`/`audio_data` events; observers receive
//! `analysis_update` broadcasts for the sessions they joined. A null frame,
//! a null/stop audio payload, an explicit `leave_session`, or a socket
//! disconnect all stop the session.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::{SplitSink, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::api::AppState;
use crate::error::{CandorError, ErrorCode};
use crate::events::{AnalysisEvent, BroadcastEvent};
use crate::media::{decode_jpeg_frame, AudioChunk};

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Message Types
// ─────────────────────────────────────────────────────────────────────────────

/// Incoming WebSocket message envelope.
#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WsIncoming {
    JoinSession {
        session_id: String,
    },
    LeaveSession {
        session_id: String,
    },
    VideoFrame {
        session_id: String,
        /// Base64-encoded JPEG, or null to stop the session.
        frame: Option<String>,
    },
    AudioData {
        session_id: String,
        /// Float32 PCM, or null to stop the session.
        audio: Option<Vec<f32>>,
        #[serde(default)]
        sample_rate: Option<u32>,
        #[serde(default)]
        is_stop_signal: bool,
    },
}

/// Axum handler upgrading the connection.
pub async fn ws_handler(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let guard = state.ws_manager.register();
    let (mut sink, mut stream) = socket.split();
    let mut events = state.event_bridge.subscribe();
    // Sessions this connection has joined; updates for other sessions are
    // not forwarded.
    let mut joined: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            _ = guard.cancel_token().cancelled() => {
                log::info!("[WS] {} force-closed", guard.id());
                break;
            }
            event = events.recv() => match event {
                Ok(BroadcastEvent::Analysis(AnalysisEvent::Update { session_id, timestamp, analysis }))
                    if joined.contains(&session_id) =>
                {
                    let payload = json!({
                        "event": "analysis_update",
                        "session_id": session_id,
                        "timestamp": timestamp,
                        "analysis": analysis,
                    });
                    if send_json(&mut sink, payload).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("[WS] {} lagged by {} events", guard.id(), n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if handle_incoming(&state, &mut sink, &mut joined, text.as_str()).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary/ping/pong ignored
                Some(Err(e)) => {
                    log::debug!("[WS] {} receive error: {}", guard.id(), e);
                    break;
                }
            }
        }
    }

    // Client disconnect stops every session this connection joined.
    for session_id in joined {
        if state.session_manager.is_active(&session_id) {
            log::info!(
                "[WS] {} disconnected; stopping session {}",
                guard.id(),
                session_id
            );
            if let Err(e) = state.session_manager.stop(&session_id).await {
                log::warn!("[WS] Stop after disconnect failed for {}: {}", session_id, e);
            }
        }
    }
}

type WsSink = SplitSink<WebSocket, Message>;

async fn send_json(sink: &mut WsSink, payload: serde_json::Value) -> Result<(), axum::Error> {
    sink.send(Message::Text(payload.to_string().into())).await
}

async fn send_error(
    sink: &mut WsSink,
    code: &str,
    message: impl std::fmt::Display,
) -> Result<(), axum::Error> {
    send_json(
        sink,
        json!({
            "event": "error",
            "code": code,
            "message": message.to_string(),
        }),
    )
    .await
}

/// Dispatches one inbound socket message. Returns Err only when the socket
/// itself is broken; protocol-level problems are reported as error events.
async fn handle_incoming(
    state: &AppState,
    sink: &mut WsSink,
    joined: &mut HashSet<String>,
    text: &str,
) -> Result<(), axum::Error> {
    let incoming: WsIncoming = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return send_error(sink, "invalid_request", format!("unrecognized event: {e}")).await;
        }
    };

    match incoming {
        WsIncoming::JoinSession { session_id } => {
            let analysis_active = state.session_manager.is_active(&session_id);
            joined.insert(session_id.clone());
            send_json(
                sink,
                json!({
                    "event": "session_joined",
                    "session_id": session_id,
                    "analysis_active": analysis_active,
                }),
            )
            .await?;
        }
        WsIncoming::LeaveSession { session_id } => {
            joined.remove(&session_id);
            stop_session(state, &session_id).await;
        }
        WsIncoming::VideoFrame { session_id, frame } => {
            let Some(payload) = frame else {
                stop_session(state, &session_id).await;
                return Ok(());
            };
            match decode_jpeg_frame(&payload) {
                Ok(frame) => {
                    // A racing Stop makes the session unknown; drop silently.
                    let _ = state.session_manager.offer_video(&session_id, frame);
                }
                Err(e) => {
                    send_error(sink, e.code(), e).await?;
                }
            }
        }
        WsIncoming::AudioData {
            session_id,
            audio,
            sample_rate,
            is_stop_signal,
        } => {
            let Some(samples) = audio else {
                stop_session(state, &session_id).await;
                return Ok(());
            };
            if is_stop_signal {
                stop_session(state, &session_id).await;
                return Ok(());
            }
            let Some(rate) = sample_rate else {
                return send_error(
                    sink,
                    "bad_audio_payload",
                    "sample_rate is required with audio data",
                )
                .await;
            };
            match AudioChunk::new(samples, rate) {
                Ok(chunk) => {
                    let _ = state.session_manager.offer_audio(&session_id, chunk);
                }
                Err(e) => {
                    send_error(sink, e.code(), e).await?;
                }
            }
        }
    }
    Ok(())
}

/// Stop triggered from the socket path; an unknown session is a benign race.
async fn stop_session(state: &AppState, session_id: &str) {
    match state.session_manager.stop(session_id).await {
        Ok(()) => {}
        Err(CandorError::SessionNotFound(_)) => {}
        Err(e) => log::warn!("[WS] Stop failed for {}: {}", session_id, e),
    }
}
