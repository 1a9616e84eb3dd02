//! WebSocket chat channel: one independent conversation per connection.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conversation::{Collector, ConversationState};
use crate::error::ChannelError;

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Message from client → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Message { content: String },
    Restart,
}

/// Message from server → client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    /// Opening prompt, sent on connect and after a restart.
    Prompt { content: String },
    /// Reply to one answer, with the phase the conversation is now in.
    Response { content: String, phase: String },
    Error { message: String },
}

/// Axum handler state (cloneable).
#[derive(Clone)]
struct ChatState {
    collector: Arc<Collector>,
}

// ── Routes ──────────────────────────────────────────────────────────────

/// Build the chat router: `GET /ws/chat` and `GET /api/health`.
pub fn chat_routes(collector: Arc<Collector>) -> Router {
    Router::new()
        .route("/ws/chat", get(ws_chat_handler))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(ChatState { collector })
}

/// Serve the chat router on `listener` until the server stops.
pub async fn serve(listener: TcpListener, collector: Arc<Collector>) -> Result<(), ChannelError> {
    let addr = listener.local_addr()?;
    info!(%addr, "Chat WebSocket server started");
    axum::serve(listener, chat_routes(collector))
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: "ws".to_string(),
            reason: e.to_string(),
        })
}

async fn health(State(state): State<ChatState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "runner": state.collector.runner_name(),
    }))
}

async fn ws_chat_handler(ws: WebSocketUpgrade, State(state): State<ChatState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_chat_socket(socket, state.collector))
}

// ── WebSocket Handler ───────────────────────────────────────────────────

async fn handle_chat_socket(mut socket: WebSocket, collector: Arc<Collector>) {
    let session = Uuid::new_v4();
    info!(%session, "Chat client connected");

    let mut state = ConversationState::new();

    let opening = ServerMessage::Prompt {
        content: collector.opening_prompt(),
    };
    if send(&mut socket, &opening).await.is_err() {
        return;
    }

    while let Some(result) = socket.recv().await {
        let reply = match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Message { content }) => {
                    let content = collector.submit_answer(&mut state, &content).await;
                    ServerMessage::Response {
                        content,
                        phase: state.phase().to_string(),
                    }
                }
                Ok(ClientMessage::Restart) => {
                    debug!(%session, "Conversation restarted");
                    state.reset();
                    ServerMessage::Prompt {
                        content: collector.opening_prompt(),
                    }
                }
                Err(e) => {
                    debug!(%session, error = %e, "Invalid JSON from chat client");
                    ServerMessage::Error {
                        message: format!("Invalid message: {e}"),
                    }
                }
            },
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(%session, error = %e, "Chat WebSocket error");
                break;
            }
        };

        if send(&mut socket, &reply).await.is_err() {
            debug!(%session, "Chat client disconnected during send");
            break;
        }
    }

    info!(%session, phase = %state.phase(), "Chat connection closed");
}

async fn send(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), ChannelError> {
    let json = serde_json::to_string(msg).map_err(|e| ChannelError::InvalidMessage(e.to_string()))?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ChannelError::SendFailed {
            name: "ws".to_string(),
            reason: e.to_string(),
        })
}
