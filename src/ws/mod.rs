pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{ConnectionId, PlayerName};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub name: Option<String>,
}

/// Identity of one authenticated WebSocket connection
#[derive(Debug, Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub name: PlayerName,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: name={:?}", params.name);

    let name = state
        .config
        .allow_list
        .authorize(params.name.as_deref().unwrap_or_default());

    ws.on_upgrade(move |socket| async move {
        match name {
            Ok(name) => handle_socket(socket, name, state).await,
            Err(e) => {
                tracing::warn!("Rejected WebSocket login: {}", e);
                reject(socket, e).await;
            }
        }
    })
}

/// Send a single error frame and close
async fn reject(mut socket: WebSocket, error: GameError) {
    if let Ok(json) = serde_json::to_string(&ServerMessage::from(error)) {
        let _ = socket.send(Message::Text(json.into())).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, name: PlayerName, state: Arc<AppState>) {
    let session = Session {
        connection_id: ulid::Ulid::new().to_string(),
        name,
    };

    // Room events for this connection are queued here by the hub
    let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerMessage>();
    if let Err(e) = state
        .hub
        .register(&session.connection_id, &session.name, outbox)
        .await
    {
        tracing::warn!("Rejected WebSocket login: {}", e);
        reject(socket, e).await;
        return;
    }

    tracing::info!(
        "WebSocket connected: {} ({})",
        session.name,
        session.connection_id
    );

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Room events fanned out to this connection
            queued = inbox.recv() => {
                let Some(msg) = queued else { break };
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", session.name, text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &session, &state).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    message: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if let Ok(json) = serde_json::to_string(&response) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    tracing::error!("Failed to send response");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by {}", session.name);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.disconnect(&session.connection_id).await;
    tracing::info!("WebSocket connection closed for {}", session.name);
}
