//! Player message handlers
//!
//! Handlers for room membership, readiness and questions.

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

use super::Session;

pub async fn handle_join_game(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    tracing::info!("Join request from {}", session.name);
    match state
        .join_game(&session.name, &session.connection_id)
        .await
    {
        Ok(snapshot) => Some(snapshot.into()),
        Err(e) => {
            tracing::warn!("{} could not join: {}", session.name, e);
            Some(e.into())
        }
    }
}

pub async fn handle_set_ready(
    state: &Arc<AppState>,
    session: &Session,
    ready: bool,
) -> Option<ServerMessage> {
    tracing::debug!("{} ready={}", session.name, ready);
    state.set_ready(&session.name, ready).await;
    None
}

pub async fn handle_submit_question(
    state: &Arc<AppState>,
    session: &Session,
    question: String,
) -> Option<ServerMessage> {
    tracing::info!("{} asks: {}", session.name, question);
    state.submit_question(&session.name, &question).await;
    None
}

pub async fn handle_leave_room(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    state.leave_game(&session.name).await;
    None
}
