//! Host-only command handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

use super::Session;

pub async fn handle_select_story(
    state: &Arc<AppState>,
    session: &Session,
    puzzle_index: i64,
) -> Option<ServerMessage> {
    tracing::info!("{} selecting puzzle {}", session.name, puzzle_index);
    match state.select_puzzle(&session.name, puzzle_index).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Puzzle selection by {} rejected: {}", session.name, e);
            Some(e.into())
        }
    }
}
