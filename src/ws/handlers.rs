//! WebSocket message dispatch
//!
//! Every frame arrives with the session it came from. Handlers return the
//! direct reply for the sender, if any; room-wide events go out through the
//! connection hub.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::{host, player, Session};

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::JoinGame => player::handle_join_game(state, session).await,

        ClientMessage::PlayerReady => player::handle_set_ready(state, session, true).await,

        ClientMessage::PlayerUnready => player::handle_set_ready(state, session, false).await,

        ClientMessage::SubmitQuestion { question } => {
            player::handle_submit_question(state, session, question).await
        }

        ClientMessage::LeaveRoom => player::handle_leave_room(state, session).await,

        ClientMessage::Heartbeat => {
            state.heartbeat(&session.name).await;
            None
        }

        // Host check happens in the room, which knows who the host is
        ClientMessage::SelectStory { puzzle_index } => {
            host::handle_select_story(state, session, puzzle_index).await
        }
    }
}
