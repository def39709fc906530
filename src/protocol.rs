use crate::types::*;
use serde::{Deserialize, Serialize};

/// Inbound WebSocket frames. The tag is the event name on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGame,
    PlayerReady,
    PlayerUnready,
    /// Host picks the puzzle for the next round
    SelectStory {
        puzzle_index: i64,
    },
    SubmitQuestion {
        question: String,
    },
    LeaveRoom,
    Heartbeat,
}

/// Outbound WebSocket frames
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent only to the joining connection
    RoomJoined {
        room_id: RoomId,
        players: Vec<PlayerName>,
        host: Option<PlayerName>,
        #[serde(skip_serializing_if = "Option::is_none")]
        puzzle_index: Option<usize>,
        started: bool,
    },
    PlayerJoined {
        name: PlayerName,
    },
    PlayerLeft {
        name: PlayerName,
    },
    NewHost {
        host: PlayerName,
    },
    PlayerStatusChanged {
        name: PlayerName,
        ready: bool,
    },
    AllPlayersReady {},
    GameStarted {
        puzzle_index: usize,
        surface: String,
        current_turn: PlayerName,
    },
    QuestionAnswered {
        name: PlayerName,
        question: String,
        verdict: Verdict,
        next_turn: PlayerName,
    },
    /// Turn moved because the player holding it left the room
    TurnChanged {
        current_turn: PlayerName,
    },
    GameOver {
        winner: PlayerName,
        final_question: String,
        surface: String,
        solution: String,
    },
    Error {
        code: String,
        message: String,
    },
}

impl From<RoomSnapshot> for ServerMessage {
    fn from(s: RoomSnapshot) -> Self {
        ServerMessage::RoomJoined {
            room_id: s.room_id,
            players: s.players,
            host: s.host,
            puzzle_index: s.puzzle_index,
            started: s.started,
        }
    }
}

/// Who should receive an event produced by a room operation
#[derive(Debug, Clone, PartialEq)]
pub enum Recipients {
    /// Every current member of the room
    Room,
    /// Every current member except the named one
    AllExcept(PlayerName),
}

/// An event produced by a room operation, waiting for fan-out
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEvent {
    pub to: Recipients,
    pub msg: ServerMessage,
}

impl RoomEvent {
    pub fn to_room(msg: ServerMessage) -> Self {
        Self {
            to: Recipients::Room,
            msg,
        }
    }

    pub fn to_others(except: &str, msg: ServerMessage) -> Self {
        Self {
            to: Recipients::AllExcept(except.to_string()),
            msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_names() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"select_story","puzzle_index":2}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SelectStory { puzzle_index: 2 }));

        let msg: ClientMessage = serde_json::from_str(r#"{"t":"player_unready"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::PlayerUnready));
    }

    #[test]
    fn test_room_joined_omits_missing_puzzle() {
        let json = serde_json::to_value(ServerMessage::RoomJoined {
            room_id: "r1".to_string(),
            players: vec!["alice".to_string()],
            host: Some("alice".to_string()),
            puzzle_index: None,
            started: false,
        })
        .unwrap();

        assert_eq!(json["t"], "room_joined");
        assert!(json.get("puzzle_index").is_none());
    }

    #[test]
    fn test_all_players_ready_is_empty_object() {
        let json = serde_json::to_string(&ServerMessage::AllPlayersReady {}).unwrap();
        assert_eq!(json, r#"{"t":"all_players_ready"}"#);
    }
}
