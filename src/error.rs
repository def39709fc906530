//! Error taxonomy shared by the WebSocket gateway and the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::protocol::ServerMessage;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    /// Name not on the allow-list, or a non-host attempting a host action
    #[error("{0}")]
    Unauthorized(String),

    /// Bad puzzle index, empty question or guess
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    /// No active puzzle, already solved, attempts exhausted
    #[error("{0}")]
    InvalidState(String),

    #[error("{0} is already playing in another room")]
    AlreadyInRoomElsewhere(String),

    /// A second live connection for a name that is already connected
    #[error("{0} is already connected")]
    AlreadyConnected(String),
}

impl GameError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Unauthorized(_) => "UNAUTHORIZED",
            GameError::InvalidArgument(_) => "INVALID_ARGUMENT",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::InvalidState(_) => "INVALID_STATE",
            GameError::AlreadyInRoomElsewhere(_) => "ALREADY_IN_ROOM",
            GameError::AlreadyConnected(_) => "ALREADY_CONNECTED",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GameError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GameError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::InvalidState(_)
            | GameError::AlreadyInRoomElsewhere(_)
            | GameError::AlreadyConnected(_) => StatusCode::CONFLICT,
        }
    }
}

impl From<GameError> for ServerMessage {
    fn from(e: GameError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(json!({ "code": self.code(), "error": self.to_string() })),
        )
            .into_response()
    }
}
