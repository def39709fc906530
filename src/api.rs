//! HTTP API endpoints.
//!
//! Login check for the multiplayer lobby, plus the whole single-player game.
//! Solo sessions are identified by the `x-session-token` header.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::state::{AppState, GuessOutcome, Reveal, SoloStart};

pub const SESSION_HEADER: &str = "x-session-token";

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn require_session(headers: &HeaderMap) -> GameResult<&str> {
    session_token(headers)
        .ok_or_else(|| GameError::InvalidState("Select a puzzle first".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub name: String,
}

/// Check a display name against the allow-list.
///
/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> GameResult<Json<LoginResponse>> {
    let name = state.config.allow_list.authorize(&req.name).map_err(|e| {
        tracing::warn!("Login rejected: {}", e);
        e
    })?;
    tracing::info!("Login accepted for {}", name);
    Ok(Json(LoginResponse { name }))
}

/// (index, title) for every puzzle.
///
/// GET /api/puzzles
pub async fn list_puzzles(State(state): State<Arc<AppState>>) -> Json<Vec<(usize, String)>> {
    Json(state.puzzles.titles())
}

/// Start or restart a solo game.
///
/// GET /api/puzzle/{id}
pub async fn start_puzzle(
    State(state): State<Arc<AppState>>,
    Path(puzzle_index): Path<usize>,
    headers: HeaderMap,
) -> GameResult<Json<SoloStart>> {
    let start = state
        .start_solo(session_token(&headers), puzzle_index)
        .await?;
    Ok(Json(start))
}

#[derive(Debug, Deserialize)]
pub struct GuessRequest {
    #[serde(default)]
    pub guess: String,
}

/// POST /api/guess
pub async fn guess(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<GuessRequest>,
) -> GameResult<Json<GuessOutcome>> {
    let token = require_session(&headers)?;
    let outcome = state.solo_guess(token, &req.guess).await?;
    Ok(Json(outcome))
}

/// GET /api/reveal
pub async fn reveal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> GameResult<Json<Reveal>> {
    let token = require_session(&headers)?;
    Ok(Json(state.solo_reveal(token).await?))
}
