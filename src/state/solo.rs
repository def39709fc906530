//! Single-player sessions, keyed by a client-held token.

use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::Serialize;

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;

const TOKEN_LENGTH: usize = 32;

/// Asker recorded in solo transcripts
const SOLO_ASKER: &str = "solo";

fn generate_token() -> SessionToken {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SoloStart {
    pub session_token: SessionToken,
    pub surface: String,
    pub message: String,
    pub attempts_left: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GuessOutcome {
    pub verdict: Verdict,
    pub success: bool,
    pub message: String,
    /// Omitted once the game is over
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_left: Option<u32>,
    pub surface: String,
    /// Only on success or when the attempts run out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_guess: Option<String>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Reveal {
    pub surface: String,
    pub solution: String,
    pub attempts_used: u32,
}

impl AppState {
    /// Start (or restart) a solo game on `puzzle_index`.
    ///
    /// A known token is reused and its session reset; otherwise a new token is minted.
    pub async fn start_solo(
        &self,
        token: Option<&str>,
        puzzle_index: usize,
    ) -> GameResult<SoloStart> {
        let puzzle = self
            .puzzles
            .get(puzzle_index)
            .ok_or_else(|| GameError::NotFound(format!("Puzzle {} not found", puzzle_index)))?;

        let now = Utc::now();
        let mut sessions = self.solo_sessions.write().await;

        let token = match token {
            Some(t) if sessions.contains_key(t) => t.to_string(),
            _ => {
                self.sweep_solo_sessions(&mut sessions, now);
                generate_token()
            }
        };

        sessions.insert(
            token.clone(),
            SoloSession {
                puzzle_index,
                attempt_count: 0,
                history: Vec::new(),
                solved: false,
                last_seen: now,
            },
        );
        tracing::info!("Solo session started on puzzle {}", puzzle_index);

        Ok(SoloStart {
            session_token: token,
            surface: puzzle.surface.clone(),
            message: "Ask a question or make a guess. The judge answers yes, no or irrelevant."
                .to_string(),
            attempts_left: self.config.max_attempts,
        })
    }

    /// Judge one guess. Solving does not use up an attempt.
    pub async fn solo_guess(&self, token: &str, guess: &str) -> GameResult<GuessOutcome> {
        let guess = guess.trim();
        let max_attempts = self.config.max_attempts;

        let (puzzle_index, attempts_before, history) = {
            let sessions = self.solo_sessions.read().await;
            let session = sessions
                .get(token)
                .ok_or_else(|| GameError::InvalidState("Select a puzzle first".to_string()))?;
            if session.solved || session.attempt_count >= max_attempts {
                return Err(GameError::InvalidState("This game is over".to_string()));
            }
            (
                session.puzzle_index,
                session.attempt_count,
                session.history.clone(),
            )
        };

        if guess.is_empty() {
            return Err(GameError::InvalidArgument(
                "Enter a question or a guess".to_string(),
            ));
        }
        let puzzle = self
            .puzzles
            .get(puzzle_index)
            .ok_or_else(|| GameError::InvalidState("Select a puzzle first".to_string()))?;

        let verdict = self
            .judge
            .judge(&puzzle.surface, &puzzle.bottom, guess, &history)
            .await;

        let mut sessions = self.solo_sessions.write().await;
        let session = sessions
            .get_mut(token)
            .filter(|s| {
                s.puzzle_index == puzzle_index && s.attempt_count == attempts_before && !s.solved
            })
            .ok_or_else(|| {
                GameError::InvalidState("The game changed while judging".to_string())
            })?;
        session.last_seen = Utc::now();

        if verdict.is_solved() {
            session.solved = true;
            tracing::info!(
                "Solo puzzle {} solved after {} questions",
                puzzle_index,
                session.attempt_count
            );
            return Ok(GuessOutcome {
                verdict,
                success: true,
                message: "Congratulations! You figured it out!".to_string(),
                attempts_left: None,
                surface: puzzle.surface.clone(),
                solution: Some(puzzle.bottom.clone()),
                final_guess: Some(guess.to_string()),
                history: session.history.clone(),
            });
        }

        session.attempt_count += 1;
        session.history.push(HistoryEntry {
            asker: SOLO_ASKER.to_string(),
            question: guess.to_string(),
            verdict,
        });

        let exhausted = session.attempt_count >= max_attempts;
        let (message, attempts_left, solution) = if exhausted {
            (
                format!("Game over! You used all {} questions.", max_attempts),
                None,
                Some(puzzle.bottom.clone()),
            )
        } else {
            (
                format!("Judge: {}", verdict.as_word()),
                Some(max_attempts - session.attempt_count),
                None,
            )
        };

        Ok(GuessOutcome {
            verdict,
            success: false,
            message,
            attempts_left,
            surface: puzzle.surface.clone(),
            solution,
            final_guess: None,
            history: session.history.clone(),
        })
    }

    /// Give up and show the solution. The session stays as it is.
    pub async fn solo_reveal(&self, token: &str) -> GameResult<Reveal> {
        let sessions = self.solo_sessions.read().await;
        let session = sessions
            .get(token)
            .ok_or_else(|| GameError::InvalidState("Select a puzzle first".to_string()))?;
        let puzzle = self
            .puzzles
            .get(session.puzzle_index)
            .ok_or_else(|| GameError::InvalidState("Select a puzzle first".to_string()))?;

        Ok(Reveal {
            surface: puzzle.surface.clone(),
            solution: puzzle.bottom.clone(),
            attempts_used: session.attempt_count,
        })
    }

    fn sweep_solo_sessions(
        &self,
        sessions: &mut std::collections::HashMap<SessionToken, SoloSession>,
        now: DateTime<Utc>,
    ) {
        let Ok(ttl) = chrono::Duration::from_std(self.config.solo_session_ttl) else {
            return;
        };
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_seen < ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("Dropped {} idle solo sessions", removed);
        }
    }
}
