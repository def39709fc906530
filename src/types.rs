use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoomId = String;
pub type ConnectionId = String;
pub type PlayerName = String;
pub type SessionToken = String;

/// A single lateral thinking puzzle.
///
/// `surface` is the public prompt, `bottom` the hidden solution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Puzzle {
    pub title: String,
    pub surface: String,
    pub bottom: String,
}

/// The judge's categorical answer to a question
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Solved,
    Yes,
    No,
    Irrelevant,
}

impl Verdict {
    /// Parse raw judge output.
    ///
    /// The `SUCCESS` marker anywhere in the text wins. Otherwise the trimmed
    /// text must be exactly one of the known answers (English or Chinese),
    /// ignoring case and any surrounding quotes or punctuation. Anything else is
    /// treated as irrelevant so raw model output never leaks further.
    pub fn parse(raw: &str) -> Self {
        if raw.contains(SOLVED_MARKER) {
            return Verdict::Solved;
        }

        let cleaned = raw.trim_matches(|c: char| {
            c.is_whitespace()
                || matches!(
                    c,
                    '"' | '\'' | '“' | '”' | '「' | '」' | '`' | '.' | '!' | '。' | '！'
                )
        });

        match cleaned.to_lowercase().as_str() {
            "yes" | "是" => Verdict::Yes,
            "no" | "否" => Verdict::No,
            "irrelevant" | "无关" => Verdict::Irrelevant,
            other => {
                tracing::warn!(
                    "Unparseable judge response ({} chars), using Irrelevant",
                    other.chars().count()
                );
                Verdict::Irrelevant
            }
        }
    }

    pub fn is_solved(self) -> bool {
        self == Verdict::Solved
    }

    /// Word used for this verdict in judge transcripts
    pub fn as_word(self) -> &'static str {
        match self {
            Verdict::Solved => SOLVED_MARKER,
            Verdict::Yes => "YES",
            Verdict::No => "NO",
            Verdict::Irrelevant => "IRRELEVANT",
        }
    }
}

/// Token the judge emits when the guess reconstructs the full story
pub const SOLVED_MARKER: &str = "SUCCESS";

/// One answered question in a multiplayer round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub asker: PlayerName,
    pub question: String,
    pub verdict: Verdict,
}

/// A member of a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: PlayerName,
    pub connection_id: ConnectionId,
    pub ready: bool,
    pub last_active_at: DateTime<Utc>,
}

/// Point-in-time view of a room, sent to a joining player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub players: Vec<PlayerName>,
    pub host: Option<PlayerName>,
    pub puzzle_index: Option<usize>,
    pub started: bool,
}

/// Single-player game state, keyed by a client token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoloSession {
    pub puzzle_index: usize,
    pub attempt_count: u32,
    /// Non-solving guesses, oldest first
    pub history: Vec<HistoryEntry>,
    pub solved: bool,
    pub last_seen: DateTime<Utc>,
}
