mod lobby;
pub mod registry;
pub mod room;
mod solo;

pub use registry::RoomRegistry;
pub use room::{PendingQuestion, Room};
pub use solo::{GuessOutcome, Reveal, SoloStart};

use crate::broadcast::ConnectionHub;
use crate::config::AppConfig;
use crate::judge::Judge;
use crate::puzzles::PuzzleBank;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub puzzles: Arc<PuzzleBank>,
    pub judge: Arc<dyn Judge>,
    /// All rooms. Every room operation runs under this one write lock.
    pub registry: Arc<RwLock<RoomRegistry>>,
    /// Live WebSocket connections
    pub hub: ConnectionHub,
    pub solo_sessions: Arc<RwLock<HashMap<SessionToken, SoloSession>>>,
}

impl AppState {
    pub fn new(config: AppConfig, puzzles: PuzzleBank, judge: Arc<dyn Judge>) -> Self {
        Self {
            config: Arc::new(config),
            puzzles: Arc::new(puzzles),
            judge,
            registry: Arc::new(RwLock::new(RoomRegistry::new())),
            hub: ConnectionHub::new(),
            solo_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Room timeout as a timestamp offset
    fn room_timeout(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.room_timeout)
            .unwrap_or_else(|_| chrono::Duration::hours(1))
    }
}
