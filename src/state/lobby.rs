//! Multiplayer room operations, as driven by the WebSocket gateway.
//!
//! Each operation takes the registry write lock, mutates one room
//! synchronously, and fans the resulting events out to the room's current
//! members before the lock is released, so every connection sees events in
//! the order they happened.

use chrono::Utc;

use super::room::PendingQuestion;
use super::{AppState, RoomRegistry};
use crate::error::{GameError, GameResult};
use crate::protocol::RoomEvent;
use crate::types::*;

impl AppState {
    /// Matchmake `name` into a room (or back into its own room) on this connection
    pub async fn join_game(&self, name: &str, connection_id: &str) -> GameResult<RoomSnapshot> {
        let now = Utc::now();
        let mut registry = self.registry.write().await;
        registry.sweep_expired(now);

        let room_id = registry.find_or_create_room_for(name);
        let (snapshot, events) = registry.join(&room_id, name, connection_id, now)?;
        tracing::info!(
            "{} joined room {} ({} players)",
            name,
            room_id,
            snapshot.players.len()
        );

        self.deliver(&registry, &room_id, events).await;
        Ok(snapshot)
    }

    /// Remove `name` from its room. No-op if it is in none.
    pub async fn leave_game(&self, name: &str) {
        let mut registry = self.registry.write().await;
        self.leave_locked(&mut registry, name).await;
    }

    async fn leave_locked(&self, registry: &mut RoomRegistry, name: &str) {
        let Some((room_id, events)) = registry.leave(name, Utc::now(), self.room_timeout()) else {
            return;
        };
        tracing::info!("{} left room {}", name, room_id);

        // The leaver is no longer a member, so player_left only reaches the others
        self.deliver(registry, &room_id, events).await;
    }

    /// Connection closed: leave the room, unless the name was rebound to a
    /// newer connection in the meantime
    pub async fn disconnect(&self, connection_id: &str) {
        let Some(name) = self.hub.unregister(connection_id).await else {
            return;
        };
        tracing::info!("Connection {} for {} closed", connection_id, name);

        let mut registry = self.registry.write().await;
        let bound_here = registry
            .room_containing(&name)
            .and_then(|room_id| registry.get(room_id))
            .and_then(|room| room.player(&name))
            .is_some_and(|p| p.connection_id == connection_id);

        if bound_here {
            self.leave_locked(&mut registry, &name).await;
        } else {
            // Still sweep, disconnects are the main trigger for expiry
            registry.sweep_expired(Utc::now());
        }
    }

    pub async fn set_ready(&self, name: &str, ready: bool) {
        let mut registry = self.registry.write().await;
        let Some(room_id) = registry.room_containing(name).cloned() else {
            return;
        };
        let events = match registry.get_mut(&room_id) {
            Some(room) => {
                room.touch(name, Utc::now());
                room.set_ready(name, ready)
            }
            None => return,
        };
        self.deliver(&registry, &room_id, events).await;
    }

    pub async fn heartbeat(&self, name: &str) {
        let mut registry = self.registry.write().await;
        let Some(room_id) = registry.room_containing(name).cloned() else {
            return;
        };
        if let Some(room) = registry.get_mut(&room_id) {
            room.touch(name, Utc::now());
        }
    }

    /// Host starts a round with the given puzzle
    pub async fn select_puzzle(&self, name: &str, puzzle_index: i64) -> GameResult<()> {
        let mut registry = self.registry.write().await;
        let room_id = registry
            .room_containing(name)
            .cloned()
            .ok_or_else(|| GameError::InvalidState("Join a room first".to_string()))?;
        let room = registry
            .get_mut(&room_id)
            .ok_or_else(|| GameError::NotFound(format!("Room {} not found", room_id)))?;

        room.touch(name, Utc::now());
        let events = room.select_puzzle(name, puzzle_index, &self.puzzles)?;
        self.deliver(&registry, &room_id, events).await;
        Ok(())
    }

    /// Ask a question on `name`'s turn.
    ///
    /// The judge runs with no lock held. Out-of-turn questions, empty text,
    /// or a question while another is being judged are dropped silently.
    pub async fn submit_question(&self, name: &str, question: &str) {
        let Some(pending) = self.begin_question(name, question).await else {
            tracing::debug!("Ignoring question from {}", name);
            return;
        };

        let verdict = self
            .judge
            .judge(
                &pending.puzzle.surface,
                &pending.puzzle.bottom,
                &pending.question,
                &pending.history,
            )
            .await;

        let mut registry = self.registry.write().await;
        let applied = registry
            .get_mut(&pending.room_id)
            .and_then(|room| room.apply_verdict(&pending, verdict));

        match applied {
            Some(events) => self.deliver(&registry, &pending.room_id, events).await,
            None => tracing::warn!(
                "Discarding {:?} for {} in room {}: room moved on",
                verdict,
                pending.asker,
                pending.room_id
            ),
        }
    }

    async fn begin_question(&self, name: &str, question: &str) -> Option<PendingQuestion> {
        let mut registry = self.registry.write().await;
        let room_id = registry.room_containing(name)?.clone();
        let room = registry.get_mut(&room_id)?;
        room.touch(name, Utc::now());
        room.begin_question(name, question, &self.puzzles)
    }

    /// Send events to the room's current members. Call with the registry lock held.
    async fn deliver(&self, registry: &RoomRegistry, room_id: &str, events: Vec<RoomEvent>) {
        for event in events {
            let recipients = registry.recipients(room_id, &event.to);
            tracing::debug!(
                "Room {} -> {} connections: {:?}",
                room_id,
                recipients.len(),
                event.msg
            );
            self.hub.send_many(&recipients, &event.msg).await;
        }
    }
}
