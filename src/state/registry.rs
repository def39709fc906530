//! Room directory: creation, matchmaking, membership and expiry.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use super::room::Room;
use crate::error::{GameError, GameResult};
use crate::protocol::{Recipients, RoomEvent};
use crate::types::*;

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    /// Creation order, for oldest-first matchmaking
    order: Vec<RoomId>,
    /// name -> room the name currently belongs to
    members: HashMap<PlayerName, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Room the name is currently a member of
    pub fn room_containing(&self, name: &str) -> Option<&RoomId> {
        self.members.get(name)
    }

    /// Matchmaking: the room the name already belongs to, else the oldest
    /// room with exactly one player and no round running, else a new room.
    pub fn find_or_create_room_for(&mut self, name: &str) -> RoomId {
        if let Some(room_id) = self.members.get(name) {
            return room_id.clone();
        }

        let waiting = self
            .order
            .iter()
            .find(|id| self.rooms.get(*id).is_some_and(|r| r.is_waiting()));
        if let Some(room_id) = waiting {
            return room_id.clone();
        }

        let room_id = ulid::Ulid::new().to_string();
        tracing::info!("Created room {} for {}", room_id, name);
        self.rooms.insert(room_id.clone(), Room::new(room_id.clone()));
        self.order.push(room_id.clone());
        room_id
    }

    /// Join a specific room. A name belongs to at most one room.
    pub fn join(
        &mut self,
        room_id: &str,
        name: &str,
        connection_id: &str,
        now: DateTime<Utc>,
    ) -> GameResult<(RoomSnapshot, Vec<RoomEvent>)> {
        if let Some(current) = self.members.get(name) {
            if current != room_id {
                return Err(GameError::AlreadyInRoomElsewhere(name.to_string()));
            }
        }
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::NotFound(format!("Room {} not found", room_id)))?;

        let joined = room.join(name, connection_id, now);
        self.members.insert(name.to_string(), room_id.to_string());
        Ok(joined)
    }

    /// Remove the name from whatever room it is in, then sweep expired rooms.
    /// Returns the room left and its events, or None if the name was in no room.
    pub fn leave(
        &mut self,
        name: &str,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Option<(RoomId, Vec<RoomEvent>)> {
        let left = self.members.remove(name).map(|room_id| {
            let events = match self.rooms.get_mut(&room_id) {
                Some(room) => room.leave(name, now, timeout),
                None => Vec::new(),
            };
            (room_id, events)
        });

        self.sweep_expired(now);
        left
    }

    /// Drop every empty room whose expiry has passed. Returns how many were removed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.rooms.len();
        self.rooms
            .retain(|_, room| !(room.is_empty() && room.is_expired(now)));
        let removed = before - self.rooms.len();

        if removed > 0 {
            let rooms = &self.rooms;
            self.order.retain(|id| rooms.contains_key(id));
            tracing::info!("Swept {} expired rooms", removed);
        }
        removed
    }

    /// Connection ids an event should be delivered to
    pub fn recipients(&self, room_id: &str, to: &Recipients) -> Vec<ConnectionId> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        room.players()
            .iter()
            .filter(|p| match to {
                Recipients::Room => true,
                Recipients::AllExcept(name) => &p.name != name,
            })
            .map(|p| p.connection_id.clone())
            .collect()
    }
}
