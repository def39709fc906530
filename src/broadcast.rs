//! Outbound fan-out to live WebSocket connections.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::{ConnectionId, PlayerName};

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

struct Connection {
    name: PlayerName,
    outbox: Outbox,
}

/// Live connections and the name each one logged in with
#[derive(Clone, Default)]
pub struct ConnectionHub {
    connections: Arc<RwLock<HashMap<ConnectionId, Connection>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a display name. Fails if the name already has a
    /// live connection.
    pub async fn register(
        &self,
        connection_id: &str,
        name: &str,
        outbox: Outbox,
    ) -> GameResult<()> {
        let mut connections = self.connections.write().await;

        // Drop bindings whose socket task is gone but never unregistered
        connections.retain(|_, c| !c.outbox.is_closed());

        if connections.values().any(|c| c.name == name) {
            return Err(GameError::AlreadyConnected(name.to_string()));
        }
        connections.insert(
            connection_id.to_string(),
            Connection {
                name: name.to_string(),
                outbox,
            },
        );
        tracing::debug!("Registered connection {} for {}", connection_id, name);
        Ok(())
    }

    /// Remove a connection, returning the name it was bound to
    pub async fn unregister(&self, connection_id: &str) -> Option<PlayerName> {
        self.connections
            .write()
            .await
            .remove(connection_id)
            .map(|c| c.name)
    }

    #[cfg(test)]
    pub async fn name_of(&self, connection_id: &str) -> Option<PlayerName> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .map(|c| c.name.clone())
    }

    pub async fn send_many(&self, connection_ids: &[ConnectionId], msg: &ServerMessage) {
        let connections = self.connections.read().await;
        for id in connection_ids {
            if let Some(conn) = connections.get(id) {
                // Closed queues mean the socket is going away
                let _ = conn.outbox.send(msg.clone());
            }
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}
