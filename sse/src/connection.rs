use axum::response::sse::Event;
use dashmap::DashMap;
use log::*;
use std::collections::HashSet;
use std::convert::Infallible;
use tokio::sync::mpsc::UnboundedSender;

/// Role tag a connection was opened under (wire form, e.g. `ADMIN`).
pub type RoleTag = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection information (no redundant connection_id)
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub role: RoleTag,
    pub sender: UnboundedSender<Result<Event, Infallible>>,
}

/// Connection registry with dual indices for O(1) lookups
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: lookup by role tag for role-scoped routing - O(1)
    role_index: DashMap<RoleTag, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            role_index: DashMap::new(),
        }
    }

    /// Register a new connection - O(1)
    pub fn register(
        &self,
        role: RoleTag,
        sender: UnboundedSender<Result<Event, Infallible>>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();

        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                role: role.clone(),
                sender,
            },
        );

        self.role_index
            .entry(role)
            .or_default()
            .insert(connection_id.clone());

        connection_id
    }

    /// Unregister a connection - O(1)
    pub fn unregister(&self, connection_id: &ConnectionId) {
        if let Some((_, info)) = self.connections.remove(connection_id) {
            let role = info.role;

            if let Some(mut entry) = self.role_index.get_mut(&role) {
                entry.remove(connection_id);

                if entry.is_empty() {
                    drop(entry); // Release lock before removal
                    self.role_index.remove(&role);
                }
            }
        }
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send to every connection opened under one of `roles` - O(k) where k = matching connections.
    /// Returns the number of connections the event was handed to.
    pub fn send_to_roles(&self, roles: &[RoleTag], event: Event) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for role in roles {
            if let Some(connection_ids) = self.role_index.get(role) {
                for conn_id in connection_ids.iter() {
                    if let Some(info) = self.connections.get(conn_id) {
                        match info.sender.send(Ok(event.clone())) {
                            Ok(()) => delivered += 1,
                            Err(e) => {
                                warn!(
                                    "Failed to send event to connection {}: {}. Removing it.",
                                    conn_id.as_str(),
                                    e
                                );
                                closed.push(conn_id.clone());
                            }
                        }
                    }
                }
            }
        }
        self.prune(closed);
        delivered
    }

    /// Broadcast to all connections - O(n)
    pub fn broadcast(&self, event: Event) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for entry in self.connections.iter() {
            match entry.value().sender.send(Ok(event.clone())) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Failed to send broadcast to connection {}: {}. Removing it.",
                        entry.key().as_str(),
                        e
                    );
                    closed.push(entry.key().clone());
                }
            }
        }
        self.prune(closed);
        delivered
    }

    // Runs after iteration so no map guard is held while removing.
    fn prune(&self, closed: Vec<ConnectionId>) {
        for connection_id in closed {
            self.unregister(&connection_id);
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
