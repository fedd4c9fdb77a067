use crate::connection::{ConnectionId, ConnectionRegistry, RoleTag};
use crate::message::{EventType, Message as SseMessage, MessageScope};
use axum::response::sse::Event;
use log::*;
use std::sync::Arc;

pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Register a new connection and return its unique ID
    pub fn register_connection(
        &self,
        role: RoleTag,
        sender: tokio::sync::mpsc::UnboundedSender<Result<Event, std::convert::Infallible>>,
    ) -> ConnectionId {
        let connection_id = self.registry.register(role.clone(), sender);
        info!(
            "Registered live connection {} ({role})",
            connection_id.as_str()
        );
        connection_id
    }

    /// Unregister a connection by ID
    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        info!("Unregistering live connection {}", connection_id.as_str());
        self.registry.unregister(connection_id);
    }

    /// Number of open live connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Send a message based on its scope.
    /// Returns how many connections the event was handed to.
    pub fn send_message(&self, message: SseMessage) -> usize {
        let event_type = message.event.event_type();

        let event_data = match serde_json::to_string(&message.event.payload()) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {event_type} payload: {e}");
                return 0;
            }
        };

        let event = Event::default().event(event_type).data(event_data);

        let delivered = match message.scope {
            MessageScope::Roles { roles } => self.registry.send_to_roles(&roles, event),
            MessageScope::Broadcast => self.registry.broadcast(event),
        };
        debug!("Pushed {event_type} to {delivered} connection(s)");
        delivered
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Event as SseEvent;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn send_message_routes_by_scope() {
        let manager = Manager::new();
        let (admin_tx, mut admin_rx) = mpsc::unbounded_channel();
        let (user_tx, mut user_rx) = mpsc::unbounded_channel();
        manager.register_connection("ADMIN".to_string(), admin_tx);
        manager.register_connection("USER".to_string(), user_tx);

        let delivered = manager.send_message(SseMessage {
            event: SseEvent::NewUser {
                user: json!({"_id": "u1"}),
            },
            scope: MessageScope::Roles {
                roles: vec!["ADMIN".to_string()],
            },
        });
        assert_eq!(delivered, 1);
        assert!(admin_rx.try_recv().is_ok());
        assert!(user_rx.try_recv().is_err());

        let delivered = manager.send_message(SseMessage {
            event: SseEvent::NewAnnouncement {
                announcement: json!({"_id": "n1"}),
            },
            scope: MessageScope::Broadcast,
        });
        assert_eq!(delivered, 2);
    }

    #[test]
    fn unregister_connection_stops_delivery() {
        let manager = Manager::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = manager.register_connection("USER".to_string(), tx);
        assert_eq!(manager.connection_count(), 1);

        manager.unregister_connection(&id);

        assert_eq!(manager.connection_count(), 0);
        manager.send_message(SseMessage {
            event: SseEvent::NotificationUpdated {
                notification_id: "n1".to_string(),
            },
            scope: MessageScope::Broadcast,
        });
        assert!(rx.try_recv().is_err());
    }
}
