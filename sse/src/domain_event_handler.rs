use crate::message::{Event as SseEvent, Message as SseMessage, MessageScope};
use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Role tags whose connections receive user-registration pushes.
pub const ADMIN_ROLE_TAGS: [&str; 2] = ["SUPER_ADMIN", "ADMIN"];

/// Handles domain events by converting them to push messages for live connections.
///
/// User registrations only matter to the admin dashboard, so they are scoped
/// to admin connections. Announcements and notification changes go to everyone.
pub struct SseDomainEventHandler {
    sse_manager: Arc<Manager>,
}

impl SseDomainEventHandler {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }

    fn to_message(event: &DomainEvent) -> SseMessage {
        match event {
            DomainEvent::UserRegistered { user } => SseMessage {
                event: SseEvent::NewUser { user: user.clone() },
                scope: MessageScope::Roles {
                    roles: ADMIN_ROLE_TAGS.iter().map(|r| r.to_string()).collect(),
                },
            },
            DomainEvent::AnnouncementPublished { announcement } => SseMessage {
                event: SseEvent::NewAnnouncement {
                    announcement: announcement.clone(),
                },
                scope: MessageScope::Broadcast,
            },
            DomainEvent::NotificationStateChanged { notification_id } => SseMessage {
                event: SseEvent::NotificationUpdated {
                    notification_id: notification_id.clone(),
                },
                scope: MessageScope::Broadcast,
            },
        }
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        debug!("Handling {} event", event.label());
        let delivered = self.sse_manager.send_message(Self::to_message(event));
        trace!("{} reached {delivered} connection(s)", event.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::EventPublisher;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn user_registration_is_scoped_to_admin_roles() {
        let message = SseDomainEventHandler::to_message(&DomainEvent::UserRegistered {
            user: json!({"_id": "u1"}),
        });
        assert_eq!(
            message.scope,
            MessageScope::Roles {
                roles: vec!["SUPER_ADMIN".to_string(), "ADMIN".to_string()]
            }
        );
    }

    #[test]
    fn announcements_and_notification_changes_are_broadcast() {
        let announcement = SseDomainEventHandler::to_message(&DomainEvent::AnnouncementPublished {
            announcement: json!({"_id": "n1"}),
        });
        let changed = SseDomainEventHandler::to_message(&DomainEvent::NotificationStateChanged {
            notification_id: "n1".to_string(),
        });
        assert_eq!(announcement.scope, MessageScope::Broadcast);
        assert_eq!(changed.scope, MessageScope::Broadcast);
    }

    #[tokio::test]
    async fn published_events_reach_registered_connections() {
        let manager = Arc::new(Manager::new());
        let (admin_tx, mut admin_rx) = mpsc::unbounded_channel();
        let (user_tx, mut user_rx) = mpsc::unbounded_channel();
        manager.register_connection("ADMIN".to_string(), admin_tx);
        manager.register_connection("USER".to_string(), user_tx);

        let publisher =
            EventPublisher::new().with_handler(Arc::new(SseDomainEventHandler::new(manager)));

        publisher
            .publish(DomainEvent::UserRegistered {
                user: json!({"_id": "u42"}),
            })
            .await;

        assert!(admin_rx.try_recv().is_ok());
        assert!(user_rx.try_recv().is_err());
    }
}
