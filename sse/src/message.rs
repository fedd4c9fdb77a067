use events::event_names::{NEW_ANNOUNCEMENT, NEW_USER, NOTIFICATION_UPDATED};
use serde_json::{json, Value};

/// Trait for getting the SSE event type name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Append-style event: the payload is the full user record.
    NewUser { user: Value },
    /// Invalidate-style event: the payload is informational only.
    NewAnnouncement { announcement: Value },
    /// Invalidate-style event carrying just the changed notification id.
    NotificationUpdated { notification_id: String },
}

impl Event {
    /// The JSON written to the `data:` field of the pushed event.
    pub fn payload(&self) -> Value {
        match self {
            Event::NewUser { user } => user.clone(),
            Event::NewAnnouncement { announcement } => announcement.clone(),
            Event::NotificationUpdated { notification_id } => {
                json!({ "_id": notification_id })
            }
        }
    }
}

impl EventType for Event {
    fn event_type(&self) -> &'static str {
        match self {
            Event::NewUser { .. } => NEW_USER,
            Event::NewAnnouncement { .. } => NEW_ANNOUNCEMENT,
            Event::NotificationUpdated { .. } => NOTIFICATION_UPDATED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub scope: MessageScope,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageScope {
    /// Send to every connection opened under one of these role tags
    Roles { roles: Vec<String> },
    /// Send to all connected clients
    Broadcast,
}
