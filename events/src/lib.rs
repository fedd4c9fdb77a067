//! Event system infrastructure for the portal.
//!
//! This crate decouples the code that learns about a change (an upstream
//! hook, a controller) from the infrastructure that fans the change out to
//! live clients (the push hub).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing every change that live clients care about
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//! - **event_names**: Live channel event names shared by server and clients
//!
//! This crate has no dependencies on internal crates. Entity data is carried as
//! serialized JSON values so the upstream payload reaches clients untouched.

pub mod event_names;

use async_trait::async_trait;
use log::*;
use serde_json::Value;
use std::sync::Arc;

/// Changes announced by the upstream API that live clients must learn about.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A new user account was registered.
    /// Admin dashboards append the user to their user table.
    UserRegistered {
        /// Complete serialized user record (carries its `_id`).
        user: Value,
    },
    /// An announcement was published to every user.
    /// Notification views refetch their authoritative list.
    AnnouncementPublished {
        /// Serialized announcement as returned by the upstream API.
        announcement: Value,
    },
    /// Read-state or content of an existing notification changed.
    /// Notification views refetch, since seen-by lists are computed upstream.
    NotificationStateChanged {
        /// Upstream `_id` of the changed notification.
        notification_id: String,
    },
}

impl DomainEvent {
    /// Short label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            DomainEvent::UserRegistered { .. } => "user_registered",
            DomainEvent::AnnouncementPublished { .. } => "announcement_published",
            DomainEvent::NotificationStateChanged { .. } => "notification_state_changed",
        }
    }
}

/// Trait for handling domain events.
/// Implementations can perform side effects like pushing to live connections,
/// logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish an event to all registered handlers, in registration order.
    pub async fn publish(&self, event: DomainEvent) {
        debug!(
            "Publishing {} to {} handler(s)",
            event.label(),
            self.handlers.len()
        );
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
