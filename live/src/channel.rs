//! The live channel: one persistent connection shared by every page of a client.
//!
//! The connection is opened by the first `subscribe` and lives as long as any
//! clone of the [`LiveChannel`] does. Incoming frames are dispatched to the
//! handlers registered for their event name, in arrival order, on a single
//! pump task. Connection failures never reach handlers; the transport
//! reconnects on its own and dispatch resumes against the same registry, so
//! subscriptions survive a reconnect without being renewed.

use crate::transport::{Frame, FrameStream, Transport};
use dashmap::DashMap;
use futures_util::StreamExt;
use log::*;
use serde_json::Value;
use std::sync::{Arc, OnceLock, Weak};
use tokio::task::JoinHandle;

pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct Registration {
    event: String,
    handler: Handler,
}

struct Inner {
    transport: Arc<dyn Transport>,
    // Primary storage: subscription_id -> registration
    subscriptions: DashMap<SubscriptionId, Registration>,
    // Index: event name -> subscription ids, in subscription order
    by_event: DashMap<String, Vec<SubscriptionId>>,
    pump: OnceLock<JoinHandle<()>>,
}

impl Inner {
    fn dispatch(&self, frame: &Frame) -> usize {
        // Snapshot first so handlers run without any registry lock held and a
        // handler may subscribe or release from inside its own call.
        let ids = match self.by_event.get(&frame.event) {
            Some(ids) => ids.value().clone(),
            None => {
                trace!("No subscribers for {}", frame.event);
                return 0;
            }
        };
        let handlers: Vec<Handler> = ids
            .iter()
            .filter_map(|id| {
                self.subscriptions
                    .get(id)
                    .map(|registration| Arc::clone(&registration.handler))
            })
            .collect();

        let payload = serde_json::from_str(&frame.data)
            .unwrap_or_else(|_| Value::String(frame.data.clone()));
        for handler in &handlers {
            handler(&payload);
        }
        handlers.len()
    }

    fn remove(&self, id: &SubscriptionId, event: &str) {
        self.subscriptions.remove(id);
        let now_empty = match self.by_event.get_mut(event) {
            Some(mut ids) => {
                ids.retain(|other| other != id);
                ids.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_event.remove_if(event, |_, ids| ids.is_empty());
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get() {
            pump.abort();
        }
    }
}

/// Cheap to clone; every clone shares the one connection and registry.
#[derive(Clone)]
pub struct LiveChannel {
    inner: Arc<Inner>,
}

impl LiveChannel {
    pub fn new(transport: impl Transport) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport: Arc::new(transport),
                subscriptions: DashMap::new(),
                by_event: DashMap::new(),
                pump: OnceLock::new(),
            }),
        }
    }

    /// Registers `handler` for `event`, opening the connection if this is the
    /// first subscription. Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.inner.subscriptions.insert(
            id.clone(),
            Registration {
                event: event.to_string(),
                handler: Arc::new(handler),
            },
        );
        self.inner
            .by_event
            .entry(event.to_string())
            .or_default()
            .push(id.clone());
        debug!("Subscribed {} to {event}", id.as_str());

        self.ensure_started();

        Subscription {
            id,
            event: event.to_string(),
            channel: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// Drops every handler registered for `event`. Returns how many were removed.
    pub fn unsubscribe(&self, event: &str) -> usize {
        match self.inner.by_event.remove(event) {
            Some((_, ids)) => {
                for id in &ids {
                    self.inner.subscriptions.remove(id);
                }
                debug!("Unsubscribed {} handler(s) from {event}", ids.len());
                ids.len()
            }
            None => 0,
        }
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .by_event
            .get(event)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    /// Total number of live subscriptions across all event names.
    pub fn len(&self) -> usize {
        self.inner.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.subscriptions.is_empty()
    }

    /// Whether the connection has been opened.
    pub fn is_started(&self) -> bool {
        self.inner.pump.get().is_some()
    }

    /// Names with at least one subscription.
    pub fn events(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .subscriptions
            .iter()
            .map(|entry| entry.value().event.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn ensure_started(&self) {
        self.inner.pump.get_or_init(|| {
            info!("Opening live channel");
            let frames = self.inner.transport.open();
            tokio::spawn(pump(frames, Arc::downgrade(&self.inner)))
        });
    }
}

async fn pump(mut frames: FrameStream, channel: Weak<Inner>) {
    while let Some(item) = frames.next().await {
        let Some(inner) = channel.upgrade() else {
            break;
        };
        match item {
            Ok(frame) => {
                let delivered = inner.dispatch(&frame);
                trace!("Delivered {} to {delivered} handler(s)", frame.event);
            }
            Err(e) => warn!("Live channel connection lost, waiting for reconnect: {e}"),
        }
    }
    debug!("Live channel stream ended");
}

/// A registered handler. Released exactly once: by [`Subscription::release`]
/// or, failing that, on drop.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: SubscriptionId,
    event: String,
    channel: Weak<Inner>,
    released: bool,
}

impl Subscription {
    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn release(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(inner) = self.channel.upgrade() {
            inner.remove(&self.id, &self.event);
            debug!("Released {} from {}", self.id.as_str(), self.event);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// The subscriptions one page holds. Tearing the page down releases all of
/// them, so no handler outlives the collection it writes to.
pub struct PageSubscriptions {
    page: String,
    subscriptions: Vec<Subscription>,
}

impl PageSubscriptions {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            subscriptions: Vec::new(),
        }
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn release_all(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if !self.subscriptions.is_empty() {
            debug!(
                "Tearing down {} subscription(s) for {}",
                self.subscriptions.len(),
                self.page
            );
        }
        for subscription in self.subscriptions.drain(..) {
            subscription.release();
        }
    }
}

impl Drop for PageSubscriptions {
    fn drop(&mut self) {
        self.teardown();
    }
}
