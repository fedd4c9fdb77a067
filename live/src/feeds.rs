//! Binds live event names to the reconcilers of the collections they affect.

use crate::channel::{LiveChannel, PageSubscriptions};
use domain::notification::Notification;
use domain::reconciler::ViewReconciler;
use domain::user::UserDetails;
use events::event_names::{NEW_ANNOUNCEMENT, NEW_USER, NOTIFICATION_UPDATED};
use log::*;
use serde_json::Value;

/// `new-user` appends to the users collection.
pub fn bind_users(
    channel: &LiveChannel,
    reconciler: ViewReconciler<UserDetails>,
    page: &mut PageSubscriptions,
) {
    page.push(channel.subscribe(NEW_USER, move |payload: &Value| {
        match serde_json::from_value::<UserDetails>(payload.clone()) {
            Ok(user) => {
                reconciler.on_append(user);
            }
            Err(e) => warn!("Ignoring malformed {NEW_USER} payload: {e}"),
        }
    }));
}

/// `new-announcement` and `notification-updated` both invalidate the
/// notifications collection. The payload is never applied directly.
pub fn bind_notifications(
    channel: &LiveChannel,
    reconciler: ViewReconciler<Notification>,
    page: &mut PageSubscriptions,
) {
    for event in [NEW_ANNOUNCEMENT, NOTIFICATION_UPDATED] {
        let reconciler = reconciler.clone();
        page.push(channel.subscribe(event, move |_: &Value| {
            reconciler.on_invalidate(event);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::tests::{frame, ScriptedTransport};
    use async_trait::async_trait;
    use domain::collection::SharedCollection;
    use domain::error::Error;
    use domain::reconciler::{Refetch, RefetchWorker};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    async fn wait_for_revision<T: domain::collection::Identified>(
        collection: &SharedCollection<T>,
        revision: u64,
    ) {
        let mut changes = collection.changes();
        tokio::time::timeout(
            Duration::from_secs(2),
            changes.wait_for(|current| *current >= revision),
        )
        .await
        .expect("collection did not change within 2s")
        .expect("collection dropped");
    }

    #[tokio::test]
    async fn duplicate_new_user_events_append_once() {
        let (transport, tx, _) = ScriptedTransport::new();
        let channel = LiveChannel::new(transport);
        let users = SharedCollection::default();
        let (reconciler, _commands) = ViewReconciler::new(users.clone());
        let mut page = PageSubscriptions::new("dashboard");
        bind_users(&channel, reconciler, &mut page);

        let u42 = r#"{"_id":"u42","name":{"first":"Ada","last":"Lovelace"},"email":"ada@example.com","status":"UNBLOCKED"}"#;
        tx.send(frame(NEW_USER, u42)).unwrap();
        tx.send(frame(NEW_USER, u42)).unwrap();
        tx.send(frame(NEW_USER, r#"{"_id":"u43"}"#)).unwrap();

        wait_for_revision(&users, 2).await;
        assert_eq!(users.len(), 2);
        assert!(users.contains("u42"));
        assert_eq!(users.revision(), 2);
    }

    #[tokio::test]
    async fn malformed_user_payload_is_skipped() {
        let (transport, tx, _) = ScriptedTransport::new();
        let channel = LiveChannel::new(transport);
        let users = SharedCollection::default();
        let (reconciler, _commands) = ViewReconciler::new(users.clone());
        let mut page = PageSubscriptions::new("dashboard");
        bind_users(&channel, reconciler, &mut page);

        tx.send(frame(NEW_USER, r#"{"name":"no id"}"#)).unwrap();
        tx.send(frame(NEW_USER, r#"{"_id":"u1"}"#)).unwrap();

        wait_for_revision(&users, 1).await;
        assert_eq!(users.len(), 1);
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Refetch<Notification> for CountingSource {
        async fn refetch(&self) -> Result<Vec<Notification>, Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(vec![serde_json::from_value(serde_json::json!({
                "_id": format!("n{call}"),
                "title": "Maintenance"
            }))?])
        }
    }

    #[tokio::test]
    async fn invalidations_refetch_once_per_arrival() {
        let (transport, tx, _) = ScriptedTransport::new();
        let channel = LiveChannel::new(transport);
        let notifications = SharedCollection::default();
        let (reconciler, commands) = ViewReconciler::new(notifications.clone());
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let _worker =
            RefetchWorker::new(notifications.clone(), Arc::clone(&source), commands).spawn();
        let mut page = PageSubscriptions::new("announcements");
        bind_notifications(&channel, reconciler, &mut page);

        tx.send(frame(NEW_ANNOUNCEMENT, r#"{"_id":"n9","title":"ignored"}"#))
            .unwrap();
        tx.send(frame(NOTIFICATION_UPDATED, r#"{"_id":"n1"}"#)).unwrap();

        wait_for_revision(&notifications, 2).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        // The announcement payload itself never lands in the collection.
        assert!(!notifications.contains("n9"));
        assert!(notifications.contains("n2"));
    }

    #[tokio::test]
    async fn page_teardown_unbinds_the_feeds() {
        let (transport, _tx, _) = ScriptedTransport::new();
        let channel = LiveChannel::new(transport);
        let (users, _user_commands) = ViewReconciler::new(SharedCollection::default());
        let (notifications, _commands) = ViewReconciler::new(SharedCollection::default());

        let mut page = PageSubscriptions::new("dashboard");
        bind_users(&channel, users, &mut page);
        bind_notifications(&channel, notifications, &mut page);
        assert_eq!(channel.len(), 3);

        drop(page);

        assert!(channel.is_empty());
    }
}
