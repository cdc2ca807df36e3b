//! # Event Bus
//!
//! Fan-out of decoded [`ServerEvent`]s to interested components with an
//! explicit subscribe/unsubscribe lifecycle.
//!
//! Subscribers implement [`EventSubscriber`] and override only the hooks
//! they care about; every other event is a no-op for them. Publication is
//! a single exhaustive dispatch, so adding a socket frame type is a compile
//! error until every call site handles it.
//!
//! Subscriptions are keyed by [`SubscriberId`] so a component can detach
//! exactly itself on teardown without disturbing other listeners.

use parking_lot::Mutex;

use crate::messaging::{
    DirectMessage, FriendRequest, Notification, OnlineUsersSnapshot, ServerError, ServerEvent,
    StatusChange,
};

/// Handle identifying one subscription, returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Receiver of bus events
///
/// Every hook defaults to a no-op; implementors override the events they
/// consume.
#[allow(unused_variables)]
pub trait EventSubscriber: Send {
    /// An encrypted direct message arrived
    fn on_direct_message(&self, message: &DirectMessage) {}
    /// A notification toast was pushed
    fn on_notification(&self, notification: &Notification) {}
    /// A friend request arrived
    fn on_friend_request(&self, request: &FriendRequest) {}
    /// A friend's presence changed
    fn on_status_change(&self, change: &StatusChange) {}
    /// The online-friends snapshot arrived
    fn on_online_users(&self, snapshot: &OnlineUsersSnapshot) {}
    /// The server reported an error
    fn on_server_error(&self, error: &ServerError) {}
}

/// Dispatches decoded socket events to registered subscribers
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Box<dyn EventSubscriber>)>,
}

impl EventBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; the returned id detaches it later
    pub fn subscribe(&self, subscriber: Box<dyn EventSubscriber>) -> SubscriberId {
        let mut inner = self.inner.lock();
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, subscriber));
        id
    }

    /// Detach a subscriber
    ///
    /// Returns whether the id was registered. Unsubscribing twice is
    /// harmless.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Deliver an event to every subscriber, in subscription order
    pub fn publish(&self, event: &ServerEvent) {
        let inner = self.inner.lock();
        for (_, subscriber) in &inner.subscribers {
            match event {
                ServerEvent::Direct(message) => subscriber.on_direct_message(message),
                ServerEvent::Notification(notification) => subscriber.on_notification(notification),
                ServerEvent::FriendRequest(request) => subscriber.on_friend_request(request),
                ServerEvent::StatusChange(change) => subscriber.on_status_change(change),
                ServerEvent::OnlineUsers(snapshot) => subscriber.on_online_users(snapshot),
                ServerEvent::ServerError(error) => subscriber.on_server_error(error),
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::NotificationStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter {
        notifications: AtomicUsize,
        directs: AtomicUsize,
    }

    struct CountingSubscriber(Arc<Counter>);

    impl EventSubscriber for CountingSubscriber {
        fn on_notification(&self, _: &Notification) {
            self.0.notifications.fetch_add(1, Ordering::SeqCst);
        }
        fn on_direct_message(&self, _: &DirectMessage) {
            self.0.directs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn notification_event() -> ServerEvent {
        ServerEvent::Notification(Notification {
            title: "t".into(),
            message: "m".into(),
            status: NotificationStatus::Info,
        })
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        bus.subscribe(Box::new(CountingSubscriber(a.clone())));
        bus.subscribe(Box::new(CountingSubscriber(b.clone())));

        bus.publish(&notification_event());

        assert_eq!(a.notifications.load(Ordering::SeqCst), 1);
        assert_eq!(b.notifications.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unhandled_events_are_noops() {
        let bus = EventBus::new();
        let counter = Arc::new(Counter::default());
        bus.subscribe(Box::new(CountingSubscriber(counter.clone())));

        bus.publish(&ServerEvent::ServerError(ServerError {
            message: "oops".into(),
        }));

        assert_eq!(counter.notifications.load(Ordering::SeqCst), 0);
        assert_eq!(counter.directs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_detaches_exactly_one() {
        let bus = EventBus::new();
        let kept = Arc::new(Counter::default());
        let dropped = Arc::new(Counter::default());

        bus.subscribe(Box::new(CountingSubscriber(kept.clone())));
        let id = bus.subscribe(Box::new(CountingSubscriber(dropped.clone())));

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&notification_event());
        assert_eq!(kept.notifications.load(Ordering::SeqCst), 1);
        assert_eq!(dropped.notifications.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_double_unsubscribe_is_harmless() {
        let bus = EventBus::new();
        let id = bus.subscribe(Box::new(CountingSubscriber(Arc::new(Counter::default()))));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
    }
}
