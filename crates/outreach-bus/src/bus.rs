// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic-keyed broadcast hub.
//!
//! Delivery is best effort and at-most-once. Each topic owns a bounded
//! `tokio::sync::broadcast` channel: a subscriber that falls more than
//! `capacity` events behind loses the oldest ones and is told how many it
//! missed, while the publisher and every other subscriber are unaffected.

use std::collections::HashMap;
use std::future::Future;

use strum::IntoEnumIterator;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{BusEvent, Topic};

/// In-process publish/subscribe hub.
pub struct EventBus {
    senders: HashMap<Topic, broadcast::Sender<BusEvent>>,
    shutdown: CancellationToken,
}

impl EventBus {
    /// Creates a bus whose topics each buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let senders = Topic::iter()
            .map(|topic| (topic, broadcast::channel(capacity).0))
            .collect();
        Self {
            senders,
            shutdown: CancellationToken::new(),
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<BusEvent> {
        // Every topic is inserted in `new`.
        &self.senders[&topic]
    }

    /// Publishes to the event's topic and returns how many subscribers were
    /// live at that moment. Zero subscribers is not an error.
    pub fn publish(&self, event: BusEvent) -> usize {
        let topic = event.topic();
        match self.sender(topic).send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(%topic, "event published with no subscribers");
                0
            }
        }
    }

    /// Pull-style subscription that sees events published from now on.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        Subscription {
            topic,
            rx: self.sender(topic).subscribe(),
        }
    }

    /// Runs `handler` on its own task for every event on `topic` until the
    /// returned handle is unsubscribed or the bus is dropped.
    ///
    /// Events are handed to the handler one at a time in publish order.
    pub fn subscribe_with<F, Fut>(&self, topic: Topic, handler: F) -> SubscriptionHandle
    where
        F: Fn(BusEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut subscription = self.subscribe(topic);
        let token = self.shutdown.child_token();
        let task_token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    next = subscription.recv() => match next {
                        Some(event) => handler(event).await,
                        None => break,
                    },
                }
            }
            debug!(%topic, "subscription task stopped");
        });
        SubscriptionHandle { topic, token }
    }

    /// Number of live receivers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.sender(topic).receiver_count()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Receiving end of a topic subscription.
pub struct Subscription {
    topic: Topic,
    rx: broadcast::Receiver<BusEvent>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Waits for the next event. Skips over any events lost to lag and
    /// returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    warn!(topic = %self.topic, missed, "subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Handle to a handler-driven subscription.
///
/// Dropping the handle does not stop the handler; call
/// [`unsubscribe`](Self::unsubscribe).
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    topic: Topic,
    token: CancellationToken,
}

impl SubscriptionHandle {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Stops the handler task. Calling this more than once has no effect.
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::{BatchStats, ConversationRecord};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn conversation_event(contact: &str) -> BusEvent {
        BusEvent::NewConversation {
            conversation: ConversationRecord::new(contact),
        }
    }

    fn batch_event(n: u32) -> BusEvent {
        let mut stats = BatchStats::never_called();
        stats.completed_count = n;
        BusEvent::BatchUpdate {
            group_id: "55".into(),
            batch_id: "batch_12345".into(),
            stats,
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_returns_zero() {
        let bus = EventBus::new(8);
        assert_eq!(bus.publish(conversation_event("+1")), 0);
    }

    #[tokio::test]
    async fn publish_reaches_only_its_topic() {
        let bus = EventBus::new(8);
        let mut conversations = bus.subscribe(Topic::NewConversation);
        let mut batches = bus.subscribe(Topic::BatchUpdate);

        assert_eq!(bus.publish(conversation_event("+1")), 1);
        let event = conversations.recv().await.unwrap();
        assert_eq!(event.topic(), Topic::NewConversation);

        let nothing = tokio::time::timeout(Duration::from_millis(20), batches.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn every_subscriber_gets_each_event() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe(Topic::BatchUpdate);
        let mut b = bus.subscribe(Topic::BatchUpdate);
        assert_eq!(bus.publish(batch_event(1)), 2);
        assert_eq!(a.recv().await, Some(batch_event(1)));
        assert_eq!(b.recv().await, Some(batch_event(1)));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn lagging_subscriber_skips_ahead_without_blocking_others() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe(Topic::BatchUpdate);
        let mut fast = bus.subscribe(Topic::BatchUpdate);

        for n in 0..5 {
            bus.publish(batch_event(n));
            assert_eq!(fast.recv().await, Some(batch_event(n)));
        }

        // Only the newest `capacity` events survive for the slow reader.
        assert_eq!(slow.recv().await, Some(batch_event(3)));
        assert_eq!(slow.recv().await, Some(batch_event(4)));
        assert!(logs_contain("subscriber lagged"));
    }

    #[tokio::test]
    async fn handler_subscription_receives_until_unsubscribed() {
        let bus = EventBus::new(8);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = bus.subscribe_with(Topic::NewConversation, move |event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
            }
        });

        bus.publish(conversation_event("+1"));
        assert!(rx.recv().await.is_some());

        handle.unsubscribe();
        handle.unsubscribe();
        assert!(!handle.is_active());

        // Give the task a chance to observe cancellation and drop its receiver.
        for _ in 0..50 {
            if bus.subscriber_count(Topic::NewConversation) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(bus.subscriber_count(Topic::NewConversation), 0);
        assert_eq!(bus.publish(conversation_event("+2")), 0);
    }

    #[tokio::test]
    async fn dropping_handle_keeps_subscription_alive() {
        let bus = EventBus::new(8);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        drop(bus.subscribe_with(Topic::BatchUpdate, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        bus.publish(batch_event(1));
        for _ in 0..50 {
            if seen.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscription_ends_when_bus_dropped() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe(Topic::NewMessage);
        drop(bus);
        assert_eq!(sub.recv().await, None);
    }
}
