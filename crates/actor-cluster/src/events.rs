//! # Observability Events
//!
//! Output-only notifications emitted by actors and clusters:
//!
//! - [`MessageProcessed`] after every message an actor's loop dispatches to its handler.
//! - [`MembershipChanged`] whenever an actor joins or leaves a cluster, including implicit
//!   departures discovered by the dead-reference sweep.
//!
//! Subscribers are registered on an [`EventHub`] and invoked synchronously by the emitting
//! component. A panicking subscriber is contained and logged; it never reaches the emitter.
//! Nothing inside the core consumes these events for control flow.

use crate::id::{ActorId, ClusterId, MessageId};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Result of dispatching one message to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Handled,
    NotHandled,
    Failed,
}

#[derive(Debug, Clone)]
pub struct MessageProcessed {
    pub actor_id: ActorId,
    pub message_id: MessageId,
    pub outcome: ProcessingOutcome,
    pub elapsed: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChanged {
    pub cluster_id: ClusterId,
    pub actor_id: ActorId,
    pub change: MembershipChange,
}

/// Handle returned by [`EventHub::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Multicast list of subscribers for one event type.
///
/// Callback subscriptions live until [`unsubscribe`](EventHub::unsubscribe). Channel
/// subscriptions end when their receiver is dropped; closed channels are pruned on the next
/// emit, subscribe or count.
pub struct EventHub<E> {
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<E>)>>,
    channels: RwLock<Vec<mpsc::UnboundedSender<E>>>,
    next_id: AtomicU64,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            channels: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Callback subscriptions plus channel subscriptions whose receiver is still alive.
    pub fn subscriber_count(&self) -> usize {
        self.prune_channels();
        self.subscribers.read().len() + self.channels.read().len()
    }

    /// Subscribes an unbounded channel. Dropping the receiver ends the subscription.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.prune_channels();
        self.channels.write().push(tx);
        rx
    }

    fn prune_channels(&self) {
        if self.channels.read().iter().any(|tx| tx.is_closed()) {
            self.channels.write().retain(|tx| !tx.is_closed());
        }
    }
}

impl<E: Clone> EventHub<E> {
    /// Invokes every subscriber with `event`.
    ///
    /// The subscriber list is snapshotted first, so callbacks may subscribe or unsubscribe
    /// without deadlocking.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Subscriber<E>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!("Event subscriber panicked");
            }
        }

        let closed = self
            .channels
            .read()
            .iter()
            .filter(|tx| tx.send(event.clone()).is_err())
            .count();
        if closed > 0 {
            self.channels.write().retain(|tx| !tx.is_closed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emit_reaches_every_subscriber() {
        let hub = EventHub::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let total = total.clone();
            hub.subscribe(move |v| {
                total.fetch_add(*v as usize, Ordering::SeqCst);
            });
        }
        hub.emit(&2);
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn panicking_subscriber_is_contained() {
        let hub = EventHub::<u32>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        hub.subscribe(|_| panic!("boom"));
        let seen_clone = seen.clone();
        hub.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        hub.emit(&1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_callback() {
        let hub = EventHub::<u32>::new();
        let id = hub.subscribe(|_| {});
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn dropped_channel_receivers_are_pruned() {
        let hub = EventHub::<u32>::new();
        for _ in 0..1000 {
            drop(hub.subscribe_channel());
        }
        assert_eq!(hub.subscriber_count(), 0);

        let mut live = hub.subscribe_channel();
        let dropped = hub.subscribe_channel();
        drop(dropped);
        hub.emit(&7);
        assert_eq!(live.try_recv().ok(), Some(7));
        assert_eq!(hub.channels.read().len(), 1);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn channel_subscription_receives_clones() {
        let hub = EventHub::<String>::new();
        let mut rx = hub.subscribe_channel();
        hub.emit(&"hello".to_string());
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }
}
