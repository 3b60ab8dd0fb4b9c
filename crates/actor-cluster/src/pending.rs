//! # Pending Requests
//!
//! The correlation table behind [`Actor::send_request`](crate::Actor::send_request): a map
//! from outgoing message id to a one-shot completion handle. Entries are removed on
//! fulfilment, on timeout/cancellation (via [`PendingGuard`]) and in bulk when the actor is
//! disposed, so the table never leaks waiters.

use crate::id::MessageId;
use crate::message::Message;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, trace};

#[derive(Default)]
pub(crate) struct PendingRequests {
    waiters: Mutex<HashMap<MessageId, oneshot::Sender<Message>>>,
}

impl PendingRequests {
    /// Registers a waiter for `id`. Dropping the returned guard removes the entry.
    pub(crate) fn register(
        self: &Arc<Self>,
        id: MessageId,
    ) -> (PendingGuard, oneshot::Receiver<Message>) {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(id, tx);
        let guard = PendingGuard {
            table: self.clone(),
            id,
        };
        (guard, rx)
    }

    /// Hands `reply` to the waiter registered under its correlation id.
    ///
    /// Gives the message back when nobody is waiting for it (no correlation id, unknown id,
    /// or the caller already gave up).
    pub(crate) fn complete(&self, reply: Message) -> Result<(), Message> {
        let Some(correlation_id) = reply.correlation_id() else {
            return Err(reply);
        };
        let waiter = self.waiters.lock().remove(&correlation_id);
        match waiter {
            Some(tx) => tx.send(reply).map_err(|reply| {
                trace!(%correlation_id, "Waiter dropped before reply arrived");
                reply
            }),
            None => Err(reply),
        }
    }

    /// Drops every waiter; their callers observe the closed channel as cancellation.
    pub(crate) fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.waiters.lock().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "Cancelled pending requests");
        }
        drained.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    fn remove(&self, id: &MessageId) {
        self.waiters.lock().remove(id);
    }
}

/// Removes its waiter from the table when dropped.
pub(crate) struct PendingGuard {
    table: Arc<PendingRequests>,
    id: MessageId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.table.remove(&self.id);
    }
}
