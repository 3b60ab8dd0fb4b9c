//! # ActorBehavior Trait
//!
//! The `ActorBehavior` trait is the contract every actor implementation fulfils to be run by
//! an [`Actor`](crate::Actor). The runtime owns the queue, the lifecycle and the
//! request/response plumbing; the behavior only decides what a message means.
//!
//! # Execution Guarantees
//! All hooks run on the actor's own processing task, one at a time. `handle` and
//! `on_update` never overlap, so a behavior can keep plain mutable state without locks.
//!
//! # Provided Methods (Hooks)
//! - [`ActorBehavior::on_initialize`]
//! - [`ActorBehavior::on_update`]
//! - [`ActorBehavior::on_stop`]
//!
//! The defaults do nothing (`Ok(())`).

use crate::error::BoxError;
use crate::id::{ActorId, ActorType};
use crate::message::Message;
use async_trait::async_trait;
use std::any::Any;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Whether a handler recognised a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    No,
}

#[async_trait]
pub trait ActorBehavior: Send + 'static {
    /// The type tag clusters match against.
    fn actor_type(&self) -> ActorType;

    /// Called once by [`Actor::initialize`](crate::Actor::initialize).
    async fn on_initialize(&mut self, _ctx: &ActorContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Handles one message. An `Err` (or a panic) is reported as a failed message; the
    /// actor keeps running.
    async fn handle(&mut self, message: Message, ctx: &ActorContext) -> Result<Handled, BoxError>;

    /// Called once per simulation tick when the owning cluster is updated.
    async fn on_update(&mut self, _delta: Duration, _ctx: &ActorContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called by the processing loop right before it exits on stop.
    async fn on_stop(&mut self, _ctx: &ActorContext) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Per-actor handle passed to every hook.
#[derive(Clone)]
pub struct ActorContext {
    id: ActorId,
    actor_type: ActorType,
    mailbox: mpsc::UnboundedSender<crate::actor::Envelope>,
}

impl ActorContext {
    pub(crate) fn new(
        id: ActorId,
        actor_type: ActorType,
        mailbox: mpsc::UnboundedSender<crate::actor::Envelope>,
    ) -> Self {
        Self {
            id,
            actor_type,
            mailbox,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn actor_type(&self) -> &ActorType {
        &self.actor_type
    }

    /// Answers `request` by queueing a correlated reply on this actor. The loop hands it to
    /// the `send_request` caller waiting on `request`'s id.
    ///
    /// Returns `false` (and logs) when the queue is closed, i.e. the actor was disposed.
    pub fn reply<P: Any + Send + Sync>(&self, request: &Message, payload: P) -> bool {
        let reply = Message::reply_to(request, payload).from_sender(self.id);
        let sent = self
            .mailbox
            .send(crate::actor::Envelope::Message(reply))
            .is_ok();
        if !sent {
            warn!(
                actor_id = %self.id,
                request_id = %request.message_id(),
                "Reply dropped: actor queue closed"
            );
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Envelope;

    #[test]
    fn reply_is_queued_with_correlation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = ActorContext::new(ActorId::new(), ActorType::from("Worker"), tx);
        let request = Message::new(1u32);

        assert!(ctx.reply(&request, 2u32));
        match rx.try_recv() {
            Ok(Envelope::Message(reply)) => {
                assert_eq!(reply.correlation_id(), Some(request.message_id()));
                assert_eq!(reply.sender_id(), Some(ctx.id()));
                assert_eq!(reply.payload::<u32>(), Some(&2));
            }
            _ => panic!("expected a queued reply"),
        }
    }

    #[test]
    fn reply_on_closed_queue_reports_failure() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let ctx = ActorContext::new(ActorId::new(), ActorType::from("Worker"), tx);

        assert!(!ctx.reply(&Message::new(1u32), 2u32));
    }
}
