//! # Worker Client
//!
//! Provides a typed API over an [`Actor`] running a
//! [`WorkerBehavior`](crate::worker_actor::WorkerBehavior): callers deal in sequence
//! numbers and [`WorkerStatus`] values instead of building messages by hand.

use crate::model::{Ping, Pong, StatusQuery, WorkerStatus};
use actor_cluster::{Actor, ActorError, ActorId, Message};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct WorkerClient {
    actor: Actor,
    timeout: Duration,
}

impl WorkerClient {
    pub fn new(actor: Actor, timeout: Duration) -> Self {
        Self { actor, timeout }
    }

    pub fn id(&self) -> ActorId {
        self.actor.id()
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Round-trips a ping. `Ok(None)` means no pong arrived within the timeout.
    #[instrument(skip(self), fields(actor_id = %self.actor.id()))]
    pub async fn ping(&self, seq: u64) -> Result<Option<u64>, ActorError> {
        debug!("Sending ping");
        let pong: Option<Pong> = self
            .actor
            .send_request(Message::new(Ping(seq)), self.timeout)
            .await?;
        Ok(pong.map(|Pong(seq)| seq))
    }

    #[instrument(skip(self), fields(actor_id = %self.actor.id()))]
    pub async fn status(&self) -> Result<Option<WorkerStatus>, ActorError> {
        self.actor
            .send_request(Message::new(StatusQuery), self.timeout)
            .await
    }
}
