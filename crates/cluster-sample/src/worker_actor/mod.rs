//! # Worker Actor
//!
//! The [`WorkerBehavior`] is the sample's only actor type. It counts simulation ticks,
//! answers [`Ping`] and [`StatusQuery`] requests, and keeps the announcements broadcast to
//! its cluster.
//!
//! ## Usage
//!
//! ```rust
//! use actor_cluster::Actor;
//! use cluster_sample::clients::WorkerClient;
//! use cluster_sample::worker_actor::WorkerBehavior;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let actor = Actor::new(WorkerBehavior::new("Worker", "w-1"));
//!     actor.initialize().await.unwrap();
//!     actor.start().await.unwrap();
//!
//!     let client = WorkerClient::new(actor, Duration::from_secs(1));
//!     assert_eq!(client.ping(3).await.unwrap(), Some(3));
//! }
//! ```

use crate::model::{Announcement, Ping, Pong, StatusQuery, WorkerStatus};
use actor_cluster::{ActorBehavior, ActorContext, ActorType, BoxError, Handled, Message};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

pub struct WorkerBehavior {
    actor_type: ActorType,
    name: String,
    ticks: u64,
    simulated: Duration,
    announcements: Vec<String>,
}

impl WorkerBehavior {
    pub fn new(actor_type: impl Into<ActorType>, name: impl Into<String>) -> Self {
        Self {
            actor_type: actor_type.into(),
            name: name.into(),
            ticks: 0,
            simulated: Duration::ZERO,
            announcements: Vec::new(),
        }
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            name: self.name.clone(),
            ticks: self.ticks,
            simulated_ms: self.simulated.as_millis() as u64,
            announcements: self.announcements.len(),
        }
    }
}

#[async_trait]
impl ActorBehavior for WorkerBehavior {
    fn actor_type(&self) -> ActorType {
        self.actor_type.clone()
    }

    async fn on_initialize(&mut self, ctx: &ActorContext) -> Result<(), BoxError> {
        info!(actor_id = %ctx.id(), name = %self.name, "Worker ready");
        Ok(())
    }

    async fn handle(&mut self, message: Message, ctx: &ActorContext) -> Result<Handled, BoxError> {
        if let Some(Ping(seq)) = message.payload::<Ping>() {
            ctx.reply(&message, Pong(*seq));
            return Ok(Handled::Yes);
        }
        if message.is::<StatusQuery>() {
            ctx.reply(&message, self.status());
            return Ok(Handled::Yes);
        }
        if let Some(Announcement(text)) = message.payload::<Announcement>() {
            debug!(name = %self.name, %text, "Announcement");
            self.announcements.push(text.clone());
            return Ok(Handled::Yes);
        }
        Ok(Handled::No)
    }

    async fn on_update(&mut self, delta: Duration, _ctx: &ActorContext) -> Result<(), BoxError> {
        self.ticks += 1;
        self.simulated += delta;
        Ok(())
    }

    async fn on_stop(&mut self, _ctx: &ActorContext) -> Result<(), BoxError> {
        info!(name = %self.name, ticks = self.ticks, "Worker stopping");
        Ok(())
    }
}
