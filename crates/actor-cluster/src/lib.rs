//! # Actor Cluster
//!
//! This crate provides the actor messaging and clustering core: message-driven actors with
//! an unbounded inbound queue, correlated request/response with timeouts, weakly-tracked
//! clusters with broadcast, and a service that fans a per-tick update out across clusters.
//!
//! ## Architecture Overview
//!
//! The crate is layered, leaves first:
//!
//! 1. **Envelope** ([`Message`]) - immutable id + timestamp + sender + correlation + payload.
//! 2. **Actor** ([`Actor`], [`ActorBehavior`]) - one queue, one processing task, a lifecycle
//!    state machine, and a pending-request table for `send_request`.
//! 3. **Cluster** ([`Cluster`]) - weak membership over actors of one [`ActorType`], with
//!    broadcast, targeted send, membership events and a lazy dead-reference sweep.
//! 4. **Service** ([`ClusteringService`]) - owns the clusters and drives
//!    [`update_all`](ClusteringService::update_all) once per external tick.
//!
//! ## Failure isolation
//!
//! - A handler error or panic fails *that message only*; the actor keeps processing.
//! - A member update failure does not stop sibling members from updating.
//! - A cluster update failure is logged by the service; sibling clusters still update.
//! - Request timeouts and cancellations are reported as `None`, never retried.
//!
//! ## Quick Start
//!
//! ```rust
//! use actor_cluster::{
//!     Actor, ActorBehavior, ActorContext, ActorType, BoxError, ClusterId, ClusteringService,
//!     Handled, Message,
//! };
//! use async_trait::async_trait;
//!
//! struct Worker;
//!
//! #[async_trait]
//! impl ActorBehavior for Worker {
//!     fn actor_type(&self) -> ActorType {
//!         ActorType::from("Worker")
//!     }
//!
//!     async fn handle(
//!         &mut self,
//!         message: Message,
//!         _ctx: &ActorContext,
//!     ) -> Result<Handled, BoxError> {
//!         match message.payload::<String>() {
//!             Some(text) => {
//!                 println!("got {text}");
//!                 Ok(Handled::Yes)
//!             }
//!             None => Ok(Handled::No),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = ClusteringService::new();
//!     let cluster = service
//!         .create_cluster(ClusterId::new(), "workers", "Worker")
//!         .unwrap();
//!
//!     let actor = Actor::new(Worker);
//!     actor.initialize().await.unwrap();
//!     actor.start().await.unwrap();
//!     cluster.register(&actor).unwrap();
//!
//!     let report = cluster.broadcast(&Message::new(String::from("hello")), None).unwrap();
//!     assert_eq!(report.delivered, 1);
//!
//!     actor.dispose().await;
//!     assert!(!cluster.has_member(actor.id()));
//! }
//! ```
//!
//! ## Testing
//!
//! The [`mock`] module provides [`MockBehavior`](mock::MockBehavior), a scriptable
//! recording behavior used throughout this crate's tests.

pub mod actor;
pub mod behavior;
pub mod cluster;
pub mod error;
pub mod events;
pub mod id;
pub mod message;
pub mod mock;
mod pending;
pub mod service;
pub mod tracing;

pub use actor::{Actor, ActorState, ActorStats, WeakActor};
pub use behavior::{ActorBehavior, ActorContext, Handled};
pub use cluster::{BroadcastReport, Cluster, ClusterUpdateReport};
pub use error::{ActorError, BoxError, ClusterError, ServiceError};
pub use events::{
    EventHub, MembershipChange, MembershipChanged, MessageProcessed, ProcessingOutcome,
    SubscriptionId,
};
pub use id::{ActorId, ActorType, ClusterId, MessageId};
pub use message::{Message, Payload};
pub use service::{ClusteringService, UpdateSummary};
pub use tokio_util::sync::CancellationToken;
