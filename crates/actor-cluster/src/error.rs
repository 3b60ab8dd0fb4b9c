//! # Errors
//!
//! Error types for each layer of the core. Lifecycle misuse and membership failures are
//! surfaced as `Err` values; request timeouts and cancellations are *not* errors and show
//! up as `None` from [`Actor::send_request`](crate::Actor::send_request).

use crate::actor::ActorState;
use crate::id::{ActorId, ActorType, ClusterId};

/// Error type returned by message handlers and update hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a single actor.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("Actor already initialized")]
    AlreadyInitialized,
    #[error("Actor not initialized")]
    NotInitialized,
    #[error("Cannot {operation} actor in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ActorState,
    },
    #[error("Actor not running (state {state:?})")]
    NotRunning { state: ActorState },
    #[error("Actor channel closed")]
    ChannelClosed,
    #[error("Actor faulted: {0}")]
    Faulted(String),
    #[error("Handler error: {0}")]
    Handler(BoxError),
    #[error("Operation cancelled")]
    Cancelled,
}

/// Errors raised by cluster membership and messaging operations.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Cluster {0} is not running")]
    NotRunning(ClusterId),
    #[error("Actor type mismatch: cluster expects {expected}, actor is {actual}")]
    ActorTypeMismatch {
        expected: ActorType,
        actual: ActorType,
    },
    #[error("Actor {0} is disposed")]
    ActorUnavailable(ActorId),
    #[error("Actor {0} is not a member")]
    NotAMember(ActorId),
    #[error("Send to {actor} failed: {source}")]
    Send {
        actor: ActorId,
        #[source]
        source: ActorError,
    },
    #[error("{} member update(s) failed in cluster {cluster}", failures.len())]
    MemberUpdatesFailed {
        cluster: ClusterId,
        failures: Vec<(ActorId, ActorError)>,
    },
}

/// Errors raised by the clustering service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Clustering service is not running")]
    NotRunning,
    #[error("Cluster id must not be empty")]
    EmptyClusterId,
    #[error("Cluster {0} already exists")]
    ClusterExists(ClusterId),
    #[error("Cluster {0} not found")]
    ClusterNotFound(ClusterId),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}
