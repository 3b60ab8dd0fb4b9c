//! Payload types exchanged with worker actors.
//!
//! Payloads are plain Rust types; the core carries them type-erased inside a
//! [`Message`](actor_cluster::Message) and workers downcast them on arrival.

/// Request: answered with [`Pong`] carrying the same sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong(pub u64);

/// Request: answered with the worker's [`WorkerStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusQuery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    pub name: String,
    pub ticks: u64,
    pub simulated_ms: u64,
    pub announcements: usize,
}

/// Fire-and-forget text broadcast to a whole cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement(pub String);
