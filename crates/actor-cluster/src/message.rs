//! # Message Envelope
//!
//! Every interaction with an actor goes through a [`Message`]: an immutable envelope that
//! carries an id, a creation timestamp, the optional sender, an optional correlation id and
//! an opaque payload.
//!
//! The payload is type-erased (`Arc<dyn Any + Send + Sync>`) because the core never looks
//! inside it; handlers recover the concrete type with [`Message::payload`]. Sharing the
//! payload behind an `Arc` keeps clones cheap, which matters for cluster broadcasts where
//! the same envelope is delivered to every member.
//!
//! ## Replies
//!
//! A reply is an ordinary message whose `correlation_id` equals the `message_id` of the
//! request it answers. Build one with [`Message::reply_to`]; the actor loop routes it to the
//! waiting `send_request` caller instead of the handler.

use crate::id::{ActorId, MessageId};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased payload shared between clones of a message.
pub type Payload = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
pub struct Message {
    message_id: MessageId,
    timestamp: DateTime<Utc>,
    sender_id: Option<ActorId>,
    correlation_id: Option<MessageId>,
    payload: Payload,
}

impl Message {
    /// Creates a new message with a fresh id and the current time.
    pub fn new<P: Any + Send + Sync>(payload: P) -> Self {
        Self::from_payload(Arc::new(payload))
    }

    /// Creates a message around an already shared payload.
    pub fn from_payload(payload: Payload) -> Self {
        Self {
            message_id: MessageId::new(),
            timestamp: Utc::now(),
            sender_id: None,
            correlation_id: None,
            payload,
        }
    }

    /// Creates a reply to `request`, correlated by the request's message id.
    pub fn reply_to<P: Any + Send + Sync>(request: &Message, payload: P) -> Self {
        Self {
            correlation_id: Some(request.message_id),
            ..Self::new(payload)
        }
    }

    /// Stamps the sender. Consumes the message, so the envelope stays immutable once shared.
    pub fn from_sender(mut self, sender: ActorId) -> Self {
        self.sender_id = Some(sender);
        self
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn sender_id(&self) -> Option<ActorId> {
        self.sender_id
    }

    pub fn correlation_id(&self) -> Option<MessageId> {
        self.correlation_id
    }

    pub fn is_reply(&self) -> bool {
        self.correlation_id.is_some()
    }

    /// Borrows the payload as `T`, or `None` if it holds a different type.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    pub fn raw_payload(&self) -> &Payload {
        &self.payload
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("message_id", &self.message_id)
            .field("timestamp", &self.timestamp)
            .field("sender_id", &self.sender_id)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    #[test]
    fn new_message_has_unique_id_and_no_correlation() {
        let a = Message::new(Ping(1));
        let b = Message::new(Ping(1));
        assert_ne!(a.message_id(), b.message_id());
        assert!(a.correlation_id().is_none());
        assert!(a.sender_id().is_none());
        assert!(!a.is_reply());
    }

    #[test]
    fn reply_carries_request_id() {
        let sender = ActorId::new();
        let request = Message::new(Ping(7)).from_sender(sender);
        let reply = Message::reply_to(&request, "pong");

        assert_eq!(request.sender_id(), Some(sender));
        assert_eq!(reply.correlation_id(), Some(request.message_id()));
        assert_ne!(reply.message_id(), request.message_id());
        assert!(reply.is_reply());
    }

    #[test]
    fn payload_is_type_checked() {
        let msg = Message::new(Ping(3));
        assert_eq!(msg.payload::<Ping>(), Some(&Ping(3)));
        assert!(msg.payload::<String>().is_none());
        assert!(msg.is::<Ping>());
    }

    #[test]
    fn clones_share_payload() {
        let msg = Message::new(String::from("shared"));
        let copy = msg.clone();
        assert_eq!(copy.message_id(), msg.message_id());
        assert!(Arc::ptr_eq(msg.raw_payload(), copy.raw_payload()));
    }
}
