//! # Identifiers
//!
//! Opaque, UUID-backed identifiers for actors, clusters and messages. All three are
//! cheap `Copy` values compared by value and never change once assigned.

use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            id: Uuid,
        }

        impl $name {
            /// Creates a fresh random identifier.
            pub fn new() -> Self {
                Self { id: Uuid::new_v4() }
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self { id }
            }

            pub fn uuid(&self) -> Uuid {
                self.id
            }

            /// The all-zero identifier, treated as "empty" where ids are validated.
            pub fn nil() -> Self {
                Self { id: Uuid::nil() }
            }

            pub fn is_nil(&self) -> bool {
                self.id.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.id.simple())
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self::from_uuid(id)
            }
        }
    };
}

uuid_id!(
    /// Unique actor identifier.
    ActorId,
    "actor"
);

uuid_id!(
    /// Unique cluster identifier.
    ClusterId,
    "cluster"
);

uuid_id!(
    /// Unique message identifier, generated when a [`Message`](crate::Message) is built.
    MessageId,
    "msg"
);

/// Logical actor type tag. A cluster only accepts actors whose tag matches its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorType(String);

impl ActorType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ActorType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_compare_by_value() {
        let ids: HashSet<ActorId> = (0..100).map(|_| ActorId::new()).collect();
        assert_eq!(ids.len(), 100);

        let uuid = Uuid::new_v4();
        assert_eq!(ClusterId::from_uuid(uuid), ClusterId::from(uuid));
    }

    #[test]
    fn display_uses_prefix() {
        let id = MessageId::nil();
        assert!(id.is_nil());
        assert_eq!(id.to_string(), format!("msg-{}", Uuid::nil().simple()));
        assert!(ActorId::new().to_string().starts_with("actor-"));
    }

    #[test]
    fn actor_type_equality() {
        assert_eq!(ActorType::from("Worker"), ActorType::new(String::from("Worker")));
        assert_ne!(ActorType::from("Worker"), ActorType::from("Npc"));
        assert_eq!(ActorType::from("Worker").to_string(), "Worker");
    }
}
