//! Message Types and Declarations
//!
//! A message is any owned value that can cross a thread boundary. The
//! framework imposes no fields on it; message types are told apart at runtime
//! by their [`MessageKey`], which is what agents use to key their per-type
//! queues and send ports.

use std::any::{type_name, TypeId};
use std::fmt;

/// Marker trait for values carried between agents
pub trait Message: Send + 'static {}

impl<T: Send + 'static> Message for T {}

/// Runtime identity of a message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey {
    id: TypeId,
    name: &'static str,
}

impl MessageKey {
    /// Key for message type `M`
    pub fn of<M: Message>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: type_name::<M>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, used in logs and errors
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path
    ///
    /// Tuples, arrays, slices and references keep their full name.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        if base.contains(['(', '[', '&']) {
            return self.name;
        }
        match base.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Which way a message type flows through an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Receive,
    Send,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Receive => "receive",
            Direction::Send => "send",
        }
    }
}

/// One (direction, message type) entry of an agent's capability list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub direction: Direction,
    pub message: MessageKey,
}

impl Declaration {
    pub fn receive<M: Message>() -> Self {
        Self {
            direction: Direction::Receive,
            message: MessageKey::of::<M>(),
        }
    }

    pub fn send<M: Message>() -> Self {
        Self {
            direction: Direction::Send,
            message: MessageKey::of::<M>(),
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.direction.as_str(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    struct Pong;

    #[test]
    fn test_message_key_identity() {
        assert_eq!(MessageKey::of::<Ping>(), MessageKey::of::<Ping>());
        assert_ne!(MessageKey::of::<Ping>(), MessageKey::of::<Pong>());
        assert_ne!(MessageKey::of::<u32>(), MessageKey::of::<u64>());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(MessageKey::of::<Ping>().short_name(), "Ping");
        assert_eq!(MessageKey::of::<u32>().short_name(), "u32");
        assert!(MessageKey::of::<Ping>().name().ends_with("::Ping"));
        assert!(MessageKey::of::<Vec<Ping>>().short_name().starts_with("Vec<"));
    }

    #[test]
    fn test_short_name_of_compound_types() {
        let pair = MessageKey::of::<(Ping, Pong)>();
        assert_eq!(pair.short_name(), pair.name());
        assert!(pair.short_name().starts_with('('));
        assert!(pair.short_name().ends_with("::Pong)"));

        assert_eq!(MessageKey::of::<[u8; 4]>().short_name(), "[u8; 4]");
        assert_eq!(MessageKey::of::<&'static str>().short_name(), "&str");
    }

    #[test]
    fn test_declaration_display() {
        assert_eq!(Declaration::receive::<Ping>().to_string(), "receive<Ping>");
        assert_eq!(Declaration::send::<Pong>().to_string(), "send<Pong>");
    }
}
