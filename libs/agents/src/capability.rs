//! Receive and Send Capabilities
//!
//! The per-message-type contract every agent is assembled from:
//!
//! - [`Receiver`] is the side other agents call. A receive policy implements
//!   it and decides when, and on which thread, the user handler runs.
//! - [`Receive`] is the user handler. It is the only thing an agent author
//!   writes.
//! - [`Sender`] forwards a value to a receiver, either one named explicitly
//!   or the default target bound by a system connection.

use crate::error::{AgentError, Result};
use crate::message::{Message, MessageKey};
use crate::outbox::Outbox;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Receive side of one message type, implemented by a receive policy
///
/// `input` never blocks indefinitely: when it returns `Ok`, the message has
/// either been handled or queued for handling.
pub trait Receiver<M: Message>: Send + Sync {
    fn input(&self, msg: M) -> Result<()>;
}

/// User logic for one receivable message type
pub trait Receive<M: Message>: Send + Sync + 'static {
    /// Handle a message. `outbox` carries the agent's send capabilities.
    fn receive(&self, msg: M, outbox: &Outbox) -> Result<()>;
}

/// Send side of one message type
pub trait Sender<M: Message>: Send + Sync {
    /// Forward to an explicit target
    fn send_to(&self, msg: M, target: &dyn Receiver<M>) -> Result<()>;

    /// Forward to the bound default target
    fn send(&self, msg: M) -> Result<()>;
}

/// Type-erased call into an agent's handler for `M`
pub type Handler<M> = Arc<dyn Fn(M) -> Result<()> + Send + Sync>;

/// Direct send policy: forwards on the caller's thread with no buffering
///
/// The default target is a weak routing reference. It can be bound exactly
/// once and is never reassigned.
pub struct DirectSender<M: Message> {
    agent: String,
    target: OnceCell<Weak<dyn Receiver<M>>>,
}

impl<M: Message> DirectSender<M> {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            target: OnceCell::new(),
        }
    }

    /// Bind the default target
    pub fn bind(&self, target: &Arc<dyn Receiver<M>>) -> Result<()> {
        self.target
            .set(Arc::downgrade(target))
            .map_err(|_| AgentError::AlreadyBound {
                agent: self.agent.clone(),
                message_type: MessageKey::of::<M>().short_name(),
            })?;
        trace!(
            agent = %self.agent,
            message_type = MessageKey::of::<M>().short_name(),
            "Bound default target"
        );
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }
}

impl<M: Message> Sender<M> for DirectSender<M> {
    fn send_to(&self, msg: M, target: &dyn Receiver<M>) -> Result<()> {
        target.input(msg)
    }

    fn send(&self, msg: M) -> Result<()> {
        let key = MessageKey::of::<M>();
        let weak = self
            .target
            .get()
            .ok_or_else(|| AgentError::unbound(self.agent.clone(), key.short_name()))?;
        let target = weak.upgrade().ok_or_else(|| AgentError::TargetDropped {
            agent: self.agent.clone(),
            message_type: key.short_name(),
        })?;
        target.input(msg)
    }
}
