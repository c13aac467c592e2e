//! Per-agent send capabilities, keyed by message type

use crate::capability::{DirectSender, Receiver, Sender};
use crate::error::{AgentError, Result};
use crate::message::{Message, MessageKey};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// The set of send ports an agent declared
///
/// Handed to every [`Receive`](crate::Receive) call so user logic can emit
/// messages without knowing who receives them.
pub struct Outbox {
    agent: String,
    ports: HashMap<MessageKey, Box<dyn Any + Send + Sync>>,
}

impl Outbox {
    pub(crate) fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            ports: HashMap::new(),
        }
    }

    pub(crate) fn declare<M: Message>(&mut self) {
        let agent = self.agent.clone();
        self.ports
            .entry(MessageKey::of::<M>())
            .or_insert_with(|| Box::new(DirectSender::<M>::new(agent)));
    }

    /// Name of the owning agent
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Send to the default target bound for `M`
    pub fn send<M: Message>(&self, msg: M) -> Result<()> {
        self.port::<M>()?.send(msg)
    }

    /// Send to an explicit target, bypassing the default binding
    pub fn send_to<M: Message>(&self, msg: M, target: &dyn Receiver<M>) -> Result<()> {
        self.port::<M>()?.send_to(msg, target)
    }

    /// Whether a default target is bound for `M`
    pub fn is_bound<M: Message>(&self) -> bool {
        self.port::<M>().map(|p| p.is_bound()).unwrap_or(false)
    }

    pub(crate) fn bind<M: Message>(&self, target: &Arc<dyn Receiver<M>>) -> Result<()> {
        self.port::<M>()?.bind(target)
    }

    fn port<M: Message>(&self) -> Result<&DirectSender<M>> {
        let key = MessageKey::of::<M>();
        self.ports
            .get(&key)
            .and_then(|port| port.downcast_ref::<DirectSender<M>>())
            .ok_or_else(|| AgentError::not_declared(self.agent.clone(), "send", key.short_name()))
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ports: Vec<_> = self.ports.keys().map(|k| k.short_name()).collect();
        ports.sort_unstable();
        f.debug_struct("Outbox")
            .field("agent", &self.agent)
            .field("ports", &ports)
            .finish()
    }
}
