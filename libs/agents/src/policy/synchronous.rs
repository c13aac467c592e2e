//! Synchronous receive policy: handlers run inline on the sender's thread.
//!
//! Cyclic wiring between synchronous agents recurses on the call stack
//! without bound.

use super::queue::invoke;
use super::{PolicyKind, ReceivePolicy};
use crate::capability::{Handler, Receiver};
use crate::error::Result;
use crate::message::Message;
use crate::metrics::AgentMetrics;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Default)]
pub struct Synchronous;

impl Synchronous {
    pub fn new() -> Self {
        Self
    }
}

struct DirectInbox<M: Message> {
    handler: Handler<M>,
    metrics: Arc<AgentMetrics>,
}

impl<M: Message> Receiver<M> for DirectInbox<M> {
    fn input(&self, msg: M) -> Result<()> {
        invoke(&self.handler, &self.metrics, msg)
    }
}

impl ReceivePolicy for Synchronous {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Synchronous
    }

    fn start(&self, agent: &str) -> Result<()> {
        trace!(agent = %agent, policy = "synchronous", "Start (no-op)");
        Ok(())
    }

    fn finish(&self, agent: &str) -> Result<()> {
        trace!(agent = %agent, policy = "synchronous", "Finish (no-op)");
        Ok(())
    }

    fn attach<M: Message>(
        &self,
        handler: Handler<M>,
        metrics: Arc<AgentMetrics>,
    ) -> Arc<dyn Receiver<M>> {
        Arc::new(DirectInbox { handler, metrics })
    }
}
