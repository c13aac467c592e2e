//! Per-message-type FIFO buffers shared by the queueing policies

use crate::capability::Handler;
use crate::error::Result;
use crate::message::{Message, MessageKey};
use crate::metrics::AgentMetrics;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A queue that can be drained without knowing its message type
pub(crate) trait Drain: Send + Sync {
    /// Hand every buffered message to the handler, oldest first, until the
    /// queue is empty. Returns how many were handled.
    fn drain(&self) -> Result<usize>;

    fn message_type(&self) -> MessageKey;
}

/// Pending messages of one type for one agent instance
///
/// The lock covers push/pop only and is released before the handler runs.
/// `pending` is shared by every mailbox of the same agent so a policy can
/// tell in O(1) whether any of its queues hold work.
pub(crate) struct Mailbox<M: Message> {
    messages: Mutex<VecDeque<M>>,
    handler: Handler<M>,
    pending: Arc<AtomicUsize>,
    metrics: Arc<AgentMetrics>,
}

impl<M: Message> Mailbox<M> {
    pub(crate) fn new(
        handler: Handler<M>,
        pending: Arc<AtomicUsize>,
        metrics: Arc<AgentMetrics>,
    ) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            handler,
            pending,
            metrics,
        }
    }

    pub(crate) fn push(&self, msg: M) {
        // count first so `pending` never reads lower than the queued total
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().push_back(msg);
        self.metrics.record_deferred();
    }

    fn pop(&self) -> Option<M> {
        let msg = self.messages.lock().pop_front();
        if msg.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        msg
    }

    /// Run the handler on the caller's thread
    pub(crate) fn handle(&self, msg: M) -> Result<()> {
        invoke(&self.handler, &self.metrics, msg)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.messages.lock().len()
    }
}

impl<M: Message> Drain for Mailbox<M> {
    fn drain(&self) -> Result<usize> {
        let mut handled = 0;
        while let Some(msg) = self.pop() {
            self.handle(msg)?;
            handled += 1;
        }
        Ok(handled)
    }

    fn message_type(&self) -> MessageKey {
        MessageKey::of::<M>()
    }
}

/// Call a handler and record the outcome
pub(crate) fn invoke<M: Message>(
    handler: &Handler<M>,
    metrics: &AgentMetrics,
    msg: M,
) -> Result<()> {
    let result = handler(msg);
    metrics.record_handled(result.is_ok());
    result
}

/// Drain `queues` in registration order, repeating whole passes until
/// `pending` reads zero.
pub(crate) fn drain_all(queues: &[Arc<dyn Drain>], pending: &AtomicUsize) -> Result<usize> {
    let mut handled = 0;
    while pending.load(Ordering::SeqCst) > 0 {
        for queue in queues {
            match queue.drain() {
                Ok(n) => handled += n,
                Err(e) => {
                    tracing::debug!(
                        message_type = queue.message_type().short_name(),
                        handled,
                        "Drain interrupted by handler fault"
                    );
                    return Err(e);
                }
            }
        }
    }
    Ok(handled)
}
