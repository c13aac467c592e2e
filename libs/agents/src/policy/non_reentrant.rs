//! Non-Reentrant Receive Policy
//!
//! Handlers run on the caller's thread, but never more than one at a time per
//! agent instance, so an agent can sit on a message cycle (including sending
//! to itself) without recursing or deadlocking.
//!
//! # Active-caller protocol
//!
//! An instance-wide counter tracks callers currently inside `input`:
//!
//! 1. Every call increments the counter and looks at the previous value.
//! 2. A call that saw `0` is the active caller: it runs its own message
//!    (queued behind any messages still buffered), then drains every queue of
//!    the instance (registration order, repeated until all are empty) before
//!    giving up active status.
//! 3. A call that saw a non-zero value buffers its message and returns; the
//!    active caller picks it up.
//! 4. Every call decrements the counter on the way out. The call that brings
//!    it back to zero checks for buffered messages left behind by a racing
//!    caller and, if there are any, reclaims active status and drains them.
//!
//! A plain mutex in place of the counter would deadlock on the first cycle.

use super::queue::{drain_all, Drain, Mailbox};
use super::{PolicyKind, ReceivePolicy};
use crate::capability::{Handler, Receiver};
use crate::error::Result;
use crate::message::Message;
use crate::metrics::AgentMetrics;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Default)]
pub struct NonReentrant {
    core: Arc<GuardCore>,
}

#[derive(Default)]
struct GuardCore {
    active: AtomicUsize,
    pending: Arc<AtomicUsize>,
    queues: RwLock<Vec<Arc<dyn Drain>>>,
}

/// Scoped membership in the active-caller count
struct ActiveCaller<'a> {
    active: &'a AtomicUsize,
    previous: usize,
    left: bool,
}

impl<'a> ActiveCaller<'a> {
    fn enter(active: &'a AtomicUsize) -> Self {
        let previous = active.fetch_add(1, Ordering::SeqCst);
        Self {
            active,
            previous,
            left: false,
        }
    }

    /// Wrap a count already taken by a successful compare-exchange from zero
    fn claimed(active: &'a AtomicUsize) -> Self {
        Self {
            active,
            previous: 0,
            left: false,
        }
    }

    fn is_sole(&self) -> bool {
        self.previous == 0
    }

    /// Drop out of the count. Returns true when this was the last caller.
    fn leave(mut self) -> bool {
        self.left = true;
        self.active.fetch_sub(1, Ordering::SeqCst) == 1
    }
}

impl Drop for ActiveCaller<'_> {
    fn drop(&mut self) {
        // unwinding out of a handler
        if !self.left {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl GuardCore {
    fn drain(&self) -> Result<usize> {
        let queues = self.queues.read_recursive();
        drain_all(&queues, &self.pending)
    }

    /// Run by the caller that dropped the count to zero
    fn reclaim(&self) -> Result<()> {
        while self.pending.load(Ordering::SeqCst) > 0 {
            if self
                .active
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                // another caller is active and owns the drain
                return Ok(());
            }
            let caller = ActiveCaller::claimed(&self.active);
            let drained = self.drain();
            let last = caller.leave();
            let handled = drained?;
            trace!(handled, "Reclaimed and drained buffered messages");
            if !last {
                return Ok(());
            }
        }
        Ok(())
    }
}

impl NonReentrant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callers currently inside `input` on this instance
    pub fn active_callers(&self) -> usize {
        self.core.active.load(Ordering::SeqCst)
    }

    /// Messages buffered and not yet handled
    pub fn pending(&self) -> usize {
        self.core.pending.load(Ordering::SeqCst)
    }
}

struct GuardedInbox<M: Message> {
    core: Arc<GuardCore>,
    mailbox: Arc<Mailbox<M>>,
}

impl<M: Message> Receiver<M> for GuardedInbox<M> {
    fn input(&self, msg: M) -> Result<()> {
        let core = &self.core;
        let caller = ActiveCaller::enter(&core.active);
        let result = if caller.is_sole() {
            if core.pending.load(Ordering::SeqCst) > 0 {
                // earlier messages still queued: keep FIFO behind them
                self.mailbox.push(msg);
                core.drain().map(|_| ())
            } else {
                self.mailbox.handle(msg).and_then(|_| core.drain().map(|_| ()))
            }
        } else {
            self.mailbox.push(msg);
            Ok(())
        };

        if caller.leave() {
            if let Err(e) = core.reclaim() {
                if result.is_ok() {
                    return Err(e);
                }
                warn!(error = %e, "Fault while draining after an earlier fault");
            }
        }
        result
    }
}

impl ReceivePolicy for NonReentrant {
    fn kind(&self) -> PolicyKind {
        PolicyKind::NonReentrant
    }

    fn start(&self, agent: &str) -> Result<()> {
        trace!(agent = %agent, policy = "non_reentrant", "Start (no-op)");
        Ok(())
    }

    fn finish(&self, agent: &str) -> Result<()> {
        trace!(agent = %agent, policy = "non_reentrant", "Finish (no-op)");
        Ok(())
    }

    fn attach<M: Message>(
        &self,
        handler: Handler<M>,
        metrics: Arc<AgentMetrics>,
    ) -> Arc<dyn Receiver<M>> {
        let mailbox = Arc::new(Mailbox::new(handler, self.core.pending.clone(), metrics));
        self.core.queues.write().push(mailbox.clone());
        Arc::new(GuardedInbox {
            core: self.core.clone(),
            mailbox,
        })
    }
}
