//! Receive Policies
//!
//! A receive policy decides when, and on which thread, an agent's handlers
//! run. Every policy turns a handler into a [`Receiver`] per message type via
//! [`ReceivePolicy::attach`], and owns whatever lifecycle the strategy needs.
//!
//! | Policy            | Thread             | Buffering                        |
//! |-------------------|--------------------|----------------------------------|
//! | `Synchronous`     | caller             | none                             |
//! | `DedicatedThread` | one worker/agent   | always, FIFO per message type    |
//! | `NonReentrant`    | caller             | only while another call is active|
//!
//! The policy is chosen at runtime through [`Policy`], usually from a
//! [`PolicyKind`] in the [`RuntimeConfig`](crate::RuntimeConfig).

mod dedicated;
mod non_reentrant;
pub(crate) mod queue;
mod synchronous;

pub use dedicated::{DedicatedThread, WorkerPhase};
pub use non_reentrant::NonReentrant;
pub use synchronous::Synchronous;

use crate::capability::{Handler, Receiver};
use crate::config::{RuntimeConfig, WorkerConfig};
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::metrics::AgentMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Strategy implementing the receive side of an agent
pub trait ReceivePolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// Make the agent ready to process messages
    fn start(&self, agent: &str) -> Result<()>;

    /// Stop processing. Returns a fault raised by the agent's handlers while
    /// it was running, if the policy defers faults to this point.
    fn finish(&self, agent: &str) -> Result<()>;

    /// Register a handler for `M`, returning the receiver senders call
    fn attach<M: Message>(
        &self,
        handler: Handler<M>,
        metrics: Arc<AgentMetrics>,
    ) -> Arc<dyn Receiver<M>>
    where
        Self: Sized;
}

/// Available receive policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Synchronous,
    DedicatedThread,
    NonReentrant,
}

impl PolicyKind {
    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Synchronous => "synchronous",
            PolicyKind::DedicatedThread => "dedicated_thread",
            PolicyKind::NonReentrant => "non_reentrant",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "synchronous" => Ok(PolicyKind::Synchronous),
            "dedicated_thread" => Ok(PolicyKind::DedicatedThread),
            "non_reentrant" => Ok(PolicyKind::NonReentrant),
            other => Err(AgentError::config(format!("unknown policy '{}'", other))),
        }
    }
}

/// A receive policy selected at runtime
pub enum Policy {
    Synchronous(Synchronous),
    DedicatedThread(DedicatedThread),
    NonReentrant(NonReentrant),
}

impl Policy {
    /// Policy of the given kind with default worker settings
    pub fn new(kind: PolicyKind) -> Self {
        Self::with_worker(kind, WorkerConfig::default())
    }

    /// Policy of the given kind using the worker settings from `config`
    pub fn from_config(kind: PolicyKind, config: &RuntimeConfig) -> Self {
        Self::with_worker(kind, config.worker.clone())
    }

    /// The configured default policy
    pub fn default_for(config: &RuntimeConfig) -> Self {
        Self::from_config(config.default_policy, config)
    }

    fn with_worker(kind: PolicyKind, worker: WorkerConfig) -> Self {
        match kind {
            PolicyKind::Synchronous => Policy::Synchronous(Synchronous::new()),
            PolicyKind::DedicatedThread => {
                Policy::DedicatedThread(DedicatedThread::with_config(worker))
            }
            PolicyKind::NonReentrant => Policy::NonReentrant(NonReentrant::new()),
        }
    }

    /// Worker phase, for dedicated-thread policies
    pub fn worker_phase(&self) -> Option<WorkerPhase> {
        match self {
            Policy::DedicatedThread(p) => Some(p.phase()),
            _ => None,
        }
    }
}

impl From<Synchronous> for Policy {
    fn from(p: Synchronous) -> Self {
        Policy::Synchronous(p)
    }
}

impl From<DedicatedThread> for Policy {
    fn from(p: DedicatedThread) -> Self {
        Policy::DedicatedThread(p)
    }
}

impl From<NonReentrant> for Policy {
    fn from(p: NonReentrant) -> Self {
        Policy::NonReentrant(p)
    }
}

impl From<PolicyKind> for Policy {
    fn from(kind: PolicyKind) -> Self {
        Policy::new(kind)
    }
}

impl ReceivePolicy for Policy {
    fn kind(&self) -> PolicyKind {
        match self {
            Policy::Synchronous(p) => p.kind(),
            Policy::DedicatedThread(p) => p.kind(),
            Policy::NonReentrant(p) => p.kind(),
        }
    }

    fn start(&self, agent: &str) -> Result<()> {
        match self {
            Policy::Synchronous(p) => p.start(agent),
            Policy::DedicatedThread(p) => p.start(agent),
            Policy::NonReentrant(p) => p.start(agent),
        }
    }

    fn finish(&self, agent: &str) -> Result<()> {
        match self {
            Policy::Synchronous(p) => p.finish(agent),
            Policy::DedicatedThread(p) => p.finish(agent),
            Policy::NonReentrant(p) => p.finish(agent),
        }
    }

    fn attach<M: Message>(
        &self,
        handler: Handler<M>,
        metrics: Arc<AgentMetrics>,
    ) -> Arc<dyn Receiver<M>> {
        match self {
            Policy::Synchronous(p) => p.attach(handler, metrics),
            Policy::DedicatedThread(p) => p.attach(handler, metrics),
            Policy::NonReentrant(p) => p.attach(handler, metrics),
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Policy").field(&self.kind()).finish()
    }
}
