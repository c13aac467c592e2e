//! Agents
//!
//! An agent is user logic plus a capability list: the message types it
//! receives and the message types it sends, each bound to the agent's receive
//! policy or its send ports at construction.
//!
//! ```rust
//! use agent_graph::{AgentBuilder, Outbox, PolicyKind, Receive, Result};
//!
//! struct Celsius(f64);
//! struct Fahrenheit(f64);
//!
//! struct Converter;
//!
//! impl Receive<Celsius> for Converter {
//!     fn receive(&self, msg: Celsius, outbox: &Outbox) -> Result<()> {
//!         outbox.send(Fahrenheit(msg.0 * 9.0 / 5.0 + 32.0))
//!     }
//! }
//!
//! let converter = AgentBuilder::new("converter", Converter, PolicyKind::Synchronous)
//!     .receives::<Celsius>()
//!     .sends::<Fahrenheit>()
//!     .build();
//!
//! // nothing is bound to Fahrenheit yet
//! assert!(converter.input(Celsius(100.0)).is_err());
//! ```

use crate::capability::{Handler, Receive, Receiver};
use crate::error::{AgentError, Result};
use crate::message::{Declaration, Direction, Message, MessageKey};
use crate::metrics::{AgentMetrics, MetricsSnapshot};
use crate::outbox::Outbox;
use crate::policy::{Policy, PolicyKind, ReceivePolicy, WorkerPhase};
use crate::registry::AgentId;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

type Inbound = Box<dyn Any + Send + Sync>;

type AttachFn<L> =
    Box<dyn FnOnce(&Policy, &Arc<L>, &Arc<Outbox>, &Arc<AgentMetrics>) -> (MessageKey, Inbound)>;

/// Builder collecting an agent's capability list
pub struct AgentBuilder<L> {
    name: String,
    logic: L,
    policy: Policy,
    outbox: Outbox,
    declarations: Vec<Declaration>,
    attachments: Vec<AttachFn<L>>,
}

impl<L: Send + Sync + 'static> AgentBuilder<L> {
    pub fn new(name: impl Into<String>, logic: L, policy: impl Into<Policy>) -> Self {
        let name = name.into();
        Self {
            outbox: Outbox::new(name.clone()),
            name,
            logic,
            policy: policy.into(),
            declarations: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Declare `M` as receivable, handled by `L`'s `Receive<M>`
    ///
    /// Queues drain in the order message types are declared here.
    pub fn receives<M: Message>(mut self) -> Self
    where
        L: Receive<M>,
    {
        let declaration = Declaration::receive::<M>();
        if self.declarations.contains(&declaration) {
            return self;
        }
        self.declarations.push(declaration);
        let attach: AttachFn<L> = Box::new(
            |policy: &Policy, logic: &Arc<L>, outbox: &Arc<Outbox>, metrics: &Arc<AgentMetrics>| {
                let logic = Arc::clone(logic);
                let outbox = Arc::clone(outbox);
                let handler: Handler<M> =
                    Arc::new(move |msg: M| <L as Receive<M>>::receive(&logic, msg, &outbox));
                let receiver: Arc<dyn Receiver<M>> = policy.attach(handler, Arc::clone(metrics));
                (MessageKey::of::<M>(), Box::new(receiver) as Inbound)
            },
        );
        self.attachments.push(attach);
        self
    }

    /// Declare `M` as sendable
    pub fn sends<M: Message>(mut self) -> Self {
        let declaration = Declaration::send::<M>();
        if !self.declarations.contains(&declaration) {
            self.declarations.push(declaration);
            self.outbox.declare::<M>();
        }
        self
    }

    pub fn build(self) -> Agent {
        let id = AgentId::new();
        let logic = Arc::new(self.logic);
        let outbox = Arc::new(self.outbox);
        let metrics = Arc::new(AgentMetrics::default());

        let mut inbound = HashMap::with_capacity(self.attachments.len());
        for attach in self.attachments {
            let (key, receiver) = attach(&self.policy, &logic, &outbox, &metrics);
            inbound.insert(key, receiver);
        }

        debug!(
            agent = %self.name,
            agent_id = %id,
            policy = %self.policy.kind(),
            declarations = self.declarations.len(),
            "Built agent"
        );

        Agent {
            id,
            name: self.name,
            policy: self.policy,
            inbound,
            outbox,
            declarations: self.declarations,
            metrics,
        }
    }
}

/// A constructed agent instance
pub struct Agent {
    id: AgentId,
    name: String,
    policy: Policy,
    inbound: HashMap<MessageKey, Inbound>,
    outbox: Arc<Outbox>,
    declarations: Vec<Declaration>,
    metrics: Arc<AgentMetrics>,
}

impl Agent {
    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Worker phase for dedicated-thread agents
    pub fn worker_phase(&self) -> Option<WorkerPhase> {
        self.policy.worker_phase()
    }

    /// The capability list, in declaration order
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declares(&self, direction: Direction, message: MessageKey) -> bool {
        self.declarations
            .iter()
            .any(|d| d.direction == direction && d.message == message)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Deliver a message through this agent's receive policy
    pub fn input<M: Message>(&self, msg: M) -> Result<()> {
        self.inbox::<M>()?.input(msg)
    }

    /// The receive capability for `M`, for wiring other agents to this one
    pub fn receiver<M: Message>(&self) -> Result<Arc<dyn Receiver<M>>> {
        self.inbox::<M>().map(Arc::clone)
    }

    /// Send through the default target bound for `M`
    pub fn send<M: Message>(&self, msg: M) -> Result<()> {
        self.outbox.send(msg)
    }

    /// Send to an explicit target
    pub fn send_to<M: Message>(&self, msg: M, target: &dyn Receiver<M>) -> Result<()> {
        self.outbox.send_to(msg, target)
    }

    /// Bind the default target for `M`. A binding is permanent.
    pub fn bind<M: Message>(&self, target: &Arc<dyn Receiver<M>>) -> Result<()> {
        self.outbox.bind(target)?;
        debug!(
            agent = %self.name,
            message_type = MessageKey::of::<M>().short_name(),
            "Bound default receiver"
        );
        Ok(())
    }

    /// Bind this agent's `M` output to `to`'s `M` input
    pub fn connect<M: Message>(&self, to: &Agent) -> Result<()> {
        let receiver = to.receiver::<M>()?;
        self.bind(&receiver)
    }

    pub fn is_bound<M: Message>(&self) -> bool {
        self.outbox.is_bound::<M>()
    }

    pub fn start(&self) -> Result<()> {
        self.policy.start(&self.name)?;
        info!(
            agent = %self.name,
            agent_id = %self.id,
            policy = %self.policy.kind(),
            "Agent started"
        );
        Ok(())
    }

    pub fn finish(&self) -> Result<()> {
        self.policy.finish(&self.name)?;
        info!(
            agent = %self.name,
            agent_id = %self.id,
            policy = %self.policy.kind(),
            "Agent finished"
        );
        Ok(())
    }

    fn inbox<M: Message>(&self) -> Result<&Arc<dyn Receiver<M>>> {
        let key = MessageKey::of::<M>();
        self.inbound
            .get(&key)
            .and_then(|r| r.downcast_ref::<Arc<dyn Receiver<M>>>())
            .ok_or_else(|| AgentError::not_declared(self.name.clone(), "receive", key.short_name()))
    }
}

/// Lets one agent be handed to another's `send_to` directly
impl<M: Message> Receiver<M> for Agent {
    fn input(&self, msg: M) -> Result<()> {
        Agent::input(self, msg)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declarations: Vec<String> = self.declarations.iter().map(|d| d.to_string()).collect();
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("policy", &self.policy.kind())
            .field("declarations", &declarations)
            .finish()
    }
}
