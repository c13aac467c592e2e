//! Agent Systems
//!
//! A system is a fixed graph declared up front: component agents, directed
//! connections between them (one message type each), external inputs and
//! external outputs. Elements are resolved strictly in declaration order, so a
//! component has to be declared before anything refers to it. Message cycles
//! between agents are allowed; give the agents on a cycle the non-reentrant
//! or dedicated-thread policy.
//!
//! ```rust
//! use agent_graph::{AgentBuilder, Outbox, PolicyKind, Receive, Result, SystemBuilder};
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! struct Reading(i64);
//! struct Scaled(i64);
//!
//! struct Scale;
//!
//! impl Receive<Reading> for Scale {
//!     fn receive(&self, msg: Reading, outbox: &Outbox) -> Result<()> {
//!         outbox.send(Scaled(msg.0 * 10))
//!     }
//! }
//!
//! let scale = AgentBuilder::new("scale", Scale, PolicyKind::Synchronous)
//!     .receives::<Reading>()
//!     .sends::<Scaled>()
//!     .build();
//!
//! let system = SystemBuilder::new("sensors")
//!     .component(scale)
//!     .input::<Reading>("scale")
//!     .output::<Scaled>("scale")
//!     .build()?;
//!
//! let last = Arc::new(AtomicI64::new(0));
//! let seen = last.clone();
//! system.set_callback(move |s: Scaled| seen.store(s.0, Ordering::SeqCst))?;
//!
//! system.start()?;
//! system.input(Reading(4))?;
//! system.finish()?;
//! assert_eq!(last.load(Ordering::SeqCst), 40);
//! # Ok::<(), agent_graph::AgentError>(())
//! ```

use crate::agent::{Agent, AgentBuilder};
use crate::capability::{Receive, Receiver};
use crate::error::{AgentError, Result};
use crate::message::{Message, MessageKey};
use crate::outbox::Outbox;
use crate::policy::PolicyKind;
use crate::registry::ComponentRegistry;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Callback invoked by an output sink for every message it receives
pub type Callback<M> = Arc<dyn Fn(M) + Send + Sync>;

/// Lifecycle state of a system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Created,
    Running,
    Stopped,
}

/// Agent logic behind every output: forwards each message to the callback
pub struct OutputSink<M: Message> {
    source: String,
    callback: Arc<RwLock<Option<Callback<M>>>>,
}

impl<M: Message> Receive<M> for OutputSink<M> {
    fn receive(&self, msg: M, _outbox: &Outbox) -> Result<()> {
        // clone out so the lock is not held while user code runs
        let callback = self.callback.read().clone();
        match callback {
            Some(callback) => callback(msg),
            None => warn!(
                source = %self.source,
                message_type = MessageKey::of::<M>().short_name(),
                "No callback registered for output, message discarded"
            ),
        }
        Ok(())
    }
}

/// Wired external output for one message type
struct OutputPort<M: Message> {
    source: String,
    sink: Agent,
    callback: Arc<RwLock<Option<Callback<M>>>>,
}

/// Wired external input for one message type
struct InputPort<M: Message> {
    target: String,
    receiver: Arc<dyn Receiver<M>>,
}

type Port = Box<dyn Any + Send + Sync>;

/// System parts assembled while the declaration list is resolved
#[derive(Default)]
struct Parts {
    components: ComponentRegistry,
    inputs: HashMap<MessageKey, Port>,
    outputs: HashMap<MessageKey, Port>,
}

type Step = Box<dyn FnOnce(&mut Parts, &str) -> Result<()>>;

/// Declarative description of a system graph
pub struct SystemBuilder {
    name: String,
    steps: Vec<Step>,
}

impl SystemBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Declare a component. Its name is how the other elements refer to it.
    pub fn component(mut self, agent: Agent) -> Self {
        self.steps.push(Box::new(move |parts: &mut Parts, _system: &str| {
            parts.components.register(agent)
        }));
        self
    }

    /// Route every default-target `M` sent by `from` to `to`
    pub fn connection<M: Message>(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        let (from, to) = (from.into(), to.into());
        self.steps.push(Box::new(move |parts: &mut Parts, system: &str| {
            let source = parts.components.get(&from)?;
            let target = parts.components.get(&to)?;
            source.connect::<M>(target)?;
            info!(
                system = %system,
                from = %from,
                to = %to,
                message_type = MessageKey::of::<M>().short_name(),
                "Wired connection"
            );
            Ok(())
        }));
        self
    }

    /// Expose `agent`'s receive capability for `M` as `System::input`
    pub fn input<M: Message>(mut self, agent: impl Into<String>) -> Self {
        let agent = agent.into();
        self.steps.push(Box::new(move |parts: &mut Parts, system: &str| {
            let key = MessageKey::of::<M>();
            if parts.inputs.contains_key(&key) {
                return Err(AgentError::DuplicateInput(key.short_name()));
            }
            let receiver = parts.components.get(&agent)?.receiver::<M>()?;
            debug!(
                system = %system,
                agent = %agent,
                message_type = key.short_name(),
                "Wired input"
            );
            let port = InputPort {
                target: agent,
                receiver,
            };
            parts.inputs.insert(key, Box::new(port));
            Ok(())
        }));
        self
    }

    /// Create a sink for `agent`'s `M` and bind it as the default target
    pub fn output<M: Message>(mut self, agent: impl Into<String>) -> Self {
        let agent = agent.into();
        self.steps.push(Box::new(move |parts: &mut Parts, system: &str| {
            let key = MessageKey::of::<M>();
            if parts.outputs.contains_key(&key) {
                return Err(AgentError::DuplicateOutput(key.short_name()));
            }
            let source = parts.components.get(&agent)?;
            let callback = Arc::new(RwLock::new(None));
            let sink = AgentBuilder::new(
                format!("{}.output.{}", agent, key.short_name()),
                OutputSink::<M> {
                    source: agent.clone(),
                    callback: Arc::clone(&callback),
                },
                PolicyKind::Synchronous,
            )
            .receives::<M>()
            .build();
            source.connect::<M>(&sink)?;
            debug!(
                system = %system,
                agent = %agent,
                message_type = key.short_name(),
                "Wired output"
            );
            let port = OutputPort {
                source: agent,
                sink,
                callback,
            };
            parts.outputs.insert(key, Box::new(port));
            Ok(())
        }));
        self
    }

    /// Resolve every element in declaration order
    ///
    /// On error nothing of the partially wired graph survives.
    pub fn build(self) -> Result<System> {
        let system_id = format!("system-{}", Uuid::new_v4());
        let mut parts = Parts::default();
        for step in self.steps {
            if let Err(e) = step(&mut parts, &self.name) {
                warn!(system = %self.name, error = %e, "System construction failed");
                return Err(e);
            }
        }

        info!(
            system = %self.name,
            system_id = %system_id,
            components = parts.components.len(),
            inputs = parts.inputs.len(),
            outputs = parts.outputs.len(),
            "Built system"
        );

        Ok(System {
            name: self.name,
            system_id,
            components: parts.components,
            inputs: parts.inputs,
            outputs: parts.outputs,
            status: Mutex::new(SystemStatus::Created),
        })
    }
}

/// An immutable graph of agents with a shared lifecycle
pub struct System {
    name: String,
    system_id: String,
    components: ComponentRegistry,
    inputs: HashMap<MessageKey, Port>,
    outputs: HashMap<MessageKey, Port>,
    status: Mutex<SystemStatus>,
}

impl System {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> SystemStatus {
        *self.status.lock()
    }

    /// Start every component in declaration order
    ///
    /// If a component fails to start, the ones already started are finished
    /// again before the error is returned.
    pub fn start(&self) -> Result<()> {
        let mut status = self.status.lock();
        if *status == SystemStatus::Running {
            return Err(AgentError::AlreadyRunning(self.name.clone()));
        }

        for (idx, agent) in self.components.iter().enumerate() {
            if let Err(e) = agent.start() {
                warn!(
                    system = %self.name,
                    agent = %agent.name(),
                    error = %e,
                    "Component failed to start, rolling back"
                );
                for started in self.components.iter().take(idx) {
                    if let Err(e) = started.finish() {
                        warn!(
                            system = %self.name,
                            agent = %started.name(),
                            error = %e,
                            "Rollback finish failed"
                        );
                    }
                }
                return Err(e);
            }
        }

        *status = SystemStatus::Running;
        info!(system = %self.name, system_id = %self.system_id, "System started");
        Ok(())
    }

    /// Finish every component in declaration order
    ///
    /// All components are finished even if some fail; the first error is
    /// returned.
    pub fn finish(&self) -> Result<()> {
        let mut status = self.status.lock();
        let mut first_error = None;
        for agent in self.components.iter() {
            if let Err(e) = agent.finish() {
                warn!(
                    system = %self.name,
                    agent = %agent.name(),
                    error = %e,
                    "Component finished with error"
                );
                first_error.get_or_insert(e);
            }
        }
        *status = SystemStatus::Stopped;
        info!(system = %self.name, system_id = %self.system_id, "System finished");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Inject a message through the declared input for `M`
    pub fn input<M: Message>(&self, msg: M) -> Result<()> {
        let key = MessageKey::of::<M>();
        let port = self
            .inputs
            .get(&key)
            .and_then(|p| p.downcast_ref::<InputPort<M>>())
            .ok_or(AgentError::NoInput(key.short_name()))?;
        tracing::trace!(system = %self.name, agent = %port.target, "External input");
        port.receiver.input(msg)
    }

    /// Register (or replace) the callback for the declared output for `M`
    pub fn set_callback<M, F>(&self, callback: F) -> Result<()>
    where
        M: Message,
        F: Fn(M) + Send + Sync + 'static,
    {
        let port = self.output_port::<M>()?;
        *port.callback.write() = Some(Arc::new(callback));
        debug!(
            system = %self.name,
            source = %port.source,
            message_type = MessageKey::of::<M>().short_name(),
            "Output callback set"
        );
        Ok(())
    }

    /// Remove the callback for `M`; later messages are discarded
    pub fn clear_callback<M: Message>(&self) -> Result<()> {
        *self.output_port::<M>()?.callback.write() = None;
        Ok(())
    }

    /// The sink agent behind the output for `M`
    pub fn output_sink<M: Message>(&self) -> Result<&Agent> {
        self.output_port::<M>().map(|port| &port.sink)
    }

    /// A declared component
    pub fn component(&self, name: &str) -> Result<&Agent> {
        self.components.get(name)
    }

    /// Component names in declaration order
    pub fn component_names(&self) -> Vec<&str> {
        self.components.names()
    }

    fn output_port<M: Message>(&self) -> Result<&OutputPort<M>> {
        let key = MessageKey::of::<M>();
        self.outputs
            .get(&key)
            .and_then(|p| p.downcast_ref::<OutputPort<M>>())
            .ok_or(AgentError::NoOutput(key.short_name()))
    }
}

impl Drop for System {
    fn drop(&mut self) {
        if *self.status.get_mut() == SystemStatus::Running {
            if let Err(e) = self.finish() {
                warn!(system = %self.name, error = %e, "Finish during drop failed");
            }
        }
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("system_id", &self.system_id)
            .field("status", &self.status())
            .field("components", &self.component_names())
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}
