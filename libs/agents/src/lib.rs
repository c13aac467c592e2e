//! # Agent Graph
//!
//! Typed message-passing agents wired into static system graphs.
//!
//! ## Architecture
//!
//! - **Agents** bundle user logic with a capability list: every message type
//!   they receive ([`Receive`]) and every message type they send.
//! - **Receive policies** decide when and on which thread a handler runs:
//!   [`Synchronous`], [`DedicatedThread`] or [`NonReentrant`], selected at
//!   runtime through [`Policy`] / [`PolicyKind`].
//! - **Systems** wire agents together once, at construction: components,
//!   connections, external inputs and callback-backed outputs, started and
//!   finished as one unit.
//!
//! Message types are plain Rust types; no base type or framing is imposed.
//!
//! ## Example
//!
//! ```rust
//! use agent_graph::{AgentBuilder, Outbox, PolicyKind, Receive, Result, SystemBuilder};
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//!
//! struct Add(i64, i64);
//! struct Sum(i64);
//!
//! struct Adder;
//!
//! impl Receive<Add> for Adder {
//!     fn receive(&self, msg: Add, outbox: &Outbox) -> Result<()> {
//!         outbox.send(Sum(msg.0 + msg.1))
//!     }
//! }
//!
//! let adder = AgentBuilder::new("adder", Adder, PolicyKind::DedicatedThread)
//!     .receives::<Add>()
//!     .sends::<Sum>()
//!     .build();
//!
//! let system = SystemBuilder::new("calculator")
//!     .component(adder)
//!     .input::<Add>("adder")
//!     .output::<Sum>("adder")
//!     .build()?;
//!
//! let sums = Arc::new(Mutex::new(Vec::new()));
//! let sink = sums.clone();
//! system.set_callback(move |s: Sum| sink.lock().push(s.0))?;
//!
//! system.start()?;
//! system.input(Add(2, 3))?;
//! system.finish()?;
//!
//! assert_eq!(*sums.lock(), vec![5]);
//! # Ok::<(), agent_graph::AgentError>(())
//! ```

pub mod agent;
pub mod capability;
pub mod config;
pub mod error;
pub mod message;
pub mod metrics;
pub mod outbox;
pub mod policy;
pub mod registry;
pub mod system;

pub use agent::{Agent, AgentBuilder};
pub use capability::{DirectSender, Handler, Receive, Receiver, Sender};
pub use config::{RuntimeConfig, WorkerConfig, MIN_STACK_SIZE};
pub use error::{AgentError, Result};
pub use message::{Declaration, Direction, Message, MessageKey};
pub use metrics::{AgentMetrics, MetricsSnapshot};
pub use outbox::Outbox;
pub use policy::{
    DedicatedThread, NonReentrant, Policy, PolicyKind, ReceivePolicy, Synchronous, WorkerPhase,
};
pub use registry::{AgentId, ComponentRegistry};
pub use system::{Callback, OutputSink, System, SystemBuilder, SystemStatus};
