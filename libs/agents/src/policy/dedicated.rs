//! Dedicated-Thread Receive Policy
//!
//! Each agent instance owns one worker thread and one FIFO queue per
//! receivable message type. Senders only take a short lock to enqueue and
//! signal; every handler runs on the worker.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start()--> Running --finish()--> Stopping --join--> Idle
//!                      |
//!                      +-- handler fault or panic --> Failed --finish()--> Idle
//! ```
//!
//! # Shutdown semantics
//!
//! The worker honours the exit request only when every queue is empty under
//! the shared lock, so everything enqueued before the worker observes the
//! request is handled before `finish` returns. Messages enqueued after the
//! worker has exited stay queued and are handled by the next `start`.
//! `finish` waits for in-flight handlers without a timeout.

use super::queue::{drain_all, Drain, Mailbox};
use super::{PolicyKind, ReceivePolicy};
use crate::capability::{Handler, Receiver};
use crate::config::WorkerConfig;
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::metrics::AgentMetrics;
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

/// Worker thread state of a dedicated-thread agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    Running,
    Stopping,
    /// The worker exited because a handler returned an error or panicked
    Failed,
}

pub struct DedicatedThread {
    shared: Arc<WorkerShared>,
    worker: Mutex<Option<JoinHandle<Result<()>>>>,
    config: WorkerConfig,
}

struct WorkerShared {
    /// Shared lock for all queues of the instance; guards the exit flag too
    state: Mutex<WorkerState>,
    signal: Condvar,
    pending: Arc<AtomicUsize>,
    queues: RwLock<Vec<Arc<dyn Drain>>>,
}

struct WorkerState {
    agent: String,
    exit: bool,
    phase: WorkerPhase,
}

impl DedicatedThread {
    pub fn new() -> Self {
        Self::with_config(WorkerConfig::default())
    }

    pub fn with_config(config: WorkerConfig) -> Self {
        Self {
            shared: Arc::new(WorkerShared {
                state: Mutex::new(WorkerState {
                    agent: String::new(),
                    exit: false,
                    phase: WorkerPhase::Idle,
                }),
                signal: Condvar::new(),
                pending: Arc::new(AtomicUsize::new(0)),
                queues: RwLock::new(Vec::new()),
            }),
            worker: Mutex::new(None),
            config,
        }
    }

    pub fn phase(&self) -> WorkerPhase {
        self.shared.state.lock().phase
    }

    /// Messages queued and not yet handled
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    fn thread_name(&self, agent: &str) -> String {
        format!("{}-{}", self.config.thread_name_prefix, agent)
    }
}

impl Default for DedicatedThread {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the worker failed when a handler unwinds through the loop
struct PanicMarker<'a>(&'a WorkerShared);

impl Drop for PanicMarker<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let mut state = self.0.state.lock();
            state.phase = WorkerPhase::Failed;
            error!(agent = %state.agent, "Handler panicked, worker thread exiting");
        }
    }
}

impl WorkerShared {
    /// Worker loop: drain everything, then sleep until signalled
    fn run(self: Arc<Self>) -> Result<()> {
        let _marker = PanicMarker(&self);
        loop {
            if let Err(e) = self.drain() {
                let mut state = self.state.lock();
                state.phase = WorkerPhase::Failed;
                error!(
                    agent = %state.agent,
                    error = %e,
                    pending = self.pending.load(Ordering::SeqCst),
                    "Handler fault, worker thread exiting"
                );
                return Err(e);
            }

            let mut state = self.state.lock();
            if self.pending.load(Ordering::SeqCst) > 0 {
                continue;
            }
            if state.exit {
                debug!(agent = %state.agent, "Queues empty, worker thread exiting");
                return Ok(());
            }
            self.signal.wait(&mut state);
        }
    }

    fn drain(&self) -> Result<usize> {
        let queues = self.queues.read_recursive();
        drain_all(&queues, &self.pending)
    }

    fn request_exit(&self) -> String {
        let mut state = self.state.lock();
        state.exit = true;
        if state.phase == WorkerPhase::Running {
            state.phase = WorkerPhase::Stopping;
        }
        self.signal.notify_all();
        state.agent.clone()
    }
}

/// Join a worker after requesting exit and translate its outcome
fn join_worker(shared: &WorkerShared, handle: JoinHandle<Result<()>>) -> Result<()> {
    let agent = shared.request_exit();
    let outcome = handle.join();
    shared.state.lock().phase = WorkerPhase::Idle;
    match outcome {
        Ok(Ok(())) => {
            info!(agent = %agent, "Worker thread stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            warn!(agent = %agent, error = %e, "Worker thread had stopped on a handler fault");
            Err(e)
        }
        Err(_) => {
            error!(agent = %agent, "Worker thread panicked");
            Err(AgentError::WorkerPanicked(agent))
        }
    }
}

struct ThreadedInbox<M: Message> {
    shared: Arc<WorkerShared>,
    mailbox: Arc<Mailbox<M>>,
}

impl<M: Message> Receiver<M> for ThreadedInbox<M> {
    fn input(&self, msg: M) -> Result<()> {
        let _state = self.shared.state.lock();
        self.mailbox.push(msg);
        self.shared.signal.notify_all();
        Ok(())
    }
}

impl ReceivePolicy for DedicatedThread {
    fn kind(&self) -> PolicyKind {
        PolicyKind::DedicatedThread
    }

    fn start(&self, agent: &str) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(AgentError::AlreadyRunning(agent.to_string()));
        }

        {
            let mut state = self.shared.state.lock();
            state.agent = agent.to_string();
            state.exit = false;
            state.phase = WorkerPhase::Running;
        }

        let name = self.thread_name(agent);
        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let shared = Arc::clone(&self.shared);
        let handle = builder.spawn(move || shared.run()).map_err(|source| {
            self.shared.state.lock().phase = WorkerPhase::Idle;
            AgentError::Spawn {
                agent: agent.to_string(),
                source,
            }
        })?;
        *worker = Some(handle);

        info!(
            agent = %agent,
            thread = %name,
            pending = self.pending(),
            "Worker thread started"
        );
        Ok(())
    }

    fn finish(&self, agent: &str) -> Result<()> {
        let handle = self.worker.lock().take();
        match handle {
            Some(handle) => join_worker(&self.shared, handle),
            None => {
                trace!(agent = %agent, "Finish on idle worker (no-op)");
                Ok(())
            }
        }
    }

    fn attach<M: Message>(
        &self,
        handler: Handler<M>,
        metrics: Arc<AgentMetrics>,
    ) -> Arc<dyn Receiver<M>> {
        let mailbox = Arc::new(Mailbox::new(handler, self.shared.pending.clone(), metrics));
        self.shared.queues.write().push(mailbox.clone());
        Arc::new(ThreadedInbox {
            shared: self.shared.clone(),
            mailbox,
        })
    }
}

impl Drop for DedicatedThread {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.get_mut().take() {
            if let Err(e) = join_worker(&self.shared, handle) {
                warn!(error = %e, "Worker stopped with error during drop");
            }
        }
    }
}
