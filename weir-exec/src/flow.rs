use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use uuid::Uuid;

use weir_refs::Store;
use weir_transport::CallContext;

use crate::error::ExecutionError;
use crate::events::{Event, EventSink};
use crate::executor::{self, CompiledNode};

/// Per-node lifecycle. Terminal states never transition; `Skipped` is
/// reachable only through cancellation or a failed predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl NodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

/// Runs a flow's nodes with dependency-ordered parallelism.
///
/// Each invocation launches one worker per node. A worker waits on the
/// completion broadcasts of its predecessors, executes, and broadcasts its
/// own terminal state. The first failure wins, asserts the invocation's
/// cancellation signal, and triggers rollback of every node that succeeded.
pub struct FlowManager {
    pub name: String,
    nodes: Vec<Arc<CompiledNode>>,
    /// Node indices grouped by dependency depth; rollback walks these in
    /// reverse so compensations run in reverse topological order.
    levels: Vec<Vec<usize>>,
    events: Arc<dyn EventSink>,
    rollback_budget: Duration,
}

impl FlowManager {
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<CompiledNode>,
        levels: Vec<Vec<usize>>,
        events: Arc<dyn EventSink>,
        rollback_budget: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            nodes: nodes.into_iter().map(Arc::new).collect(),
            levels,
            events,
            rollback_budget,
        }
    }

    /// A fresh store for one invocation. The invocation exclusively owns it.
    pub fn new_store(&self) -> Store {
        Store::new()
    }

    pub fn nodes(&self) -> &[Arc<CompiledNode>] {
        &self.nodes
    }

    /// Execute all nodes, honoring dependency edges. On failure the
    /// succeeded subset is rolled back and the first observed error is
    /// returned; secondary failures are recorded in events only.
    pub async fn run(
        &self,
        invocation: Uuid,
        ctx: &CallContext,
        store: &Store,
    ) -> Result<(), ExecutionError> {
        let cancel = ctx.cancel.clone();

        // Deadline watchdog: asserts the invocation's cancellation signal.
        // Aborted once every worker reached a terminal state.
        let watchdog = ctx.deadline.map(|deadline| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                cancel.cancel();
            })
        });

        let mut senders = Vec::with_capacity(self.nodes.len());
        let mut receivers = Vec::with_capacity(self.nodes.len());
        for _ in &self.nodes {
            let (tx, rx) = watch::channel(NodeState::Pending);
            senders.push(tx);
            receivers.push(rx);
        }

        let first_error: Arc<Mutex<Option<ExecutionError>>> = Arc::new(Mutex::new(None));

        let mut handles = Vec::with_capacity(self.nodes.len());
        for (index, tx) in senders.into_iter().enumerate() {
            let node = self.nodes[index].clone();
            let dep_signals: Vec<watch::Receiver<NodeState>> = node
                .deps
                .iter()
                .map(|&dep| receivers[dep].clone())
                .collect();

            let worker = Worker {
                node,
                dep_signals,
                signal: tx,
                ctx: ctx.clone(),
                store: store.clone(),
                first_error: first_error.clone(),
                events: self.events.clone(),
                invocation,
            };
            handles.push(tokio::spawn(worker.run()));
        }

        for handle in handles {
            // Workers never panic; a join error would mean the runtime is
            // shutting down underneath us.
            if handle.await.is_err() {
                warn!(flow = %self.name, "worker join failed");
            }
        }
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let states: Vec<NodeState> = receivers.iter().map(|rx| *rx.borrow()).collect();

        let failure = first_error.lock().expect("error slot poisoned").take();
        let failure = match failure {
            Some(err) => Some(err),
            None if cancel.is_cancelled() => Some(ExecutionError::Cancelled),
            None => None,
        };

        match failure {
            Some(err) => {
                self.rollback(invocation, &states, store).await;
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Roll back exactly the nodes that succeeded, in reverse dependency
    /// order: parallel within a level, levels strictly in sequence. Runs
    /// under its own non-cancellable budget; failures are logged and never
    /// overwrite the original cause.
    async fn rollback(&self, invocation: Uuid, states: &[NodeState], store: &Store) {
        let rollback_ctx = CallContext {
            cancel: CancellationToken::new(),
            deadline: Some(self.rollback_budget),
        };

        let work = async {
            for level in self.levels.iter().rev() {
                let mut handles = Vec::new();
                for &index in level {
                    if states[index] != NodeState::Succeeded {
                        continue;
                    }
                    let node = self.nodes[index].clone();
                    if node.rollback.is_none() {
                        continue;
                    }

                    self.events
                        .emit(Event::RollbackStarted {
                            invocation,
                            node: node.id.clone(),
                        })
                        .await;

                    let ctx = rollback_ctx.clone();
                    let store = store.clone();
                    let events = self.events.clone();
                    handles.push(tokio::spawn(async move {
                        if let Err(err) = executor::execute_rollback(&node, &ctx, &store).await {
                            error!(node = %node.id, %err, "rollback failed");
                            events
                                .emit(Event::RollbackFailed {
                                    invocation,
                                    node: node.id.clone(),
                                    message: err.to_string(),
                                })
                                .await;
                        }
                    }));
                }

                for handle in handles {
                    let _ = handle.await;
                }
            }
        };

        if tokio::time::timeout(self.rollback_budget, work).await.is_err() {
            error!(flow = %self.name, "rollback budget exceeded");
        }
    }
}

struct Worker {
    node: Arc<CompiledNode>,
    dep_signals: Vec<watch::Receiver<NodeState>>,
    signal: watch::Sender<NodeState>,
    ctx: CallContext,
    store: Store,
    first_error: Arc<Mutex<Option<ExecutionError>>>,
    events: Arc<dyn EventSink>,
    invocation: Uuid,
}

impl Worker {
    async fn run(mut self) {
        // Wait for every predecessor to reach a terminal state, or for the
        // invocation to be cancelled, whichever fires first.
        let mut skip = false;
        for signal in &mut self.dep_signals {
            let state = tokio::select! {
                _ = self.ctx.cancel.cancelled() => None,
                state = signal.wait_for(|state| state.is_terminal()) => {
                    state.ok().map(|state| *state)
                }
            };

            match state {
                Some(NodeState::Succeeded) => {}
                _ => {
                    skip = true;
                    break;
                }
            }
        }

        if skip || self.ctx.cancel.is_cancelled() {
            self.signal.send_replace(NodeState::Skipped);
            self.events
                .emit(Event::NodeSkipped {
                    invocation: self.invocation,
                    node: self.node.id.clone(),
                })
                .await;
            return;
        }

        self.signal.send_replace(NodeState::Running);
        self.events
            .emit(Event::NodeStarted {
                invocation: self.invocation,
                node: self.node.id.clone(),
            })
            .await;

        match executor::execute(&self.node, &self.ctx, &self.store).await {
            Ok(()) => {
                self.signal.send_replace(NodeState::Succeeded);
                self.events
                    .emit(Event::NodeSucceeded {
                        invocation: self.invocation,
                        node: self.node.id.clone(),
                    })
                    .await;
            }
            Err(err) => {
                self.events
                    .emit(Event::NodeFailed {
                        invocation: self.invocation,
                        node: self.node.id.clone(),
                        message: err.to_string(),
                    })
                    .await;

                // First observed failure wins; later ones stay in events.
                {
                    let mut slot = self.first_error.lock().expect("error slot poisoned");
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                }
                self.ctx.cancel.cancel();
                self.signal.send_replace(NodeState::Failed);
            }
        }
    }
}
