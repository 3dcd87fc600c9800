//! Scripted nodes for exercising the orchestrator without processes
//!
//! Each node follows a [`NodeScript`]: become ready or fail after a delay, or
//! stall forever, and optionally fail to launch or to stop. A shared
//! [`Journal`] records launches and stops for assertions.

use async_trait::async_trait;
use netrunner_core::NodeKind;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::NodeError;
use crate::node::{NodeHandle, NodeLaunch, NodeLauncher, NodeStatus};

/// What a scripted node does after launch
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Report ready after the delay
    Ready(Duration),
    /// Report failure after the delay
    Fail(Duration, String),
    /// Never report anything
    Stall,
}

/// Behaviour of one scripted node
#[derive(Debug, Clone)]
pub struct NodeScript {
    pub outcome: ScriptedOutcome,
    pub launch_error: Option<NodeError>,
    pub stop_error: Option<NodeError>,
}

impl NodeScript {
    pub fn ready_after(delay: Duration) -> Self {
        Self {
            outcome: ScriptedOutcome::Ready(delay),
            launch_error: None,
            stop_error: None,
        }
    }

    pub fn fail_after(delay: Duration, reason: impl Into<String>) -> Self {
        Self {
            outcome: ScriptedOutcome::Fail(delay, reason.into()),
            ..Self::stall()
        }
    }

    pub fn stall() -> Self {
        Self {
            outcome: ScriptedOutcome::Stall,
            launch_error: None,
            stop_error: None,
        }
    }

    /// Launching this node fails
    pub fn launch_fails(mut self, err: NodeError) -> Self {
        self.launch_error = Some(err);
        self
    }

    /// Stopping this node fails
    pub fn stop_fails(mut self, err: NodeError) -> Self {
        self.stop_error = Some(err);
        self
    }
}

/// Record of launcher and node activity
#[derive(Debug, Clone, Default)]
pub struct Journal {
    /// (index, kind, binary) per successful launch
    pub launched: Vec<(usize, NodeKind, PathBuf)>,
    /// Indices of nodes whose stop was called, in call order
    pub stopped: Vec<usize>,
}

/// Launcher producing [`ScriptedNode`]s
pub struct ScriptedLauncher {
    scripts: Vec<NodeScript>,
    fallback: NodeScript,
    journal: Arc<Mutex<Journal>>,
}

impl ScriptedLauncher {
    /// One script per node index; nodes beyond the list become ready immediately
    pub fn new(scripts: Vec<NodeScript>) -> Self {
        Self {
            scripts,
            fallback: NodeScript::ready_after(Duration::ZERO),
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// Every node follows `script`
    pub fn uniform(script: NodeScript) -> Self {
        Self {
            scripts: Vec::new(),
            fallback: script,
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// Snapshot of the journal
    pub fn journal(&self) -> Journal {
        self.journal.lock().clone()
    }
}

#[async_trait]
impl NodeLauncher for ScriptedLauncher {
    type Handle = ScriptedNode;

    async fn launch(&self, launch: NodeLaunch<'_>) -> Result<ScriptedNode, NodeError> {
        let script = self
            .scripts
            .get(launch.index)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());

        if let Some(err) = script.launch_error {
            return Err(err);
        }

        self.journal
            .lock()
            .launched
            .push((launch.index, launch.kind, launch.binary.to_path_buf()));

        let (tx, rx) = watch::channel(NodeStatus::Starting);
        let tx = Arc::new(tx);

        match script.outcome {
            ScriptedOutcome::Ready(delay) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    tx.send_replace(NodeStatus::Ready);
                });
            }
            ScriptedOutcome::Fail(delay, reason) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    tx.send_replace(NodeStatus::Failed(reason));
                });
            }
            ScriptedOutcome::Stall => {}
        }

        Ok(ScriptedNode {
            index: launch.index,
            name: launch.name(),
            status_tx: tx,
            status_rx: rx,
            stop_error: script.stop_error,
            stopped: false,
            journal: self.journal.clone(),
        })
    }
}

/// Node driven by a [`NodeScript`]
pub struct ScriptedNode {
    index: usize,
    name: String,
    // Kept so a stalled node never looks abandoned
    status_tx: Arc<watch::Sender<NodeStatus>>,
    status_rx: watch::Receiver<NodeStatus>,
    stop_error: Option<NodeError>,
    stopped: bool,
    journal: Arc<Mutex<Journal>>,
}

impl ScriptedNode {
    /// Push a status from the test body
    pub fn set_status(&self, status: NodeStatus) {
        self.status_tx.send_replace(status);
    }
}

#[async_trait]
impl NodeHandle for ScriptedNode {
    fn index(&self) -> usize {
        self.index
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> watch::Receiver<NodeStatus> {
        self.status_rx.clone()
    }

    async fn stop(&mut self) -> Result<(), NodeError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.journal.lock().stopped.push(self.index);

        match self.stop_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
