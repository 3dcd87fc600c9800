//! Node handle contract
//!
//! The orchestrator only sees nodes through [`NodeHandle`]: a status signal
//! that leaves [`NodeStatus::Starting`] at most once, for either `Ready` or
//! `Failed`, and a stop operation. [`NodeLauncher`] turns launch material
//! into a running handle.

use async_trait::async_trait;
use netrunner_core::{NetworkConfig, NodeConfig, NodeKind};
use std::fmt;
use std::path::Path;
use tokio::sync::watch;

use crate::error::NodeError;

/// Health state published by a node's monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    /// Launched, not yet healthy
    Starting,
    /// Healthy and serving
    Ready,
    /// Will never become healthy
    Failed(String),
}

impl NodeStatus {
    /// Whether the node has left `Starting`
    pub fn is_settled(&self) -> bool {
        !matches!(self, NodeStatus::Starting)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Starting => write!(f, "starting"),
            NodeStatus::Ready => write!(f, "ready"),
            NodeStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// A running node as seen by the orchestrator
#[async_trait]
pub trait NodeHandle: Send + Sync {
    /// Position of the node in the network config
    fn index(&self) -> usize;

    /// Name used in logs
    fn name(&self) -> &str;

    /// Subscribe to the node's status
    fn status(&self) -> watch::Receiver<NodeStatus>;

    /// Stop the node.
    ///
    /// Calling this again after it returned is a no-op returning `Ok`.
    async fn stop(&mut self) -> Result<(), NodeError>;
}

/// Everything a launcher needs to start one node
#[derive(Debug, Clone, Copy)]
pub struct NodeLaunch<'a> {
    /// Position of the node in the network config
    pub index: usize,
    /// Role of the node
    pub kind: NodeKind,
    /// Executable to run
    pub binary: &'a Path,
    /// The whole network, for genesis, log level and beacons
    pub network: &'a NetworkConfig,
}

impl<'a> NodeLaunch<'a> {
    /// This node's launch material
    pub fn node(&self) -> &'a NodeConfig {
        &self.network.node_configs[self.index]
    }

    /// Name used in logs
    pub fn name(&self) -> String {
        format!("node{}", self.index)
    }

    /// Beacons other than this node
    pub fn peer_beacons(&self) -> impl Iterator<Item = (usize, &'a NodeConfig)> + 'a {
        let own = self.index;
        self.network.beacons().filter(move |(i, _)| *i != own)
    }
}

/// Starts node processes
#[async_trait]
pub trait NodeLauncher: Send + Sync {
    /// Handle type produced by this launcher
    type Handle: NodeHandle;

    /// Launch one node; returns once the node is started, not once it is healthy
    async fn launch(&self, launch: NodeLaunch<'_>) -> Result<Self::Handle, NodeError>;
}

/// Wait until the node settles.
///
/// Resolves `Ok` once the node is ready and an error once it failed. If the
/// status writer disappears while the node is still starting, the node can
/// never settle and [`NodeError::MonitorGone`] is returned.
pub async fn wait_settled(mut status: watch::Receiver<NodeStatus>) -> Result<(), NodeError> {
    loop {
        let current = status.borrow_and_update().clone();
        match current {
            NodeStatus::Ready => return Ok(()),
            NodeStatus::Failed(reason) => return Err(NodeError::Unhealthy(reason)),
            NodeStatus::Starting => {}
        }

        if status.changed().await.is_err() {
            let last = status.borrow().clone();
            return match last {
                NodeStatus::Ready => Ok(()),
                NodeStatus::Failed(reason) => Err(NodeError::Unhealthy(reason)),
                NodeStatus::Starting => Err(NodeError::MonitorGone),
            };
        }
    }
}
