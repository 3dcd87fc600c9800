//! Launch configuration types

use netrunner_core::{BinaryMap, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// How nodes of a network are launched and supervised
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Executable per node kind
    pub binaries: BinaryMap,
    /// Indices of nodes launched with the byzantine executable
    pub byzantine_nodes: BTreeSet<usize>,
    /// Root for per-node working directories (None = temporary directories)
    pub work_dir: Option<PathBuf>,
    /// Interval between health probes in milliseconds
    pub health_poll_interval_ms: u64,
    /// How long a node without an HTTP port must stay alive to count as healthy, in milliseconds
    pub startup_grace_ms: u64,
    /// Upper bound on terminating one node process, in seconds
    pub stop_timeout_secs: u64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            binaries: BinaryMap::default(),
            byzantine_nodes: BTreeSet::new(),
            work_dir: None,
            health_poll_interval_ms: 500,
            startup_grace_ms: 2000,
            stop_timeout_secs: 10,
        }
    }
}

impl LaunchConfig {
    /// Create a configuration using `binaries` and default timings
    pub fn new(binaries: BinaryMap) -> Self {
        Self {
            binaries,
            ..Default::default()
        }
    }

    /// Create a configuration with short timings for local tests
    pub fn local_test(binaries: BinaryMap) -> Self {
        Self {
            binaries,
            health_poll_interval_ms: 50,
            startup_grace_ms: 200,
            stop_timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Mark the given node indices as byzantine
    pub fn with_byzantine(mut self, nodes: impl IntoIterator<Item = usize>) -> Self {
        self.byzantine_nodes.extend(nodes);
        self
    }

    /// Kind of the node at `index`
    pub fn kind_of(&self, index: usize) -> NodeKind {
        if self.byzantine_nodes.contains(&index) {
            NodeKind::Byzantine
        } else {
            NodeKind::Standard
        }
    }

    /// Get the health poll interval as a Duration
    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }

    /// Get the startup grace period as a Duration
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    /// Get the stop timeout as a Duration
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}
