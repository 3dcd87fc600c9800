//! Network lifecycle orchestration
//!
//! A [`Network`] owns the node handles of one running test network. It is
//! created by [`Network::start`], waited on with [`Network::ready`] and torn
//! down with [`Network::stop`]:
//!
//! ```text
//! Created -> Starting -> { Ready | Failed | TimedOut } -> Stopping -> Stopped
//! ```
//!
//! `start` either launches every node or stops the ones it already launched
//! before returning the error. `ready` races the readiness of all nodes
//! against a mandatory timeout; the first node failure ends the wait.

use futures::future::{try_join_all, BoxFuture};
use netrunner_core::{NetworkConfig, NodeKind};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LaunchConfig;
use crate::error::{NetworkError, Result};
use crate::node::{wait_settled, NodeHandle, NodeLaunch, NodeLauncher};

/// Lifecycle state of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// Nodes are being launched
    Created,
    /// All nodes launched, readiness not yet confirmed
    Starting,
    /// Every node is ready
    Ready,
    /// A node failed to become ready
    Failed,
    /// Readiness was not reached in time
    TimedOut,
    /// Nodes are being stopped
    Stopping,
    /// Every node received a stop attempt
    Stopped,
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkState::Created => "created",
            NetworkState::Starting => "starting",
            NetworkState::Ready => "ready",
            NetworkState::Failed => "failed",
            NetworkState::TimedOut => "timed out",
            NetworkState::Stopping => "stopping",
            NetworkState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A running test network
pub struct Network<H: NodeHandle> {
    name: String,
    state: NetworkState,
    nodes: Vec<H>,
}

impl<H: NodeHandle> Network<H> {
    /// Launch one node per entry of `config`, in config order.
    ///
    /// Every node's executable is resolved before anything is spawned, so a
    /// missing binary leaves nothing running. If a launch fails, the nodes
    /// launched before it are stopped before the error is returned.
    pub async fn start<L>(
        launcher: &L,
        launch_config: &LaunchConfig,
        config: &NetworkConfig,
    ) -> Result<Self>
    where
        L: NodeLauncher<Handle = H>,
    {
        if config.node_configs.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }

        let binaries = (0..config.node_count())
            .map(|index| {
                let kind = launch_config.kind_of(index);
                launch_config
                    .binaries
                    .resolve(kind)
                    .map(|binary| (kind, binary))
            })
            .collect::<netrunner_core::Result<Vec<(NodeKind, &Path)>>>()?;

        for index in &launch_config.byzantine_nodes {
            if *index >= config.node_count() {
                warn!(network = %config.name, node = index, "Byzantine index beyond network size, ignored");
            }
        }

        info!(network = %config.name, nodes = config.node_count(), "Starting network");

        let mut network = Self {
            name: config.name.clone(),
            state: NetworkState::Created,
            nodes: Vec::with_capacity(config.node_count()),
        };

        for (index, (kind, binary)) in binaries.into_iter().enumerate() {
            let launch = NodeLaunch {
                index,
                kind,
                binary,
                network: config,
            };

            match launcher.launch(launch).await {
                Ok(handle) => {
                    debug!(network = %network.name, node = index, %kind, "Node launched");
                    network.nodes.push(handle);
                }
                Err(source) => {
                    warn!(
                        network = %network.name,
                        node = index,
                        error = %source,
                        "Node launch failed, stopping {} launched node(s)",
                        network.nodes.len()
                    );
                    if let Err(e) = network.stop().await {
                        warn!(network = %network.name, error = %e, "Rollback after failed launch did not stop cleanly");
                    }
                    return Err(NetworkError::NodeLaunch { node: index, source });
                }
            }
        }

        network.state = NetworkState::Starting;
        Ok(network)
    }

    /// Wait until every node is ready, any node fails, or `timeout` elapses.
    ///
    /// The first node failure observed is returned without waiting for the
    /// remaining nodes. The network is not stopped on failure or timeout;
    /// call [`Network::stop`] afterwards.
    pub async fn ready(&mut self, timeout: Duration) -> Result<()> {
        match self.state {
            NetworkState::Ready => return Ok(()),
            NetworkState::Starting | NetworkState::Failed | NetworkState::TimedOut => {}
            state => {
                return Err(NetworkError::InvalidState {
                    operation: "await",
                    state,
                })
            }
        }

        debug!(network = %self.name, ?timeout, "Waiting for network readiness");

        let all_ready = try_join_all(self.nodes.iter().map(|node| {
            let index = node.index();
            let status = node.status();
            async move {
                wait_settled(status)
                    .await
                    .map_err(|source| NetworkError::NodeLaunch { node: index, source })
            }
        }));

        let outcome = tokio::select! {
            biased;
            result = all_ready => result.map(|_| ()),
            _ = tokio::time::sleep(timeout) => Err(NetworkError::StartupTimeout {
                duration_ms: timeout.as_millis() as u64,
            }),
        };

        self.state = match &outcome {
            Ok(()) => {
                info!(network = %self.name, nodes = self.nodes.len(), "Network ready");
                NetworkState::Ready
            }
            Err(e) if e.is_timeout() => {
                warn!(network = %self.name, "{}", e);
                NetworkState::TimedOut
            }
            Err(e) => {
                warn!(network = %self.name, "{}", e);
                NetworkState::Failed
            }
        };

        outcome
    }

    /// Stop every node and release the handles.
    ///
    /// Every node gets a stop attempt even when others fail. All failures are
    /// logged and the first one, in node order, is returned. The network is
    /// `Stopped` afterwards either way; stopping again is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == NetworkState::Stopped {
            debug!(network = %self.name, "Network already stopped");
            return Ok(());
        }

        self.state = NetworkState::Stopping;
        info!(network = %self.name, nodes = self.nodes.len(), "Stopping network");

        let results =
            futures::future::join_all(self.nodes.iter_mut().map(|node| async move {
                let index = node.index();
                (index, node.stop().await)
            }))
            .await;

        let mut first_error = None;
        for (index, result) in results {
            if let Err(source) = result {
                warn!(network = %self.name, node = index, error = %source, "Failed to stop node");
                if first_error.is_none() {
                    first_error = Some(NetworkError::ShutdownFailure {
                        node: index,
                        source,
                    });
                }
            }
        }

        self.nodes.clear();
        self.state = NetworkState::Stopped;
        info!(network = %self.name, "Network stopped");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Start a network, wait for it, run `scenario` against it, and stop it.
    ///
    /// The network is stopped on every path once started. A readiness or
    /// scenario error takes precedence over a stop error, which is then only
    /// logged.
    pub async fn run_scoped<L, F, T, E>(
        launcher: &L,
        launch_config: &LaunchConfig,
        config: &NetworkConfig,
        timeout: Duration,
        scenario: F,
    ) -> std::result::Result<T, E>
    where
        L: NodeLauncher<Handle = H>,
        F: for<'n> FnOnce(&'n mut Network<H>) -> BoxFuture<'n, std::result::Result<T, E>>,
        E: From<NetworkError>,
    {
        let mut network = Self::start(launcher, launch_config, config).await?;

        let outcome = match network.ready(timeout).await {
            Ok(()) => scenario(&mut network).await,
            Err(e) => Err(E::from(e)),
        };
        let stopped = network.stop().await;

        match outcome {
            Ok(value) => stopped.map(|_| value).map_err(E::from),
            Err(err) => {
                if let Err(stop_err) = stopped {
                    warn!(network = %network.name, error = %stop_err, "Stop after failed scenario did not complete cleanly");
                }
                Err(err)
            }
        }
    }

    /// Network label from the config
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> NetworkState {
        self.state
    }

    /// Number of live node handles
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Live node handles in node order
    pub fn nodes(&self) -> &[H] {
        &self.nodes
    }

    /// Handle of the node at `index`
    pub fn node(&self, index: usize) -> Option<&H> {
        self.nodes.get(index)
    }
}

impl<H: NodeHandle> Drop for Network<H> {
    fn drop(&mut self) {
        if !self.nodes.is_empty() {
            warn!(
                network = %self.name,
                nodes = self.nodes.len(),
                "Network dropped without stop; node handles are released without a clean stop"
            );
        }
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod network_tests;
