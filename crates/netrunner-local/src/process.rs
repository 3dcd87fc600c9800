//! Local process supervisor
//!
//! [`ProcessLauncher`] runs every node as a child process of the current
//! process. Each node gets a working directory holding its launch material
//! and a `process.log` capturing stdout and stderr. One monitor task per node
//! probes health, watches for the process exiting and serves stop requests.
//!
//! A node whose config file declares `http-port` is healthy once that port
//! accepts TCP connections. Otherwise it is healthy once it has stayed alive
//! for the startup grace period.

use async_trait::async_trait;
use netrunner_core::NodeConfig;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::LaunchConfig;
use crate::error::NodeError;
use crate::node::{NodeHandle, NodeLaunch, NodeLauncher, NodeStatus};

/// Captured stdout/stderr of the node process
pub const PROCESS_LOG_FILE: &str = "process.log";

const CONFIG_FILE: &str = "config.json";
const GENESIS_FILE: &str = "genesis.json";
const STAKING_KEY_FILE: &str = "staking.key";
const STAKING_CERT_FILE: &str = "staking.crt";
const CHAIN_CONFIG_DIR: &str = "chains";
const CCHAIN_ALIAS: &str = "C";
const LOG_DIR: &str = "logs";
const DB_DIR: &str = "db";

const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Runtime facts about a node process
#[derive(Debug, Clone, Default)]
pub struct NodeStats {
    /// OS process id, while known
    pub pid: Option<u32>,
    /// Time from spawn until healthy
    pub ready_after: Option<Duration>,
    /// Exit description, once the process has exited on its own
    pub exit: Option<String>,
    /// Health probes performed
    pub health_probes: u64,
}

/// Commands sent to a node's monitor task
#[derive(Debug)]
enum NodeCommand {
    /// Terminate the process and report the outcome
    Stop {
        response: oneshot::Sender<Result<(), NodeError>>,
    },
}

/// How a node proves it is healthy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheck {
    /// The node accepts TCP connections on its HTTP endpoint
    Tcp { host: String, port: u16 },
    /// The node stayed alive for the grace period
    Alive { grace: Duration },
}

impl HealthCheck {
    /// Pick the health check for a node from its config file
    pub fn for_node(node: &NodeConfig, grace: Duration) -> Self {
        match node.config_port("http-port") {
            Some(port) => {
                let host = node
                    .config_value("http-host")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .filter(|h| !h.is_empty())
                    .unwrap_or_else(|| DEFAULT_HTTP_HOST.to_string());
                HealthCheck::Tcp { host, port }
            }
            None => HealthCheck::Alive { grace },
        }
    }

    async fn probe(&self, spawned_at: Instant) -> bool {
        match self {
            HealthCheck::Tcp { host, port } => matches!(
                tokio::time::timeout(
                    PROBE_CONNECT_TIMEOUT,
                    TcpStream::connect((host.as_str(), *port))
                )
                .await,
                Ok(Ok(_))
            ),
            HealthCheck::Alive { grace } => spawned_at.elapsed() >= *grace,
        }
    }
}

/// Launches nodes as local child processes
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    work_dir: Option<PathBuf>,
    health_poll_interval: Duration,
    startup_grace: Duration,
    stop_timeout: Duration,
}

impl ProcessLauncher {
    /// Create a launcher using the timings and working directory of `config`
    pub fn new(config: &LaunchConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            health_poll_interval: config.health_poll_interval(),
            startup_grace: config.startup_grace(),
            stop_timeout: config.stop_timeout(),
        }
    }

    fn node_dir(&self, index: usize) -> Result<(PathBuf, Option<TempDir>), NodeError> {
        match &self.work_dir {
            Some(root) => {
                let dir = root.join(format!("node{}", index));
                std::fs::create_dir_all(&dir)?;
                Ok((dir, None))
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix(&format!("netrunner-node{}-", index))
                    .tempdir()?;
                Ok((temp.path().to_path_buf(), Some(temp)))
            }
        }
    }
}

/// Paths of the launch material written for one node
#[derive(Debug)]
struct NodeFiles {
    config: PathBuf,
    genesis: PathBuf,
    staking_key: PathBuf,
    staking_cert: PathBuf,
    chain_config_dir: PathBuf,
    log_dir: PathBuf,
    db_dir: PathBuf,
}

impl NodeFiles {
    fn write(dir: &Path, launch: &NodeLaunch<'_>) -> Result<Self, NodeError> {
        let node = launch.node();
        let files = Self {
            config: dir.join(CONFIG_FILE),
            genesis: dir.join(GENESIS_FILE),
            staking_key: dir.join(STAKING_KEY_FILE),
            staking_cert: dir.join(STAKING_CERT_FILE),
            chain_config_dir: dir.join(CHAIN_CONFIG_DIR),
            log_dir: dir.join(LOG_DIR),
            db_dir: dir.join(DB_DIR),
        };

        std::fs::write(&files.config, &node.config_file)?;
        std::fs::write(&files.genesis, &launch.network.genesis)?;
        std::fs::write(&files.staking_key, &node.staking_key)?;
        std::fs::write(&files.staking_cert, &node.staking_cert)?;

        let cchain_dir = files.chain_config_dir.join(CCHAIN_ALIAS);
        std::fs::create_dir_all(&cchain_dir)?;
        std::fs::write(cchain_dir.join(CONFIG_FILE), &node.c_chain_config_file)?;

        std::fs::create_dir_all(&files.log_dir)?;
        std::fs::create_dir_all(&files.db_dir)?;

        Ok(files)
    }

    fn args(&self, launch: &NodeLaunch<'_>) -> Vec<String> {
        let mut args = vec![
            format!("--config-file={}", self.config.display()),
            format!("--genesis={}", self.genesis.display()),
            format!("--staking-tls-key-file={}", self.staking_key.display()),
            format!("--staking-tls-cert-file={}", self.staking_cert.display()),
            format!("--chain-config-dir={}", self.chain_config_dir.display()),
            format!("--log-dir={}", self.log_dir.display()),
            format!("--db-dir={}", self.db_dir.display()),
        ];
        if !launch.network.log_level.is_empty() {
            args.push(format!("--log-level={}", launch.network.log_level));
        }

        let bootstrap_ips = bootstrap_ips(launch);
        if !bootstrap_ips.is_empty() {
            args.push(format!("--bootstrap-ips={}", bootstrap_ips.join(",")));
        }
        args
    }
}

/// Staking endpoints of the other beacons that declare a `staking-port`
fn bootstrap_ips(launch: &NodeLaunch<'_>) -> Vec<String> {
    launch
        .peer_beacons()
        .filter_map(|(_, beacon)| beacon.config_port("staking-port"))
        .map(|port| format!("127.0.0.1:{}", port))
        .collect()
}

#[async_trait]
impl NodeLauncher for ProcessLauncher {
    type Handle = LocalNode;

    async fn launch(&self, launch: NodeLaunch<'_>) -> Result<LocalNode, NodeError> {
        let name = launch.name();
        let (dir, temp_dir) = self.node_dir(launch.index)?;
        let files = NodeFiles::write(&dir, &launch)?;

        let log_file = std::fs::File::create(dir.join(PROCESS_LOG_FILE))?;
        let mut command = Command::new(launch.binary);
        command
            .args(files.args(&launch))
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(log_file.try_clone()?)
            .stderr(log_file)
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| NodeError::Spawn {
            binary: launch.binary.display().to_string(),
            reason: e.to_string(),
        })?;

        let stats = Arc::new(RwLock::new(NodeStats {
            pid: child.id(),
            ..Default::default()
        }));
        info!(
            node = %name,
            kind = %launch.kind,
            pid = ?child.id(),
            dir = %dir.display(),
            "Spawned node process"
        );

        let (status_tx, status_rx) = watch::channel(NodeStatus::Starting);
        let (command_tx, command_rx) = mpsc::channel(4);

        let monitor = NodeMonitor {
            name: name.clone(),
            child,
            health: HealthCheck::for_node(launch.node(), self.startup_grace),
            poll_interval: self.health_poll_interval,
            stop_timeout: self.stop_timeout,
            status_tx,
            command_rx,
            stats: stats.clone(),
            _temp_dir: temp_dir,
        };
        tokio::spawn(monitor.run());

        Ok(LocalNode {
            index: launch.index,
            name,
            dir,
            status_rx,
            command_tx,
            stats,
            stopped: false,
        })
    }
}

/// Handle to a node running as a local child process
pub struct LocalNode {
    index: usize,
    name: String,
    dir: PathBuf,
    status_rx: watch::Receiver<NodeStatus>,
    command_tx: mpsc::Sender<NodeCommand>,
    stats: Arc<RwLock<NodeStats>>,
    stopped: bool,
}

impl LocalNode {
    /// The node's working directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the captured process output
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(PROCESS_LOG_FILE)
    }

    /// Read the captured process output
    pub fn log_contents(&self) -> Result<String, NodeError> {
        Ok(std::fs::read_to_string(self.log_path())?)
    }

    /// Snapshot of the node's runtime facts
    pub fn stats(&self) -> NodeStats {
        self.stats.read().clone()
    }
}

#[async_trait]
impl NodeHandle for LocalNode {
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
            debug!(node = %self.name, "Node already stopped");
            return Ok(());
        }
        self.stopped = true;

        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(NodeCommand::Stop { response: tx })
            .await
            .map_err(|_| NodeError::MonitorGone)?;

        rx.await.map_err(|_| NodeError::MonitorGone)?
    }
}

/// Watches one node process; sole writer of its status
struct NodeMonitor {
    name: String,
    child: Child,
    health: HealthCheck,
    poll_interval: Duration,
    stop_timeout: Duration,
    status_tx: watch::Sender<NodeStatus>,
    command_rx: mpsc::Receiver<NodeCommand>,
    stats: Arc<RwLock<NodeStats>>,
    // Removed once the process is gone
    _temp_dir: Option<TempDir>,
}

impl NodeMonitor {
    async fn run(mut self) {
        let spawned_at = Instant::now();
        let mut probe = tokio::time::interval(self.poll_interval);
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Ok = clean exit, Err = abnormal exit description
        let mut exit: Option<Result<(), String>> = None;

        loop {
            let starting = !self.status_tx.borrow().is_settled();

            tokio::select! {
                result = self.child.wait(), if exit.is_none() => {
                    let outcome = match result {
                        Ok(status) if status.success() => Ok(()),
                        Ok(status) => Err(status.to_string()),
                        Err(e) => Err(format!("failed to wait on process: {}", e)),
                    };
                    let description = match &outcome {
                        Ok(()) => "exit status: 0".to_string(),
                        Err(desc) => desc.clone(),
                    };

                    {
                        let mut stats = self.stats.write();
                        stats.exit = Some(description.clone());
                        stats.pid = None;
                    }

                    if starting {
                        warn!(node = %self.name, "Node process exited before becoming healthy: {}", description);
                        self.status_tx.send_replace(NodeStatus::Failed(format!(
                            "process exited before becoming healthy ({})",
                            description
                        )));
                    } else {
                        warn!(node = %self.name, "Node process exited: {}", description);
                    }
                    exit = Some(outcome);
                }

                _ = probe.tick(), if starting && exit.is_none() => {
                    self.stats.write().health_probes += 1;
                    if self.health.probe(spawned_at).await {
                        let elapsed = spawned_at.elapsed();
                        self.stats.write().ready_after = Some(elapsed);
                        info!(node = %self.name, "Node healthy after {:?}", elapsed);
                        self.status_tx.send_replace(NodeStatus::Ready);
                    }
                }

                command = self.command_rx.recv() => {
                    let result = self.terminate(&exit).await;
                    if !self.status_tx.borrow().is_settled() {
                        self.status_tx
                            .send_replace(NodeStatus::Failed("node stopped before becoming healthy".to_string()));
                    }

                    match command {
                        Some(NodeCommand::Stop { response }) => {
                            let _ = response.send(result);
                        }
                        // Handle dropped without stopping
                        None => {
                            if let Err(e) = result {
                                warn!(node = %self.name, "Node handle dropped: {}", e);
                            }
                        }
                    }
                    break;
                }
            }
        }

        debug!(node = %self.name, "Node monitor stopped");
    }

    async fn terminate(&mut self, exit: &Option<Result<(), String>>) -> Result<(), NodeError> {
        if let Some(outcome) = exit {
            return outcome
                .clone()
                .map_err(|status| NodeError::Exited { status });
        }

        // Exited but not yet observed
        if let Ok(Some(status)) = self.child.try_wait() {
            return if status.success() {
                Ok(())
            } else {
                Err(NodeError::Exited {
                    status: status.to_string(),
                })
            };
        }

        debug!(node = %self.name, "Killing node process");
        self.child.start_kill()?;

        match tokio::time::timeout(self.stop_timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.stats.write().pid = None;
                info!(node = %self.name, "Node process stopped ({})", status);
                Ok(())
            }
            Ok(Err(e)) => Err(NodeError::Io(e.to_string())),
            Err(_) => Err(NodeError::StopTimeout {
                timeout_ms: self.stop_timeout.as_millis() as u64,
            }),
        }
    }
}
