//! Shared fixtures for process integration tests
//!
//! Node executables are replaced by small shell scripts. All scripts are
//! written once, before any test spawns a process, so no script file is
//! still open for writing when another test forks.

use netrunner_core::{BinaryMap, NetworkConfig, NodeConfig, NodeKind};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

/// Stand-in node executables
pub struct Scripts {
    _dir: TempDir,
    /// Runs until killed
    pub long_running: PathBuf,
    /// Complains on stderr and exits with status 3
    pub failing: PathBuf,
    /// Prints one argument per line, then runs until killed
    pub echo_args: PathBuf,
}

static SCRIPTS: OnceLock<Scripts> = OnceLock::new();

/// Scripts shared by every test in the binary
pub fn scripts() -> &'static Scripts {
    SCRIPTS.get_or_init(|| {
        let dir = tempfile::Builder::new()
            .prefix("netrunner-scripts-")
            .tempdir()
            .expect("Failed to create script dir");

        let long_running = write_script(dir.path(), "long_running.sh", "exec sleep 30");
        let failing = write_script(dir.path(), "failing.sh", "echo \"bad genesis\" >&2\nexit 3");
        let echo_args = write_script(
            dir.path(),
            "echo_args.sh",
            "for arg in \"$@\"; do printf '%s\\n' \"$arg\"; done\nexec sleep 30",
        );

        Scripts {
            _dir: dir,
            long_running,
            failing,
            echo_args,
        }
    })
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make script executable");
    path
}

/// Both node kinds mapped to the given scripts
pub fn binaries(standard: &Path, byzantine: &Path) -> BinaryMap {
    BinaryMap::new()
        .with(NodeKind::Standard, standard)
        .with(NodeKind::Byzantine, byzantine)
}

/// A network of beacons, node `i` declaring staking port `9651 + 2 * i`
pub fn network_config(nodes: usize) -> NetworkConfig {
    NetworkConfig {
        name: format!("Network, that consist of {} node(-s)", nodes),
        genesis: r#"{"networkID": 12345}"#.to_string(),
        log_level: "INFO".to_string(),
        node_configs: (0..nodes)
            .map(|i| NodeConfig {
                config_file: format!(r#"{{"staking-port": {}}}"#, 9651 + 2 * i),
                staking_key: format!("key{}", i),
                staking_cert: format!("cert{}", i),
                c_chain_config_file: "{}".to_string(),
                is_beacon: true,
            })
            .collect(),
    }
}

/// Route test logs through tracing
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("netrunner_local=debug,process_lifecycle=debug")
        .with_test_writer()
        .try_init();
}
