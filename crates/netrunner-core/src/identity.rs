//! Identity material for generated topologies
//!
//! Builds a [`NetworkConfig`] for `N` nodes from a template tree laid out as:
//!
//! ```text
//! genesis.json
//! node0/config.json
//! node0/staking.key
//! node0/staking.crt
//! node0/cchain_config.json
//! node1/...
//! ```
//!
//! Every generated node is a beacon. Topologies with non-beacon nodes must be
//! authored as a custom network config instead.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use tracing::debug;

use crate::config::{NetworkConfig, NodeConfig};
use crate::error::{CoreError, Result};

/// Shared genesis file at the template root
pub const GENESIS_FILE: &str = "genesis.json";
/// Per-node process config
pub const CONFIG_FILE: &str = "config.json";
/// Per-node staking private key
pub const STAKING_KEY_FILE: &str = "staking.key";
/// Per-node staking certificate
pub const STAKING_CERT_FILE: &str = "staking.crt";
/// Per-node C-chain config
pub const CCHAIN_CONFIG_FILE: &str = "cchain_config.json";

/// Log level given to generated networks
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Read-only hierarchical byte store holding templates
pub trait TemplateSource {
    /// Read the artifact at a `/`-separated path relative to the template root
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Templates stored in a directory on disk
#[derive(Debug, Clone)]
pub struct DirTemplate {
    root: PathBuf,
}

impl DirTemplate {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirTemplate {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let full = path
            .split('/')
            .fold(self.root.clone(), |acc, part| acc.join(part));
        std::fs::read(full)
    }
}

/// Templates held in memory, keyed by relative path
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplate {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact
    pub fn with(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Add an artifact
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Remove an artifact, returning it if present
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }
}

impl TemplateSource for MemoryTemplate {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

/// Path of a per-node artifact relative to the template root
pub fn node_artifact_path(index: usize, file: &str) -> String {
    format!("node{}/{}", index, file)
}

/// Build the network config for `node_count` nodes from `template`.
///
/// Fails on the first missing or unreadable artifact; no partial config is returned.
pub fn build<T: TemplateSource + ?Sized>(node_count: usize, template: &T) -> Result<NetworkConfig> {
    if node_count == 0 {
        return Err(CoreError::InvalidNodeCount(node_count));
    }

    let genesis = read_text(template, GENESIS_FILE)?;

    let node_configs = (0..node_count)
        .map(|i| -> Result<NodeConfig> {
            debug!(node = i, "Reading identity material");
            Ok(NodeConfig {
                config_file: read_text(template, &node_artifact_path(i, CONFIG_FILE))?,
                staking_key: read_text(template, &node_artifact_path(i, STAKING_KEY_FILE))?,
                staking_cert: read_text(template, &node_artifact_path(i, STAKING_CERT_FILE))?,
                c_chain_config_file: read_text(template, &node_artifact_path(i, CCHAIN_CONFIG_FILE))?,
                is_beacon: true,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NetworkConfig {
        name: format!("Network, that consist of {} node(-s)", node_count),
        genesis,
        log_level: DEFAULT_LOG_LEVEL.to_string(),
        node_configs,
    })
}

fn read_text<T: TemplateSource + ?Sized>(template: &T, path: &str) -> Result<String> {
    let bytes = template.read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CoreError::TemplateMissing {
            path: path.to_string(),
        },
        _ => CoreError::TemplateRead {
            path: path.to_string(),
            reason: e.to_string(),
        },
    })?;

    String::from_utf8(bytes).map_err(|e| CoreError::TemplateRead {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(nodes: usize) -> MemoryTemplate {
        let mut template = MemoryTemplate::new().with(GENESIS_FILE, r#"{"networkID": 1337}"#);
        for i in 0..nodes {
            template.insert(
                node_artifact_path(i, CONFIG_FILE),
                format!(r#"{{"http-port": {}}}"#, 9650 + 2 * i),
            );
            template.insert(node_artifact_path(i, STAKING_KEY_FILE), format!("key-{}", i));
            template.insert(node_artifact_path(i, STAKING_CERT_FILE), format!("cert-{}", i));
            template.insert(node_artifact_path(i, CCHAIN_CONFIG_FILE), "{}");
        }
        template
    }

    #[test]
    fn test_build_all_beacons() {
        let config = build(5, &template(5)).unwrap();

        assert_eq!(config.node_count(), 5);
        assert_eq!(config.name, "Network, that consist of 5 node(-s)");
        assert_eq!(config.log_level, "INFO");
        assert_eq!(config.genesis, r#"{"networkID": 1337}"#);
        for (i, node) in config.node_configs.iter().enumerate() {
            assert!(node.is_beacon);
            assert!(!node.config_file.is_empty());
            assert!(!node.c_chain_config_file.is_empty());
            assert_eq!(node.staking_key, format!("key-{}", i));
            assert_eq!(node.staking_cert, format!("cert-{}", i));
        }
    }

    #[test]
    fn test_build_fewer_nodes_than_template() {
        let config = build(2, &template(5)).unwrap();
        assert_eq!(config.node_count(), 2);
    }

    #[test]
    fn test_build_is_deterministic() {
        let source = template(3);
        assert_eq!(build(3, &source).unwrap(), build(3, &source).unwrap());
    }

    #[test]
    fn test_missing_node_artifact() {
        let mut source = template(3);
        source.remove(&node_artifact_path(2, STAKING_CERT_FILE));

        let err = build(3, &source).unwrap_err();
        assert!(matches!(
            err,
            CoreError::TemplateMissing { ref path } if path == "node2/staking.crt"
        ));
    }

    #[test]
    fn test_more_nodes_than_template() {
        let err = build(4, &template(3)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::TemplateMissing { ref path } if path == "node3/config.json"
        ));
    }

    #[test]
    fn test_missing_genesis() {
        let mut source = template(1);
        source.remove(GENESIS_FILE);
        let err = build(1, &source).unwrap_err();
        assert_eq!(err.to_string(), "Template artifact missing: genesis.json");
    }

    #[test]
    fn test_zero_nodes() {
        assert!(matches!(
            build(0, &template(1)),
            Err(CoreError::InvalidNodeCount(0))
        ));
    }

    #[test]
    fn test_non_utf8_artifact() {
        let source = template(1).with(node_artifact_path(0, STAKING_KEY_FILE), vec![0xff, 0xfe]);
        let err = build(1, &source).unwrap_err();
        assert!(matches!(err, CoreError::TemplateRead { .. }));
    }

    #[test]
    fn test_dir_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(GENESIS_FILE), "genesis").unwrap();
        for i in 0..2 {
            let node_dir = dir.path().join(format!("node{}", i));
            std::fs::create_dir(&node_dir).unwrap();
            for file in [CONFIG_FILE, STAKING_KEY_FILE, STAKING_CERT_FILE, CCHAIN_CONFIG_FILE] {
                std::fs::write(node_dir.join(file), format!("{}-{}", file, i)).unwrap();
            }
        }

        let config = build(2, &DirTemplate::new(dir.path())).unwrap();
        assert_eq!(config.genesis, "genesis");
        assert_eq!(config.node_configs[1].staking_key, "staking.key-1");
    }

    #[test]
    fn test_build_serialize_parse() {
        let config = build(3, &template(3)).unwrap();
        let parsed = NetworkConfig::parse(config.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed.node_configs, config.node_configs);
        assert_eq!(parsed, config);
    }
}
