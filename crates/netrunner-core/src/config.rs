//! Network configuration types
//!
//! A [`NetworkConfig`] is the declarative description of one test network:
//! a label, the genesis payload every node shares, a log level and the
//! ordered list of per-node launch material. The JSON layout uses camelCase
//! keys (`logLevel`, `nodeConfigs`, `cChainConfigFile`, ...).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};

/// One test network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Human-readable label, used only for logging
    pub name: String,
    /// Genesis payload shared by every node
    pub genesis: String,
    /// Log level passed to every node
    pub log_level: String,
    /// Per-node launch material; position is the node index
    pub node_configs: Vec<NodeConfig>,
}

/// Launch material for a single node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeConfig {
    /// Process configuration payload
    pub config_file: String,
    /// Staking private key (PEM)
    pub staking_key: String,
    /// Staking certificate matching `staking_key` (PEM)
    pub staking_cert: String,
    /// C-chain configuration payload
    pub c_chain_config_file: String,
    /// Whether this node is advertised as a bootstrap peer
    pub is_beacon: bool,
}

impl NetworkConfig {
    /// Decode a network config from raw JSON bytes.
    ///
    /// Only the structure is checked; an empty or truncated payload yields
    /// [`CoreError::MalformedConfig`].
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Read and decode a network config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| {
            CoreError::Io(format!(
                "couldn't read network config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&raw)
    }

    /// Encode as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of nodes in the network
    pub fn node_count(&self) -> usize {
        self.node_configs.len()
    }

    /// Beacon nodes with their index
    pub fn beacons(&self) -> impl Iterator<Item = (usize, &NodeConfig)> {
        self.node_configs
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_beacon)
    }
}

impl NodeConfig {
    /// Look up a top-level key in the node's config file.
    ///
    /// Returns `None` when the config file is not a JSON object or lacks the key.
    pub fn config_value(&self, key: &str) -> Option<serde_json::Value> {
        let value: serde_json::Value = serde_json::from_str(&self.config_file).ok()?;
        value.get(key).cloned()
    }

    /// Port value for `key`, accepting either a JSON number or a numeric string
    pub fn config_port(&self, key: &str) -> Option<u16> {
        match self.config_value(key)? {
            serde_json::Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"{
        "name": "basic",
        "genesis": "{\"networkID\": 1337}",
        "logLevel": "INFO",
        "nodeConfigs": [
            {
                "configFile": "{\"http-port\": 9650, \"staking-port\": 9651}",
                "stakingKey": "key0",
                "stakingCert": "cert0",
                "cChainConfigFile": "{}",
                "isBeacon": true
            },
            {
                "configFile": "{\"http-port\": \"9652\"}",
                "stakingKey": "key1",
                "stakingCert": "cert1",
                "cChainConfigFile": "{}",
                "isBeacon": false
            }
        ]
    }"#;

    #[test]
    fn test_parse_empty_input() {
        let err = NetworkConfig::parse(b"").unwrap_err();
        assert!(matches!(err, CoreError::MalformedConfig(_)));
        assert_eq!(
            err.to_string(),
            "Malformed network config: EOF while parsing a value at line 1 column 0"
        );
    }

    #[test]
    fn test_parse_truncated_input() {
        let err = NetworkConfig::parse(br#"{"name": "trunc", "nodeConfigs": ["#).unwrap_err();
        assert!(matches!(err, CoreError::MalformedConfig(_)));
        assert!(err.to_string().contains("EOF while parsing"));

        // Same input, same message
        let again = NetworkConfig::parse(br#"{"name": "trunc", "nodeConfigs": ["#).unwrap_err();
        assert_eq!(err.to_string(), again.to_string());
    }

    #[test]
    fn test_parse_wrong_type() {
        let err = NetworkConfig::parse(br#"{"nodeConfigs": {"configFile": 1}}"#).unwrap_err();
        assert!(matches!(err, CoreError::MalformedConfig(_)));
    }

    #[test]
    fn test_parse_basic_network() {
        let config = NetworkConfig::parse(BASIC.as_bytes()).unwrap();
        assert_eq!(config.name, "basic");
        assert_eq!(config.log_level, "INFO");
        assert_eq!(config.node_count(), 2);
        assert_eq!(config.node_configs[0].staking_key, "key0");
        assert_eq!(config.node_configs[1].staking_cert, "cert1");
        assert!(config.node_configs[0].is_beacon);
        assert!(!config.node_configs[1].is_beacon);

        let beacons: Vec<usize> = config.beacons().map(|(i, _)| i).collect();
        assert_eq!(beacons, vec![0]);
    }

    #[test]
    fn test_missing_fields_default() {
        let config = NetworkConfig::parse(br#"{"name": "sparse"}"#).unwrap();
        assert_eq!(config.name, "sparse");
        assert!(config.genesis.is_empty());
        assert!(config.node_configs.is_empty());
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let config = NetworkConfig::parse(BASIC.as_bytes()).unwrap();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"logLevel\""));
        assert!(json.contains("\"nodeConfigs\""));
        assert!(json.contains("\"cChainConfigFile\""));
        assert!(json.contains("\"isBeacon\""));
        assert_eq!(NetworkConfig::parse(json.as_bytes()).unwrap(), config);
    }

    #[test]
    fn test_config_port() {
        let config = NetworkConfig::parse(BASIC.as_bytes()).unwrap();
        assert_eq!(config.node_configs[0].config_port("http-port"), Some(9650));
        assert_eq!(config.node_configs[0].config_port("staking-port"), Some(9651));
        assert_eq!(config.node_configs[1].config_port("http-port"), Some(9652));
        assert_eq!(config.node_configs[1].config_port("staking-port"), None);

        let opaque = NodeConfig {
            config_file: "not json".to_string(),
            ..Default::default()
        };
        assert_eq!(opaque.config_port("http-port"), None);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic_network.json");
        std::fs::write(&path, BASIC).unwrap();
        let config = NetworkConfig::from_file(&path).unwrap();
        assert_eq!(config.node_count(), 2);

        let err = NetworkConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("couldn't read network config file"));
    }
}
