//! Node executables by role
//!
//! Every node runs either the standard node executable or the adversarial
//! ("byzantine") test variant. Which nodes are byzantine is not encoded in
//! the network config; callers supply it alongside the [`BinaryMap`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Environment variable holding the standard node executable path
pub const AVALANCHEGO_PATH_VAR: &str = "AVALANCHEGO_PATH";

/// Environment variable holding the byzantine node executable path
pub const BYZANTINE_PATH_VAR: &str = "BYZANTINE_PATH";

/// Role of a node process, selecting which executable launches it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Regular node
    Standard,
    /// Adversarial test variant
    Byzantine,
}

impl NodeKind {
    /// Environment variable conventionally holding this kind's executable
    pub fn env_var(&self) -> &'static str {
        match self {
            NodeKind::Standard => AVALANCHEGO_PATH_VAR,
            NodeKind::Byzantine => BYZANTINE_PATH_VAR,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Standard => write!(f, "standard"),
            NodeKind::Byzantine => write!(f, "byzantine"),
        }
    }
}

/// Executable path per node kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinaryMap {
    paths: HashMap<NodeKind, PathBuf>,
}

impl BinaryMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the executable for `kind`
    pub fn with(mut self, kind: NodeKind, path: impl Into<PathBuf>) -> Self {
        self.insert(kind, path);
        self
    }

    /// Add or replace the executable for `kind`
    pub fn insert(&mut self, kind: NodeKind, path: impl Into<PathBuf>) {
        self.paths.insert(kind, path.into());
    }

    /// Executable for `kind`, if configured
    pub fn get(&self, kind: NodeKind) -> Option<&Path> {
        self.paths.get(&kind).map(PathBuf::as_path)
    }

    /// Executable for `kind`, failing with [`CoreError::BinaryNotConfigured`]
    pub fn resolve(&self, kind: NodeKind) -> Result<&Path> {
        self.get(kind)
            .ok_or(CoreError::BinaryNotConfigured { kind })
    }

    /// Resolve both executables from the process environment.
    ///
    /// Both `AVALANCHEGO_PATH` and `BYZANTINE_PATH` are required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve both executables through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut map = Self::new();
        for kind in [NodeKind::Standard, NodeKind::Byzantine] {
            let var = kind.env_var();
            let path = lookup(var).ok_or_else(|| CoreError::EnvironmentMisconfigured {
                var: var.to_string(),
            })?;
            map.insert(kind, path);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup_both_present() {
        let map = BinaryMap::from_lookup(|var| match var {
            AVALANCHEGO_PATH_VAR => Some("/opt/avalanchego".to_string()),
            BYZANTINE_PATH_VAR => Some("/opt/byzantine".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(map.get(NodeKind::Standard), Some(Path::new("/opt/avalanchego")));
        assert_eq!(map.get(NodeKind::Byzantine), Some(Path::new("/opt/byzantine")));
    }

    #[test]
    fn test_from_lookup_missing_byzantine() {
        let err = BinaryMap::from_lookup(|var| {
            (var == AVALANCHEGO_PATH_VAR).then(|| "/opt/avalanchego".to_string())
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "must define env var BYZANTINE_PATH");
    }

    #[test]
    fn test_from_lookup_missing_standard() {
        let err = BinaryMap::from_lookup(|_| None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::EnvironmentMisconfigured { ref var } if var == AVALANCHEGO_PATH_VAR
        ));
    }

    #[test]
    fn test_resolve() {
        let map = BinaryMap::new().with(NodeKind::Standard, "/bin/node");
        assert_eq!(map.resolve(NodeKind::Standard).unwrap(), Path::new("/bin/node"));
        assert!(matches!(
            map.resolve(NodeKind::Byzantine),
            Err(CoreError::BinaryNotConfigured { kind: NodeKind::Byzantine })
        ));
    }
}
