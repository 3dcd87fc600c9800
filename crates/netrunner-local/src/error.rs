//! Error types for node processes and network lifecycle

use netrunner_core::CoreError;
use thiserror::Error;

use crate::network::NetworkState;

/// Errors raised by a single node process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// The executable could not be started
    #[error("Failed to spawn {binary}: {reason}")]
    Spawn { binary: String, reason: String },

    /// Preparing the node's working directory failed
    #[error("I/O error: {0}")]
    Io(String),

    /// The node reported failure instead of becoming healthy
    #[error("Node unhealthy: {0}")]
    Unhealthy(String),

    /// The process had already exited abnormally
    #[error("Node process exited with {status}")]
    Exited { status: String },

    /// The process did not terminate in time
    #[error("Node did not stop within {timeout_ms}ms")]
    StopTimeout { timeout_ms: u64 },

    /// The node's monitor task is gone
    #[error("Node monitor stopped before the node settled")]
    MonitorGone,
}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err.to_string())
    }
}

/// Errors raised by network lifecycle operations
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The network config lists no nodes
    #[error("Network config has no nodes")]
    EmptyNetwork,

    /// Config or environment problem detected before launching anything
    #[error(transparent)]
    Config(#[from] CoreError),

    /// A node failed to launch or to become healthy
    #[error("Node {node} failed: {source}")]
    NodeLaunch {
        node: usize,
        #[source]
        source: NodeError,
    },

    /// Not every node became ready in time
    #[error("Network startup timed out after {duration_ms}ms")]
    StartupTimeout { duration_ms: u64 },

    /// A node could not be stopped cleanly
    #[error("Couldn't cleanly stop node {node}: {source}")]
    ShutdownFailure {
        node: usize,
        #[source]
        source: NodeError,
    },

    /// Operation not allowed in the current lifecycle state
    #[error("Cannot {operation} network in state {state}")]
    InvalidState {
        operation: &'static str,
        state: NetworkState,
    },
}

impl NetworkError {
    /// Check if this error is a startup timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetworkError::StartupTimeout { .. })
    }

    /// Index of the node this error blames, if any
    pub fn failed_node(&self) -> Option<usize> {
        match self {
            NetworkError::NodeLaunch { node, .. } | NetworkError::ShutdownFailure { node, .. } => {
                Some(*node)
            }
            _ => None,
        }
    }

    /// Get an error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::EmptyNetwork => "EMPTY_NETWORK",
            NetworkError::Config(err) => err.error_code(),
            NetworkError::NodeLaunch { .. } => "NODE_LAUNCH_FAILURE",
            NetworkError::StartupTimeout { .. } => "STARTUP_TIMEOUT",
            NetworkError::ShutdownFailure { .. } => "SHUTDOWN_FAILURE",
            NetworkError::InvalidState { .. } => "INVALID_STATE",
        }
    }
}

/// Result type for network operations
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use netrunner_core::NodeKind;

    #[test]
    fn test_error_codes() {
        let err = NetworkError::StartupTimeout { duration_ms: 300_000 };
        assert_eq!(err.error_code(), "STARTUP_TIMEOUT");
        assert!(err.is_timeout());
        assert_eq!(err.failed_node(), None);

        let err = NetworkError::from(CoreError::BinaryNotConfigured {
            kind: NodeKind::Byzantine,
        });
        assert_eq!(err.error_code(), "BINARY_NOT_CONFIGURED");
        assert_eq!(err.to_string(), "No binary configured for byzantine nodes");
    }

    #[test]
    fn test_failed_node() {
        let err = NetworkError::NodeLaunch {
            node: 3,
            source: NodeError::Unhealthy("exit status: 1".to_string()),
        };
        assert_eq!(err.failed_node(), Some(3));
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "Node 3 failed: Node unhealthy: exit status: 1");
    }
}
