//! Error types for network configuration and identity material

use thiserror::Error;

use crate::binaries::NodeKind;

/// Errors raised while reading, building or resolving a network description
#[derive(Error, Debug)]
pub enum CoreError {
    // ===== Configuration Errors =====
    /// The network config payload failed structural decoding
    #[error("Malformed network config: {0}")]
    MalformedConfig(#[from] serde_json::Error),

    /// A required environment variable is not set
    #[error("must define env var {var}")]
    EnvironmentMisconfigured { var: String },

    /// No executable is configured for a node kind that needs one
    #[error("No binary configured for {kind} nodes")]
    BinaryNotConfigured { kind: NodeKind },

    // ===== Template Errors =====
    /// An expected template artifact does not exist
    #[error("Template artifact missing: {path}")]
    TemplateMissing { path: String },

    /// A template artifact exists but could not be read
    #[error("Failed to read template artifact {path}: {reason}")]
    TemplateRead { path: String, reason: String },

    /// Node count must be positive
    #[error("Invalid node count: {0}")]
    InvalidNodeCount(usize),

    // ===== General Errors =====
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl CoreError {
    /// Get an error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::MalformedConfig(_) => "MALFORMED_CONFIG",
            CoreError::EnvironmentMisconfigured { .. } => "ENVIRONMENT_MISCONFIGURED",
            CoreError::BinaryNotConfigured { .. } => "BINARY_NOT_CONFIGURED",
            CoreError::TemplateMissing { .. } => "TEMPLATE_MISSING",
            CoreError::TemplateRead { .. } => "TEMPLATE_READ",
            CoreError::InvalidNodeCount(_) => "INVALID_NODE_COUNT",
            CoreError::Io(_) => "IO_ERROR",
        }
    }

    /// Check if this error stems from the caller's environment rather than the config payload
    pub fn is_environment_error(&self) -> bool {
        matches!(
            self,
            CoreError::EnvironmentMisconfigured { .. } | CoreError::BinaryNotConfigured { .. }
        )
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
