//! Netrunner Core - Network descriptions for local test networks
//!
//! This crate holds everything needed to describe a test network before any
//! process is started.
//!
//! # Modules
//!
//! - [`config`] - The declarative network config and its JSON format
//! - [`identity`] - Builds per-node identity material from a template tree
//! - [`binaries`] - Executable paths per node kind
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use netrunner_core::{identity::{self, DirTemplate}, BinaryMap};
//!
//! let config = identity::build(5, &DirTemplate::new("./templates/default"))?;
//! let binaries = BinaryMap::from_env()?;
//! println!("{} nodes in {}", config.node_count(), config.name);
//! # Ok::<(), netrunner_core::CoreError>(())
//! ```

pub mod binaries;
pub mod config;
pub mod error;
pub mod identity;

// Re-exports for convenience
pub use binaries::{BinaryMap, NodeKind};
pub use config::{NetworkConfig, NodeConfig};
pub use error::{CoreError, Result};
pub use identity::{DirTemplate, MemoryTemplate, TemplateSource};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'), "VERSION should be semver format");
    }
}
