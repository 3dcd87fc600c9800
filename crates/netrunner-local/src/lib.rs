//! Netrunner Local - Run test networks as local node processes
//!
//! This crate starts every node of a [`netrunner_core::NetworkConfig`] as a
//! child process on this machine, waits until the whole network is healthy
//! and tears it down again.
//!
//! # Overview
//!
//! - **Network**: lifecycle orchestration (start, ready, stop)
//! - **Node handles**: per-node status signal and stop, behind [`NodeHandle`]
//! - **Process launcher**: spawns node executables with their files on disk
//!   and supervises them with a health probe
//!
//! # Example
//!
//! ```rust,no_run
//! use netrunner_core::{identity, BinaryMap, DirTemplate};
//! use netrunner_local::{LaunchConfig, Network, ProcessLauncher};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = identity::build(5, &DirTemplate::new("./templates/default"))?;
//!     let launch_config = LaunchConfig::new(BinaryMap::from_env()?).with_byzantine([3]);
//!     let launcher = ProcessLauncher::new(&launch_config);
//!
//!     let mut network = Network::start(&launcher, &launch_config, &config).await?;
//!     let ready = network.ready(Duration::from_secs(300)).await;
//!     network.stop().await?;
//!     ready?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod node;
pub mod process;

// Test utilities - available with test-utils feature or in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports
pub use config::LaunchConfig;
pub use error::{NetworkError, NodeError, Result};
pub use network::{Network, NetworkState};
pub use node::{wait_settled, NodeHandle, NodeLaunch, NodeLauncher, NodeStatus};
pub use process::{HealthCheck, LocalNode, NodeStats, ProcessLauncher};
