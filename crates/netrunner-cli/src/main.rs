//! Netrunner - Ephemeral local test networks
//!
//! This binary wires the network description and the local process launcher
//! together:
//! - `run` starts a network from a config file or a template tree, waits
//!   until every node is healthy and stops it again
//! - `generate` builds the default topology from a template tree and prints
//!   it as JSON
//!
//! Node executables come from `AVALANCHEGO_PATH` and `BYZANTINE_PATH`.

use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use netrunner_core::{identity, BinaryMap, DirTemplate, NetworkConfig};
use netrunner_local::{LaunchConfig, Network, NodeHandle, ProcessLauncher};

#[derive(Parser)]
#[command(name = "netrunner")]
#[command(about = "Run ephemeral local test networks")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start a network, wait until it is healthy, then stop it
    Run(RunArgs),
    /// Build the default topology and print it as JSON
    Generate(GenerateArgs),
}

/// Where the network config comes from
#[derive(ClapArgs, Debug)]
struct Source {
    /// Network config JSON file
    #[arg(long, conflicts_with_all = ["template_dir", "nodes"])]
    config: Option<PathBuf>,

    /// Template tree for the default topology
    #[arg(long, requires = "nodes")]
    template_dir: Option<PathBuf>,

    /// Number of nodes to build from the template tree
    #[arg(long, requires = "template_dir")]
    nodes: Option<usize>,
}

impl Source {
    fn load(&self) -> anyhow::Result<NetworkConfig> {
        match (&self.config, &self.template_dir, self.nodes) {
            (Some(path), _, _) => Ok(NetworkConfig::from_file(path)?),
            (None, Some(dir), Some(nodes)) => Ok(identity::build(nodes, &DirTemplate::new(dir))?),
            _ => bail!("either --config or --template-dir with --nodes is required"),
        }
    }
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: Source,

    /// How long to wait for every node to become healthy
    #[arg(long, default_value = "5m", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Node indices to launch with the byzantine executable
    #[arg(long, value_delimiter = ',')]
    byzantine: Vec<usize>,

    /// Keep node directories under this path instead of temporary directories
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Keep the network running until Ctrl-C
    #[arg(long)]
    hold: bool,
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Template tree for the default topology
    #[arg(long)]
    template_dir: PathBuf,

    /// Number of nodes
    #[arg(long)]
    nodes: usize,

    /// Write the JSON here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over the verbosity flag
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Run(run_args) => run(run_args).await,
        Command::Generate(generate_args) => generate(generate_args),
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.source.load()?;
    let binaries = BinaryMap::from_env()?;

    let mut launch_config = LaunchConfig::new(binaries).with_byzantine(args.byzantine.iter().copied());
    launch_config.work_dir = args.work_dir.clone();
    let launcher = ProcessLauncher::new(&launch_config);

    let mut network = Network::start(&launcher, &launch_config, &config).await?;

    let outcome = match network.ready(args.timeout).await {
        Ok(()) => {
            for node in network.nodes() {
                info!(
                    node = node.name(),
                    pid = ?node.stats().pid,
                    dir = %node.dir().display(),
                    "Node ready"
                );
            }
            if args.hold {
                info!("Network ready, press Ctrl-C to stop");
                tokio::signal::ctrl_c()
                    .await
                    .context("failed to listen for Ctrl-C")
            } else {
                Ok(())
            }
        }
        Err(e) => {
            if let Some(node) = e.failed_node().and_then(|index| network.node(index)) {
                error!(node = node.name(), log = %node.log_path().display(), "See the node's process log");
            }
            Err(e.into())
        }
    };

    let stopped = network.stop().await;
    match outcome {
        Ok(()) => {
            stopped?;
            Ok(())
        }
        Err(e) => {
            if let Err(stop_err) = stopped {
                warn!(error = %stop_err, "Network did not stop cleanly");
            }
            Err(e)
        }
    }
}

fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let config = identity::build(args.nodes, &DirTemplate::new(&args.template_dir))?;
    let json = config.to_json()?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("couldn't write network config to {}", path.display()))?;
            info!(network = %config.name, out = %path.display(), "Network config written");
        }
        None => println!("{}", json),
    }
    Ok(())
}
