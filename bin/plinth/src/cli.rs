//! Definitions of CLI arguments and commands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "plinth")]
#[command(
    author,
    version,
    about = "Deterministic, idempotent deployment of proxied on-chain contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "PLINTH_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file, or a directory containing
    /// Plinth.toml. Values can be overridden through PLINTH_-prefixed
    /// environment variables.
    #[arg(short, long, env = "PLINTH_CONFIG", default_value = "Plinth.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one deployment orchestration against a network.
    ///
    /// Re-running against an already-applied unit is a safe no-op: the
    /// registry short-circuits the deployment and only the governance
    /// handoff is re-checked.
    Deploy(DeployArgs),
    /// Show the deployment ledger.
    Status(StatusArgs),
    /// Write a starter configuration file.
    Init(InitArgs),
}

#[derive(Args)]
pub struct DeployArgs {
    /// Network identifier to deploy to.
    #[arg(short, long, env = "PLINTH_NETWORK")]
    pub network: String,

    /// Override the network's configured RPC endpoint.
    #[arg(long, env = "PLINTH_RPC_URL")]
    pub rpc_url: Option<Url>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Only show records for this network identifier.
    #[arg(short, long)]
    pub network: Option<String>,
}

#[derive(Args)]
pub struct InitArgs {
    /// Where to write the starter configuration.
    #[arg(long, default_value = "Plinth.toml")]
    pub path: PathBuf,
}
