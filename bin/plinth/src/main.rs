//! plinth is a CLI tool for deterministic, idempotent deployments of
//! proxied on-chain contracts across networks.

mod cli;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use comfy_table::Table;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use plinth_deploy::{
    DeploymentRegistry, FsArtifacts, Orchestrator, OrchestratorConfig, RpcChainClient, RunOutcome,
};

use cli::{Cli, Command, DeployArgs, InitArgs, StatusArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match cli.command {
        Command::Deploy(args) => deploy(&cli.config, args).await,
        Command::Status(args) => status(&cli.config, args),
        Command::Init(args) => init(args),
    }
}

/// Load the configuration file, with PLINTH_-prefixed environment variables
/// layered on top.
fn load_config(path: &Path) -> Result<OrchestratorConfig> {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("PLINTH_"))
        .extract()
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

async fn deploy(config_path: &Path, args: DeployArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let book = config.address_book();
    let profile = book.resolve(&args.network)?;

    let rpc_url = args
        .rpc_url
        .or_else(|| profile.rpc_url.clone())
        .with_context(|| format!("no RPC URL configured for network {}", profile.network))?;
    let chain = RpcChainClient::new(rpc_url)?;
    let artifacts = FsArtifacts::new(&config.artifacts);
    let mut registry = DeploymentRegistry::open(config.registry_path())?;

    let mut orchestrator =
        Orchestrator::new(&book, &mut registry, &chain, &artifacts, config.operator);
    let report = orchestrator.run(&args.network, &config.unit).await?;

    tracing::info!("✓ Orchestration complete!");
    tracing::info!("");
    tracing::info!("Network:   {}", report.network);
    tracing::info!("Unit:      {}", report.unit_key);
    tracing::info!("Address:   {}", report.address);
    match report.outcome {
        RunOutcome::AlreadyApplied => tracing::info!("Outcome:   already applied"),
        RunOutcome::Applied {
            newly_deployed: true,
        } => tracing::info!("Outcome:   newly deployed"),
        RunOutcome::Applied {
            newly_deployed: false,
        } => tracing::info!("Outcome:   adopted from an interrupted run"),
    }
    match report.ownership {
        Some(result) if result.applied => {
            tracing::info!("Ownership: transferred to governance")
        }
        Some(_) => tracing::info!("Ownership: already correct, nothing transferred"),
        None => tracing::info!("Ownership: transfer not requested for this network"),
    }

    Ok(())
}

fn status(config_path: &Path, args: StatusArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let network = args
        .network
        .as_deref()
        .map(|id| config.address_book().resolve(id))
        .transpose()?
        .map(|profile| profile.network);
    let registry = DeploymentRegistry::open(config.registry_path())?;

    let mut table = Table::new();
    table.set_header(vec![
        "network",
        "unit",
        "kind",
        "address",
        "applied at",
        "version",
    ]);
    for record in registry.records() {
        if network.is_some_and(|n| n != record.network) {
            continue;
        }
        table.add_row(vec![
            record.network.to_string(),
            record.key.clone(),
            record.kind.to_string(),
            record.address.to_string(),
            record.applied_at.to_rfc3339(),
            record.orchestrator_version.clone(),
        ]);
    }
    println!("{table}");

    Ok(())
}

fn init(args: InitArgs) -> Result<()> {
    if args.path.exists() {
        bail!(
            "refusing to overwrite existing configuration at {}",
            args.path.display()
        );
    }
    OrchestratorConfig::sample().save_to_file(&args.path)?;
    tracing::info!(
        path = %args.path.display(),
        "Starter configuration written; fill in the address tables before deploying"
    );

    Ok(())
}
