//! Error taxonomy for the orchestration pipeline.
//!
//! Each component surfaces its own error type; the orchestrator aggregates
//! them into [`OrchestrateError`] without swallowing or retrying anything.

use std::path::PathBuf;

use alloy_core::primitives::Address;
use thiserror::Error;

use crate::address_book::{Network, Role};
use crate::chain::{ArtifactError, ChainError, TxHash};

/// Fatal configuration problems, raised before any chain traffic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown network `{0}` and no fallback network is configured")]
    UnknownNetwork(String),
    #[error("network `{0}` has no entry in the configuration file")]
    UnconfiguredNetwork(Network),
    #[error("network `{network}` is missing an address for required role `{role}`")]
    MissingRole { network: Network, role: Role },
    #[error("failed to read configuration")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Failures of the append-only deployment ledger. All of these abort the
/// run: proceeding without a readable, writable ledger risks a duplicate
/// on-chain deployment.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("deployment registry storage unavailable")]
    Storage(#[from] std::io::Error),
    #[error("deployment registry file is corrupt")]
    Corrupt(#[from] serde_json::Error),
    #[error("deployment registry at {} is locked by another run", .0.display())]
    Locked(PathBuf),
    #[error("conflicting applied record for ({network}, {key}): {reason}")]
    RecordConflict {
        network: Network,
        key: String,
        reason: String,
    },
}

/// Failures while applying a deployment unit. Stage records written before
/// the failure make the next invocation resume instead of redeploying.
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("failed to broadcast deployment transaction")]
    Broadcast(#[source] ChainError),
    #[error("failed to confirm deployment transaction")]
    Confirmation(#[source] ChainError),
    #[error("chain query failed")]
    Chain(#[source] ChainError),
    #[error("deployment transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
    #[error("receipt for {tx_hash} carries no contract address")]
    MissingContractAddress { tx_hash: TxHash },
    #[error("registry records {address} for this unit but no code is deployed there")]
    RecordedInstanceUnreachable { address: Address },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failures of the governance handoff. Distinct from [`DeploymentError`]:
/// the contract is deployed and recorded even when the handoff fails.
#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("failed to broadcast ownership transfer")]
    Broadcast(#[source] ChainError),
    #[error("failed to confirm ownership transfer")]
    Confirmation(#[source] ChainError),
    #[error("failed to read on-chain owner of {0}")]
    OwnerRead(Address, #[source] ChainError),
    #[error("owner call on {0} returned a malformed value")]
    MalformedOwner(Address),
    #[error(
        "ownership transfer of {instance} to {expected} did not take effect: {reason}"
    )]
    TransitionUnconfirmed {
        instance: Address,
        expected: Address,
        reason: String,
    },
}

/// Umbrella error for a whole orchestration run. The variant names the
/// component that failed; the run halts at the first fatal error.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("deployment error: {0}")]
    Deployment(#[from] DeploymentError),
    #[error("ownership transition error: {0}")]
    Ownership(#[from] OwnershipError),
}
