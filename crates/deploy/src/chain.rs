//! Narrow interfaces to the external collaborators: the transaction
//! broadcasting service and the artifact store. The orchestrator only ever
//! talks to the chain through [`ChainClient`]; connectivity, signing, and
//! retry policy live behind it.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Transaction hash, as returned by the broadcasting service.
pub type TxHash = B256;

/// Content of one state-changing transaction. The broadcast service treats
/// intents as at-least-once deliverable; retries are keyed by the content
/// digest, so rebuilding the same intent never double-spends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxIntent {
    pub from: Address,
    /// `None` deploys a contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl TxIntent {
    /// A contract-creation intent.
    pub fn deployment(from: Address, data: Bytes) -> Self {
        Self {
            from,
            to: None,
            value: U256::ZERO,
            data,
        }
    }

    /// A call intent against a deployed contract.
    pub fn call(from: Address, to: Address, data: Bytes) -> Self {
        Self {
            from,
            to: Some(to),
            value: U256::ZERO,
            data,
        }
    }

    /// Deterministic digest of the intent content, used as the idempotent
    /// retry key for broadcasts.
    pub fn digest(&self) -> String {
        let json = serde_json::to_string(self).expect("intent serialization should never fail");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// Execution status: false means the transaction reverted.
    pub ok: bool,
    /// Address of the created contract, for deployment transactions.
    pub contract_address: Option<Address>,
    pub block_number: u64,
}

/// Errors from the transaction service.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("malformed rpc response: {0}")]
    Malformed(String),
    #[error("transaction {0} is not yet confirmed")]
    Pending(TxHash),
    #[error("timed out waiting for confirmation of transaction {0}")]
    ConfirmationTimeout(TxHash),
}

/// The transaction broadcasting and confirmation service.
///
/// Every implementation blocks on network inclusion in `confirm`; timeout
/// and retry policy for transient failures belong to the implementation,
/// not to callers.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Broadcast a state-changing transaction, returning its hash.
    async fn broadcast(&self, intent: &TxIntent) -> Result<TxHash, ChainError>;

    /// Block until the transaction is included, returning its receipt.
    async fn confirm(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError>;

    /// Read-only contract call.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// Deployed bytecode at an address; empty when nothing is deployed.
    async fn get_code(&self, address: Address) -> Result<Bytes, ChainError>;
}

/// Creation bytecode lookup for a contract identifier. The orchestrator
/// treats bytecode as opaque; compiling it is someone else's job.
pub trait ArtifactStore: Send + Sync {
    fn bytecode(&self, contract: &str) -> Result<Bytes, ArtifactError>;
}

#[derive(Debug, Error)]
#[error("artifact for contract `{contract}` unavailable: {reason}")]
pub struct ArtifactError {
    pub contract: String,
    pub reason: String,
}

/// Artifact store over a directory of `<Contract>.hex` files, each holding
/// the hex-encoded creation bytecode (with or without a `0x` prefix).
#[derive(Debug, Clone)]
pub struct FsArtifacts {
    dir: PathBuf,
}

impl FsArtifacts {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl ArtifactStore for FsArtifacts {
    fn bytecode(&self, contract: &str) -> Result<Bytes, ArtifactError> {
        let path = self.dir.join(format!("{contract}.hex"));
        let content = std::fs::read_to_string(&path).map_err(|e| ArtifactError {
            contract: contract.to_string(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let stripped = content.trim().trim_start_matches("0x");
        let bytes = hex::decode(stripped).map_err(|e| ArtifactError {
            contract: contract.to_string(),
            reason: format!("invalid hex in {}: {e}", path.display()),
        })?;

        Ok(Bytes::from(bytes))
    }
}
