//! Append-only ledger of applied deployment units.
//!
//! The ledger is a JSON file keyed by `(network, idempotency key)`, held
//! under an exclusive file lock for the lifetime of the run so two
//! orchestrator processes can never race the same registry. Records are
//! appended and conflict-checked, never rewritten or deleted.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::address_book::Network;
use crate::errors::RegistryError;

/// What a record asserts about a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    /// The implementation contract is deployed (intermediate stage).
    Implementation,
    /// The proxy contract is deployed (intermediate stage).
    Proxy,
    /// The whole unit is applied. Gates re-execution.
    Applied,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub network: Network,
    pub key: String,
    pub kind: RecordKind,
    pub address: Address,
    pub unit_digest: String,
    pub applied_at: DateTime<Utc>,
    pub orchestrator_version: String,
}

/// File-backed deployment registry. Opening takes an exclusive lock that is
/// held until the registry is dropped.
#[derive(Debug)]
pub struct DeploymentRegistry {
    path: PathBuf,
    file: File,
    records: Vec<DeploymentRecord>,
}

impl DeploymentRegistry {
    /// Open (or create) the registry at `path` and take the run lock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive().map_err(|e| {
            if e.kind() == ErrorKind::WouldBlock {
                RegistryError::Locked(path.clone())
            } else {
                RegistryError::Storage(e)
            }
        })?;

        let mut contents = String::new();
        (&file).read_to_string(&mut contents)?;
        let records = if contents.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&contents)?
        };

        tracing::debug!(path = %path.display(), "Deployment registry opened");
        Ok(Self {
            path,
            file,
            records,
        })
    }

    /// Default registry location under the platform data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plinth")
            .join("registry.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[DeploymentRecord] {
        &self.records
    }

    /// Whether a unit is recorded as applied on a network.
    pub fn has_applied(&self, network: Network, key: &str) -> bool {
        self.applied(network, key).is_some()
    }

    /// The applied record for a unit, if any.
    pub fn applied(&self, network: Network, key: &str) -> Option<&DeploymentRecord> {
        self.records.iter().find(|r| {
            r.kind == RecordKind::Applied && r.network == network && r.key == key
        })
    }

    /// The most recent stage record of `kind` for a unit, if any.
    pub fn stage(&self, network: Network, key: &str, kind: RecordKind) -> Option<&DeploymentRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.kind == kind && r.network == network && r.key == key)
    }

    /// Record a unit as applied. Re-recording identical values is an
    /// idempotent no-op; mismatching values are a conflict, because the
    /// ledger is the only thing standing between a retry and a duplicate
    /// on-chain deployment.
    pub fn record_applied(
        &mut self,
        network: Network,
        key: &str,
        address: Address,
        unit_digest: &str,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.applied(network, key) {
            if existing.address == address && existing.unit_digest == unit_digest {
                tracing::debug!(%network, key, %address, "Applied record already present");
                return Ok(());
            }
            let reason = if existing.address != address {
                format!("ledger has address {}, attempted {}", existing.address, address)
            } else {
                format!(
                    "ledger has unit digest {}, attempted {}",
                    existing.unit_digest, unit_digest
                )
            };
            return Err(RegistryError::RecordConflict {
                network,
                key: key.to_string(),
                reason,
            });
        }

        self.append(network, key, RecordKind::Applied, address, unit_digest)
    }

    /// Record an intermediate stage of the proxy protocol. Identical
    /// re-records are no-ops; a changed address appends a fresh record and
    /// the latest one wins on lookup, keeping the history intact.
    pub fn record_stage(
        &mut self,
        network: Network,
        key: &str,
        kind: RecordKind,
        address: Address,
        unit_digest: &str,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.stage(network, key, kind) {
            if existing.address == address && existing.unit_digest == unit_digest {
                return Ok(());
            }
        }
        self.append(network, key, kind, address, unit_digest)
    }

    fn append(
        &mut self,
        network: Network,
        key: &str,
        kind: RecordKind,
        address: Address,
        unit_digest: &str,
    ) -> Result<(), RegistryError> {
        self.records.push(DeploymentRecord {
            network,
            key: key.to_string(),
            kind,
            address,
            unit_digest: unit_digest.to_string(),
            applied_at: Utc::now(),
            orchestrator_version: env!("CARGO_PKG_VERSION").to_string(),
        });
        self.persist()?;
        tracing::info!(%network, key, %kind, %address, "Registry record appended");
        Ok(())
    }

    /// Durably rewrite the ledger file from the in-memory records. The
    /// records vector only ever grows, so this preserves append-only
    /// semantics at the file level too.
    fn persist(&mut self) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(&self.records)?;
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(json.as_bytes())?;
        self.file.sync_all()?;
        Ok(())
    }
}
