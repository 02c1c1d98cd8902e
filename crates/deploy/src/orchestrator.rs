//! Top-level orchestration: resolve configuration, consult the registry,
//! deploy, record, hand off ownership. One linear pass per invocation; the
//! first fatal error halts the run, and recovery is always forward-only
//! through the registry on the next invocation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::address_book::{AddressBook, Network, NetworkEntry, Role};
use crate::chain::{ArtifactStore, ChainClient};
use crate::errors::{ConfigError, OrchestrateError, RegistryError};
use crate::ownership::{OwnershipTransition, OwnershipTransitioner, TransitionResult};
use crate::proxy::ProxyDeployer;
use crate::registry::DeploymentRegistry;
use crate::unit::UnitTemplate;

/// The default name for the plinth configuration file.
pub const PLINTH_CONF_FILENAME: &str = "Plinth.toml";

/// Static configuration for the orchestrator, loaded before a run begins.
///
/// This is the whole configuration surface: network address tables, the
/// deployment unit shape, and the handful of paths the run needs. It can be
/// serialized to/from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrchestratorConfig {
    /// Explicit fallback network for unrecognized identifiers. Without it,
    /// unknown identifiers are a hard error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Network>,
    /// Path of the registry ledger file. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<PathBuf>,
    /// Directory of `<Contract>.hex` creation bytecode files.
    pub artifacts: PathBuf,
    /// Deploying operator address. The operator's key never passes through
    /// this process; the transaction service holds the account.
    pub operator: Address,
    /// The deployment unit this configuration describes.
    pub unit: UnitTemplate,
    /// Per-network address tables and policies.
    pub networks: BTreeMap<Network, NetworkEntry>,
}

impl OrchestratorConfig {
    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("failed to serialize configuration: {e}")))?;
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file or a directory containing
    /// one under the default name.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_path = if path.is_dir() {
            path.join(PLINTH_CONF_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", config_path.display())))?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// The address book backed by this configuration.
    pub fn address_book(&self) -> AddressBook {
        AddressBook::new(self.fallback, self.operator, self.networks.clone())
    }

    /// Registry path, falling back to the platform default.
    pub fn registry_path(&self) -> PathBuf {
        self.registry
            .clone()
            .unwrap_or_else(DeploymentRegistry::default_path)
    }

    /// A starter configuration with placeholder addresses, for `plinth init`.
    pub fn sample() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(Network::Testnet, NetworkEntry::default());
        networks.insert(Network::Local, NetworkEntry::default());
        Self {
            fallback: None,
            registry: None,
            artifacts: PathBuf::from("artifacts"),
            operator: Address::ZERO,
            unit: UnitTemplate {
                id: "reserve-admin-v1".to_string(),
                contract: "ReserveAdmin".to_string(),
                constructor: vec![Role::UnderlyingAsset, Role::WrappedNative],
                initializer: Some(crate::unit::InitializerTemplate {
                    method: "initialize".to_string(),
                    args: vec![Role::ReserveManager, Role::AccessControlManager],
                }),
            },
            networks,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The registry already recorded this unit; no deployment work ran.
    AlreadyApplied,
    /// The unit was applied this run. `newly_deployed` is false when the
    /// proxy of an interrupted earlier run was adopted instead of created.
    Applied { newly_deployed: bool },
}

/// Result of one successful orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub network: Network,
    pub unit_key: String,
    pub address: Address,
    pub outcome: RunOutcome,
    /// Outcome of the governance handoff, when the network's transfer
    /// policy enabled it.
    pub ownership: Option<TransitionResult>,
}

/// Composes the address book, registry, deployer, and transitioner into the
/// linear orchestration pass.
pub struct Orchestrator<'a, C, A> {
    address_book: &'a AddressBook,
    registry: &'a mut DeploymentRegistry,
    chain: &'a C,
    artifacts: &'a A,
    operator: Address,
}

impl<'a, C: ChainClient, A: ArtifactStore> Orchestrator<'a, C, A> {
    pub fn new(
        address_book: &'a AddressBook,
        registry: &'a mut DeploymentRegistry,
        chain: &'a C,
        artifacts: &'a A,
        operator: Address,
    ) -> Self {
        Self {
            address_book,
            registry,
            chain,
            artifacts,
            operator,
        }
    }

    /// Run one deployment orchestration against a network.
    pub async fn run(
        &mut self,
        network_id: &str,
        template: &UnitTemplate,
    ) -> Result<RunReport, OrchestrateError> {
        tracing::info!(network_id, unit = %template.id, "Starting orchestration run...");

        // RESOLVE_CONFIG
        let profile = self.address_book.resolve(network_id)?;
        let unit = template.resolve(&profile)?;
        let digest = unit.digest();
        tracing::info!(
            network = %profile.network,
            key = %unit.key,
            live = profile.live,
            "Configuration resolved"
        );

        // CHECK_REGISTRY
        if let Some(record) = self.registry.applied(profile.network, &unit.key) {
            if record.unit_digest != digest {
                return Err(RegistryError::RecordConflict {
                    network: profile.network,
                    key: unit.key.clone(),
                    reason: format!(
                        "unit content changed since it was applied (ledger digest {}, current {digest})",
                        record.unit_digest
                    ),
                }
                .into());
            }
        }
        let had_applied = self.registry.has_applied(profile.network, &unit.key);

        // DEPLOY. For an already-applied unit this is a verified no-op: the
        // deployer re-checks that the recorded instance is still reachable
        // and returns it without touching the chain state.
        let proxy_admin_owner = profile.role(Role::GovernanceTimelock)?;
        let deployer =
            ProxyDeployer::new(self.chain, self.artifacts, profile.network, self.operator);
        let instance = deployer
            .deploy_or_reuse(self.registry, &unit, proxy_admin_owner)
            .await?;

        // RECORD. An idempotent no-op on re-runs; this is also where the
        // ledger catches up after a run that died between DEPLOY and RECORD.
        self.registry
            .record_applied(profile.network, &unit.key, instance.address, &digest)?;

        let address = instance.address;
        let outcome = if had_applied {
            RunOutcome::AlreadyApplied
        } else {
            RunOutcome::Applied {
                newly_deployed: instance.newly_deployed,
            }
        };

        // TRANSFER_OWNERSHIP
        let ownership = if profile.transfer_ownership {
            let to = profile.role(Role::GovernanceTimelock)?;
            let transitioner = OwnershipTransitioner::new(self.chain);
            let from = if profile.live {
                transitioner.current_owner(address).await?
            } else {
                self.operator
            };
            let transition = OwnershipTransition {
                instance: address,
                from,
                to,
                live: profile.live,
            };
            match transitioner.transfer(&transition).await {
                Ok(result) => Some(result),
                Err(e) => {
                    // The deployment itself succeeded and is recorded; only
                    // the governance handoff is incomplete.
                    tracing::warn!(
                        %address,
                        "Contract deployed and recorded, but the governance handoff did not complete"
                    );
                    return Err(e.into());
                }
            }
        } else {
            tracing::info!(network = %profile.network, "Ownership transfer disabled for this network");
            None
        };

        tracing::info!(
            network = %profile.network,
            key = %unit.key,
            %address,
            "Orchestration run complete"
        );
        Ok(RunReport {
            network: profile.network,
            unit_key: unit.key.clone(),
            address,
            outcome,
            ownership,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_config_roundtrips_through_toml() {
        let dir = TempDir::new("plinth-config").expect("tempdir");
        let path = dir.path().join(PLINTH_CONF_FILENAME);

        let config = OrchestratorConfig::sample();
        config.save_to_file(&path).expect("save");
        let loaded = OrchestratorConfig::load_from_file(&path).expect("load");

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_config_loads_from_directory() {
        let dir = TempDir::new("plinth-config").expect("tempdir");
        OrchestratorConfig::sample()
            .save_to_file(&dir.path().join(PLINTH_CONF_FILENAME))
            .expect("save");

        let loaded = OrchestratorConfig::load_from_file(dir.path()).expect("load");
        assert_eq!(loaded.unit.contract, "ReserveAdmin");
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new("plinth-config").expect("tempdir");
        let result = OrchestratorConfig::load_from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_registry_path_defaults_to_data_dir() {
        let config = OrchestratorConfig::sample();
        assert!(config.registry_path().ends_with("plinth/registry.json"));
    }
}
