//! Proxy deployment protocol: implementation contract, transparent
//! upgradeable proxy, one-time initialization.
//!
//! The initializer calldata rides inside the proxy constructor, so
//! initialization happens atomically with proxy creation and can never run
//! a second time: the reuse paths return an existing proxy instead of
//! constructing a new one. Stage records in the registry make a run that
//! died between steps resume instead of redeploying.

use alloy_core::primitives::{Address, Bytes};

use crate::address_book::Network;
use crate::calldata::{self, CallArg};
use crate::chain::{ArtifactStore, ChainClient, TxIntent};
use crate::errors::DeploymentError;
use crate::registry::{DeploymentRegistry, RecordKind};
use crate::unit::DeploymentUnit;

/// Artifact identifier of the proxy contract placed in front of every
/// implementation.
pub const PROXY_CONTRACT: &str = "TransparentUpgradeableProxy";

/// Result of applying one deployment unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedInstance {
    /// Address of the proxy, which is the instance callers interact with.
    pub address: Address,
    /// False when an existing instance was reused or adopted.
    pub newly_deployed: bool,
}

/// Deploys (or reuses) a proxied contract instance on one network.
pub struct ProxyDeployer<'a, C, A> {
    chain: &'a C,
    artifacts: &'a A,
    network: Network,
    operator: Address,
}

impl<'a, C: ChainClient, A: ArtifactStore> ProxyDeployer<'a, C, A> {
    pub fn new(chain: &'a C, artifacts: &'a A, network: Network, operator: Address) -> Self {
        Self {
            chain,
            artifacts,
            network,
            operator,
        }
    }

    /// Apply a deployment unit, reusing whatever already exists.
    ///
    /// Partial state from an interrupted run is picked up through the
    /// registry's stage records and verified on-chain before reuse.
    pub async fn deploy_or_reuse(
        &self,
        registry: &mut DeploymentRegistry,
        unit: &DeploymentUnit,
        proxy_admin_owner: Address,
    ) -> Result<DeployedInstance, DeploymentError> {
        let digest = unit.digest();

        if let Some(recorded) = registry.applied(self.network, &unit.key).map(|r| r.address) {
            let code = self
                .chain
                .get_code(recorded)
                .await
                .map_err(DeploymentError::Chain)?;
            if code.is_empty() {
                return Err(DeploymentError::RecordedInstanceUnreachable { address: recorded });
            }
            tracing::info!(
                key = %unit.key,
                address = %recorded,
                "Unit already applied and reachable, reusing instance"
            );
            return Ok(DeployedInstance {
                address: recorded,
                newly_deployed: false,
            });
        }

        let implementation = self.implementation_address(registry, unit, &digest).await?;

        // A staged proxy means a previous run died between proxy creation
        // and the applied record; adopt it so the ledger can catch up.
        if let Some(staged) = self
            .staged_address(registry, &unit.key, RecordKind::Proxy)
            .await?
        {
            tracing::info!(
                key = %unit.key,
                address = %staged,
                "Adopting proxy from an interrupted run"
            );
            return Ok(DeployedInstance {
                address: staged,
                newly_deployed: false,
            });
        }

        let proxy = self
            .deploy_proxy(unit, implementation, proxy_admin_owner)
            .await?;
        registry.record_stage(self.network, &unit.key, RecordKind::Proxy, proxy, &digest)?;

        Ok(DeployedInstance {
            address: proxy,
            newly_deployed: true,
        })
    }

    /// The implementation address for the unit: a verified staged one, or a
    /// fresh deployment staged in the registry before returning.
    async fn implementation_address(
        &self,
        registry: &mut DeploymentRegistry,
        unit: &DeploymentUnit,
        digest: &str,
    ) -> Result<Address, DeploymentError> {
        if let Some(staged) = self
            .staged_address(registry, &unit.key, RecordKind::Implementation)
            .await?
        {
            tracing::info!(
                contract = %unit.contract,
                address = %staged,
                "Reusing staged implementation from a previous run"
            );
            return Ok(staged);
        }

        tracing::info!(contract = %unit.contract, "Deploying implementation contract...");
        let bytecode = self.artifacts.bytecode(&unit.contract)?;
        let data = calldata::deployment_data(&bytecode, &unit.constructor_args);
        let address = self
            .send_deployment(TxIntent::deployment(self.operator, data.into()))
            .await?;
        registry.record_stage(
            self.network,
            &unit.key,
            RecordKind::Implementation,
            address,
            digest,
        )?;

        tracing::info!(contract = %unit.contract, %address, "Implementation deployed");
        Ok(address)
    }

    /// Latest stage record of `kind`, verified to still hold code on-chain.
    async fn staged_address(
        &self,
        registry: &DeploymentRegistry,
        key: &str,
        kind: RecordKind,
    ) -> Result<Option<Address>, DeploymentError> {
        let Some(staged) = registry.stage(self.network, key, kind).map(|r| r.address) else {
            return Ok(None);
        };
        let code = self
            .chain
            .get_code(staged)
            .await
            .map_err(DeploymentError::Chain)?;
        Ok((!code.is_empty()).then_some(staged))
    }

    async fn deploy_proxy(
        &self,
        unit: &DeploymentUnit,
        implementation: Address,
        proxy_admin_owner: Address,
    ) -> Result<Address, DeploymentError> {
        let init_calldata: Bytes = match &unit.initializer {
            Some(init) => calldata::method_call(&init.method, &init.args).into(),
            None => Bytes::default(),
        };

        let bytecode = self.artifacts.bytecode(PROXY_CONTRACT)?;
        let constructor = [
            CallArg::Address(implementation),
            CallArg::Address(proxy_admin_owner),
            CallArg::Bytes(init_calldata),
        ];
        let data = calldata::deployment_data(&bytecode, &constructor);

        tracing::info!(
            contract = %unit.contract,
            %implementation,
            owner = %proxy_admin_owner,
            "Deploying transparent upgradeable proxy..."
        );
        let address = self
            .send_deployment(TxIntent::deployment(self.operator, data.into()))
            .await?;

        tracing::info!(contract = %unit.contract, %address, "Proxy deployed and initialized");
        Ok(address)
    }

    /// Broadcast a deployment intent, block on confirmation, and extract
    /// the created contract address.
    async fn send_deployment(&self, intent: TxIntent) -> Result<Address, DeploymentError> {
        let tx_hash = self
            .chain
            .broadcast(&intent)
            .await
            .map_err(DeploymentError::Broadcast)?;
        let receipt = self
            .chain
            .confirm(tx_hash)
            .await
            .map_err(DeploymentError::Confirmation)?;

        if !receipt.ok {
            return Err(DeploymentError::Reverted { tx_hash });
        }
        receipt
            .contract_address
            .ok_or(DeploymentError::MissingContractAddress { tx_hash })
    }
}
