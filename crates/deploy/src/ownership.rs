//! Governance handoff: move ownership of a deployed instance from the
//! operator to the governance timelock, and verify the change took effect.

use alloy_core::primitives::Address;

use crate::calldata::{self, CallArg};
use crate::chain::{ChainClient, TxIntent};
use crate::errors::OwnershipError;

/// One intended ownership change, computed fresh each run and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipTransition {
    pub instance: Address,
    pub from: Address,
    pub to: Address,
    /// The transfer executes only on live networks; ephemeral runs keep
    /// operator control for test convenience.
    pub live: bool,
}

/// Outcome of a transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionResult {
    pub applied: bool,
}

/// Executes ownership transitions against the chain.
pub struct OwnershipTransitioner<'a, C> {
    chain: &'a C,
}

impl<'a, C: ChainClient> OwnershipTransitioner<'a, C> {
    pub fn new(chain: &'a C) -> Self {
        Self { chain }
    }

    /// Current on-chain owner of an instance, via `owner()`.
    pub async fn current_owner(&self, instance: Address) -> Result<Address, OwnershipError> {
        let data = calldata::method_call("owner", &[]);
        let ret = self
            .chain
            .call(instance, data.into())
            .await
            .map_err(|e| OwnershipError::OwnerRead(instance, e))?;

        if ret.len() < 32 {
            return Err(OwnershipError::MalformedOwner(instance));
        }
        Ok(Address::from_slice(&ret[12..32]))
    }

    /// Execute an ownership transition.
    ///
    /// No-ops (`applied = false`) when the network is not live or the owner
    /// is already correct. Otherwise broadcasts `transferOwnership`, blocks
    /// on confirmation, and re-reads the owner: a transfer that broadcasts
    /// but does not take effect is surfaced as `TransitionUnconfirmed`, not
    /// swallowed.
    pub async fn transfer(
        &self,
        transition: &OwnershipTransition,
    ) -> Result<TransitionResult, OwnershipError> {
        if !transition.live {
            tracing::info!(
                instance = %transition.instance,
                "Ephemeral network, ownership stays with the operator"
            );
            return Ok(TransitionResult { applied: false });
        }
        if transition.from == transition.to {
            tracing::info!(
                instance = %transition.instance,
                owner = %transition.to,
                "Owner already correct, nothing to transfer"
            );
            return Ok(TransitionResult { applied: false });
        }

        tracing::info!(
            instance = %transition.instance,
            from = %transition.from,
            to = %transition.to,
            "Transferring ownership to governance..."
        );
        let data = calldata::method_call("transferOwnership", &[CallArg::Address(transition.to)]);
        let intent = TxIntent::call(transition.from, transition.instance, data.into());
        let tx_hash = self
            .chain
            .broadcast(&intent)
            .await
            .map_err(OwnershipError::Broadcast)?;
        let receipt = self
            .chain
            .confirm(tx_hash)
            .await
            .map_err(OwnershipError::Confirmation)?;

        if !receipt.ok {
            return Err(OwnershipError::TransitionUnconfirmed {
                instance: transition.instance,
                expected: transition.to,
                reason: format!("transaction {tx_hash} reverted"),
            });
        }

        let owner = self.current_owner(transition.instance).await?;
        if owner != transition.to {
            return Err(OwnershipError::TransitionUnconfirmed {
                instance: transition.instance,
                expected: transition.to,
                reason: format!("on-chain owner is still {owner}"),
            });
        }

        tracing::info!(
            instance = %transition.instance,
            owner = %owner,
            "Ownership transfer confirmed"
        );
        Ok(TransitionResult { applied: true })
    }
}
