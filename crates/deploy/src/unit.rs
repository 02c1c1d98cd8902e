//! Deployment units: the immutable description of one deployable artifact,
//! built fresh each run from the resolved [`NetworkProfile`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address_book::{NetworkProfile, Role};
use crate::calldata::CallArg;
use crate::errors::ConfigError;

/// Configured shape of the deployment unit. Constructor and initializer
/// arguments are ordered role references, resolved against the network
/// profile at run time so no network-specific literal ever appears in the
/// unit definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Idempotency key, globally unique per logical deployment intent.
    pub id: String,
    /// Artifact identifier of the implementation contract.
    pub contract: String,
    /// Ordered constructor arguments, as role references.
    #[serde(default)]
    pub constructor: Vec<Role>,
    /// Optional one-time initializer, invoked atomically with proxy creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<InitializerTemplate>,
}

/// Configured initializer descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializerTemplate {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Role>,
}

impl UnitTemplate {
    /// Resolve the template against a network profile into a concrete
    /// [`DeploymentUnit`].
    pub fn resolve(&self, profile: &NetworkProfile) -> Result<DeploymentUnit, ConfigError> {
        let constructor_args = self
            .constructor
            .iter()
            .map(|role| profile.role(*role).map(CallArg::Address))
            .collect::<Result<Vec<_>, _>>()?;

        let initializer = self
            .initializer
            .as_ref()
            .map(|init| {
                let args = init
                    .args
                    .iter()
                    .map(|role| profile.role(*role).map(CallArg::Address))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, ConfigError>(Initializer {
                    method: init.method.clone(),
                    args,
                })
            })
            .transpose()?;

        Ok(DeploymentUnit {
            key: self.id.clone(),
            contract: self.contract.clone(),
            constructor_args,
            initializer,
        })
    }
}

/// One deployable artifact: contract, ordered constructor arguments, and an
/// optional one-time initializer. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    pub key: String,
    pub contract: String,
    pub constructor_args: Vec<CallArg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initializer: Option<Initializer>,
}

/// Resolved initializer descriptor (method name + ordered arguments).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initializer {
    pub method: String,
    pub args: Vec<CallArg>,
}

impl DeploymentUnit {
    /// Deterministic SHA-256 digest of the unit's content, recorded in the
    /// ledger so a later run with a changed unit under the same key is
    /// detected as a conflict instead of silently reused.
    pub fn digest(&self) -> String {
        let json =
            serde_json::to_string(self).expect("deployment unit serialization should never fail");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use alloy_core::primitives::Address;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::address_book::{Network, RoleMap};

    fn profile() -> NetworkProfile {
        let roles: BTreeMap<Role, Address> = Role::iter()
            .enumerate()
            .map(|(i, role)| (role, Address::repeat_byte(i as u8 + 1)))
            .collect();
        NetworkProfile {
            network: Network::Testnet,
            live: true,
            transfer_ownership: true,
            rpc_url: None,
            roles: RoleMap(roles),
        }
    }

    fn template() -> UnitTemplate {
        UnitTemplate {
            id: "reserve-admin-v1".to_string(),
            contract: "ReserveAdmin".to_string(),
            constructor: vec![Role::UnderlyingAsset, Role::WrappedNative],
            initializer: Some(InitializerTemplate {
                method: "initialize".to_string(),
                args: vec![Role::ReserveManager, Role::AccessControlManager],
            }),
        }
    }

    #[test]
    fn test_resolve_maps_roles_in_order() {
        let profile = profile();
        let unit = template().resolve(&profile).expect("template should resolve");

        assert_eq!(unit.key, "reserve-admin-v1");
        assert_eq!(
            unit.constructor_args,
            vec![
                CallArg::Address(profile.role(Role::UnderlyingAsset).unwrap()),
                CallArg::Address(profile.role(Role::WrappedNative).unwrap()),
            ]
        );
        let init = unit.initializer.expect("initializer should be resolved");
        assert_eq!(init.method, "initialize");
        assert_eq!(
            init.args,
            vec![
                CallArg::Address(profile.role(Role::ReserveManager).unwrap()),
                CallArg::Address(profile.role(Role::AccessControlManager).unwrap()),
            ]
        );
    }

    #[test]
    fn test_digest_is_deterministic() {
        let unit = template().resolve(&profile()).unwrap();

        let digest = unit.digest();
        assert_eq!(digest, unit.digest(), "digest should be deterministic");
        assert_eq!(digest.len(), 64, "SHA-256 digest should be 64 hex characters");
    }

    #[test]
    fn test_digest_changes_with_constructor_args() {
        let unit = template().resolve(&profile()).unwrap();
        let mut changed = unit.clone();
        changed.constructor_args.push(CallArg::Bool(true));

        assert_ne!(unit.digest(), changed.digest());
    }

    #[test]
    fn test_digest_changes_with_key() {
        let unit = template().resolve(&profile()).unwrap();
        let mut changed = unit.clone();
        changed.key = "reserve-admin-v2".to_string();

        assert_ne!(unit.digest(), changed.digest());
    }

    #[test]
    fn test_digest_ignores_nothing_but_content() {
        let unit = template().resolve(&profile()).unwrap();
        let identical = template().resolve(&profile()).unwrap();

        assert_eq!(unit.digest(), identical.digest());
    }
}
