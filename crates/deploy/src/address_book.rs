//! Network address book: resolves a network identifier to a validated
//! [`NetworkProfile`] before any deployment work starts.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use url::Url;

use crate::errors::ConfigError;

/// The closed set of supported networks.
///
/// Serialized through the kebab-case string form so networks can key the
/// configuration tables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(into = "String", try_from = "String")]
pub enum Network {
    Testnet,
    Mainnet,
    Local,
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.to_string()
    }
}

impl TryFrom<String> for Network {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Network {
    /// An ephemeral network is discarded between runs (a local devnet);
    /// role validation is relaxed and ownership stays with the operator.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Network::Local)
    }
}

/// The closed set of roles every deployment resolves against. All roles are
/// required on non-ephemeral networks.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(into = "String", try_from = "String")]
pub enum Role {
    UnderlyingAsset,
    WrappedNative,
    GovernanceTimelock,
    AccessControlManager,
    ReserveManager,
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

impl TryFrom<String> for Role {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Role → address table for one network.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Deref,
    derive_more::From,
)]
#[serde(transparent)]
pub struct RoleMap(pub BTreeMap<Role, Address>);

/// Per-network section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkEntry {
    /// Whether this is a live network. Defaults to true for everything
    /// except the ephemeral `local` network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live: Option<bool>,
    /// Whether to hand ownership to governance after deployment. Defaults
    /// to the liveness flag, but the two are independently configurable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_ownership: Option<bool>,
    /// RPC endpoint for this network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    /// Role → address table.
    #[serde(default)]
    pub roles: RoleMap,
}

/// A fully resolved, validated view of one network. Pure data; producing it
/// has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub network: Network,
    pub live: bool,
    pub transfer_ownership: bool,
    pub rpc_url: Option<Url>,
    pub roles: RoleMap,
}

impl NetworkProfile {
    /// Address for a role. Profiles are validated on resolution, so this
    /// only fails for ephemeral profiles queried beyond their table.
    pub fn role(&self, role: Role) -> Result<Address, ConfigError> {
        self.roles.get(&role).copied().ok_or(ConfigError::MissingRole {
            network: self.network,
            role,
        })
    }
}

/// Resolves network identifiers to [`NetworkProfile`]s.
///
/// Unrecognized identifiers fall back to the configured fallback network
/// only when the configuration names one explicitly; there is no implicit
/// "anything unknown is testnet" rule.
#[derive(Debug, Clone)]
pub struct AddressBook {
    fallback: Option<Network>,
    operator: Address,
    networks: BTreeMap<Network, NetworkEntry>,
}

impl AddressBook {
    pub fn new(
        fallback: Option<Network>,
        operator: Address,
        networks: BTreeMap<Network, NetworkEntry>,
    ) -> Self {
        Self {
            fallback,
            operator,
            networks,
        }
    }

    /// Resolve a network identifier to a validated profile.
    ///
    /// Every required role must map to a non-empty address on non-ephemeral
    /// networks. On the ephemeral network, missing roles default to the
    /// operator address so local runs need no governance setup.
    pub fn resolve(&self, network_id: &str) -> Result<NetworkProfile, ConfigError> {
        let network = match network_id.parse::<Network>() {
            Ok(network) => network,
            Err(_) => match self.fallback {
                Some(fallback) => {
                    tracing::warn!(
                        network_id,
                        fallback = %fallback,
                        "Unknown network identifier, using configured fallback"
                    );
                    fallback
                }
                None => return Err(ConfigError::UnknownNetwork(network_id.to_string())),
            },
        };

        let entry = self
            .networks
            .get(&network)
            .ok_or(ConfigError::UnconfiguredNetwork(network))?;

        let mut roles = entry.roles.0.clone();
        for role in Role::iter() {
            let present = roles
                .get(&role)
                .is_some_and(|address| *address != Address::ZERO);
            if present {
                continue;
            }
            if network.is_ephemeral() {
                roles.insert(role, self.operator);
            } else {
                return Err(ConfigError::MissingRole { network, role });
            }
        }

        let live = entry.live.unwrap_or(!network.is_ephemeral());
        Ok(NetworkProfile {
            network,
            live,
            transfer_ownership: entry.transfer_ownership.unwrap_or(live),
            rpc_url: entry.rpc_url.clone(),
            roles: RoleMap(roles),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn full_roles() -> RoleMap {
        RoleMap(
            Role::iter()
                .enumerate()
                .map(|(i, role)| (role, addr(i as u8 + 1)))
                .collect(),
        )
    }

    fn book(fallback: Option<Network>) -> AddressBook {
        let mut networks = BTreeMap::new();
        networks.insert(
            Network::Testnet,
            NetworkEntry {
                roles: full_roles(),
                ..Default::default()
            },
        );
        networks.insert(Network::Local, NetworkEntry::default());
        AddressBook::new(fallback, addr(0xEE), networks)
    }

    #[test]
    fn test_resolve_known_network() {
        let profile = book(None).resolve("testnet").expect("testnet should resolve");
        assert_eq!(profile.network, Network::Testnet);
        assert!(profile.live);
        assert!(profile.transfer_ownership);
        assert_eq!(profile.role(Role::UnderlyingAsset).unwrap(), addr(1));
    }

    #[test]
    fn test_unknown_network_without_fallback() {
        let err = book(None).resolve("testnat").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownNetwork(id) if id == "testnat"));
    }

    #[test]
    fn test_unknown_network_with_explicit_fallback() {
        let profile = book(Some(Network::Testnet))
            .resolve("testnat")
            .expect("fallback should apply");
        assert_eq!(profile.network, Network::Testnet);
    }

    #[test]
    fn test_missing_role_is_fatal_on_live_network() {
        let mut roles = full_roles().0;
        roles.remove(&Role::AccessControlManager);
        let mut networks = BTreeMap::new();
        networks.insert(
            Network::Mainnet,
            NetworkEntry {
                roles: RoleMap(roles),
                ..Default::default()
            },
        );
        let book = AddressBook::new(None, addr(0xEE), networks);

        let err = book.resolve("mainnet").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingRole {
                network: Network::Mainnet,
                role: Role::AccessControlManager,
            }
        ));
    }

    #[test]
    fn test_zero_address_counts_as_missing() {
        let mut roles = full_roles().0;
        roles.insert(Role::WrappedNative, Address::ZERO);
        let mut networks = BTreeMap::new();
        networks.insert(
            Network::Testnet,
            NetworkEntry {
                roles: RoleMap(roles),
                ..Default::default()
            },
        );
        let book = AddressBook::new(None, addr(0xEE), networks);

        assert!(matches!(
            book.resolve("testnet").unwrap_err(),
            ConfigError::MissingRole {
                role: Role::WrappedNative,
                ..
            }
        ));
    }

    #[test]
    fn test_ephemeral_network_defaults_roles_to_operator() {
        let profile = book(None).resolve("local").expect("local should resolve");
        assert!(!profile.live);
        assert!(!profile.transfer_ownership);
        for role in Role::iter() {
            assert_eq!(profile.role(role).unwrap(), addr(0xEE));
        }
    }

    #[test]
    fn test_liveness_and_transfer_policy_are_independent() {
        let mut networks = BTreeMap::new();
        networks.insert(
            Network::Testnet,
            NetworkEntry {
                live: Some(true),
                transfer_ownership: Some(false),
                roles: full_roles(),
                ..Default::default()
            },
        );
        let book = AddressBook::new(None, addr(0xEE), networks);

        let profile = book.resolve("testnet").unwrap();
        assert!(profile.live);
        assert!(!profile.transfer_ownership);
    }

    #[test]
    fn test_every_configured_network_resolves_complete() {
        let networks: BTreeMap<Network, NetworkEntry> = Network::iter()
            .map(|network| {
                (
                    network,
                    NetworkEntry {
                        roles: full_roles(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        let book = AddressBook::new(None, addr(0xEE), networks);

        for network in Network::iter() {
            let profile = book.resolve(&network.to_string()).expect("should resolve");
            for role in Role::iter() {
                assert_ne!(profile.role(role).unwrap(), Address::ZERO);
            }
        }
    }

    #[test]
    fn test_unconfigured_network() {
        assert!(matches!(
            book(None).resolve("mainnet").unwrap_err(),
            ConfigError::UnconfiguredNetwork(Network::Mainnet)
        ));
    }
}
