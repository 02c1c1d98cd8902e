//! plinth-deploy - Deterministic, idempotent deployment orchestration for
//! proxied on-chain contracts.
//!
//! One invocation applies one deployment unit to one network: resolve the
//! network's address table, consult the append-only registry, deploy the
//! implementation and its transparent upgradeable proxy, record the result,
//! and hand ownership to governance on live networks. Re-invocation against
//! an applied unit is a safe no-op.

mod address_book;
pub use address_book::{AddressBook, Network, NetworkEntry, NetworkProfile, Role, RoleMap};

pub mod calldata;
pub use calldata::CallArg;

mod chain;
pub use chain::{
    ArtifactError, ArtifactStore, ChainClient, ChainError, FsArtifacts, TxHash, TxIntent, TxReceipt,
};

mod errors;
pub use errors::{ConfigError, DeploymentError, OrchestrateError, OwnershipError, RegistryError};

mod orchestrator;
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, PLINTH_CONF_FILENAME, RunOutcome, RunReport,
};

mod ownership;
pub use ownership::{OwnershipTransition, OwnershipTransitioner, TransitionResult};

mod proxy;
pub use proxy::{DeployedInstance, PROXY_CONTRACT, ProxyDeployer};

mod registry;
pub use registry::{DeploymentRecord, DeploymentRegistry, RecordKind};

mod rpc;
pub use rpc::RpcChainClient;

mod unit;
pub use unit::{DeploymentUnit, Initializer, InitializerTemplate, UnitTemplate};
