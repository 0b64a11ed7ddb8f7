//! Type definitions used throughout the scripts

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::ScriptError;

/// The contracts making up the identity platform, in deploy order
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityContract {
    /// The registry of verified identities
    IdentityRegistry,
    /// The contract attesting credentials issued to identities
    CredentialVerifier,
    /// The on-chain reputation leaderboard
    ReputationLeaderboard,
}

impl IdentityContract {
    /// Every contract, in the order it is deployed
    pub const DEPLOY_ORDER: [IdentityContract; 3] = [
        IdentityContract::IdentityRegistry,
        IdentityContract::CredentialVerifier,
        IdentityContract::ReputationLeaderboard,
    ];

    /// The Solidity contract name, which is also its key in the deployment record
    pub fn name(&self) -> &'static str {
        match self {
            IdentityContract::IdentityRegistry => "IdentityRegistry",
            IdentityContract::CredentialVerifier => "CredentialVerifier",
            IdentityContract::ReputationLeaderboard => "ReputationLeaderboard",
        }
    }
}

impl Display for IdentityContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A contract to deploy along with its constructor arguments
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentTarget {
    /// The contract to deploy
    pub contract: IdentityContract,
    /// The constructor arguments, in declaration order
    pub constructor_args: Vec<DynSolValue>,
}

impl DeploymentTarget {
    /// A target for the given contract with no constructor arguments
    pub fn new(contract: IdentityContract) -> Self {
        Self {
            contract,
            constructor_args: Vec::new(),
        }
    }

    /// The name of the targeted contract
    pub fn name(&self) -> &'static str {
        self.contract.name()
    }

    /// The ABI encoding of the constructor arguments, appended to the creation
    /// bytecode when deploying
    pub fn encoded_constructor_args(&self) -> Vec<u8> {
        if self.constructor_args.is_empty() {
            return Vec::new();
        }

        DynSolValue::Tuple(self.constructor_args.clone()).abi_encode_params()
    }
}

/// The fixed, ordered list of contracts deployed in every run.
///
/// None of the contracts take constructor arguments.
pub fn deployment_targets() -> Vec<DeploymentTarget> {
    IdentityContract::DEPLOY_ORDER.into_iter().map(DeploymentTarget::new).collect()
}

/// A contract that was created on-chain during the current run
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    /// The deployed contract
    pub contract: IdentityContract,
    /// The address it was deployed at
    pub address: Address,
}

impl DeployedContract {
    /// The name of the deployed contract
    pub fn name(&self) -> &'static str {
        self.contract.name()
    }
}

/// The deployer identity resolved from the network
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignerInfo {
    /// The deployer's address
    pub address: Address,
    /// The deployer's balance, in wei
    pub balance: U256,
}

/// The durable summary of one completed deployment to one network.
///
/// Serialized as the contents of `<deployments_dir>/<network>.json`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// The network name
    pub network: String,
    /// The chain id of the network
    pub chain_id: u64,
    /// The address that deployed the contracts
    pub deployer: Address,
    /// A mapping from contract name to its deployed address
    pub contracts: BTreeMap<String, Address>,
    /// When the record was assembled
    pub deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// The recorded address of the given contract
    pub fn address_of(&self, contract: IdentityContract) -> Option<Address> {
        self.contracts.get(contract.name()).copied()
    }
}

/// The outcome of a best-effort verification of a single contract.
///
/// Held in memory only, never persisted
#[derive(Debug)]
pub struct VerificationOutcome {
    /// The contract verification was attempted for
    pub contract: IdentityContract,
    /// The address verification was attempted at
    pub address: Address,
    /// Whether the verification succeeded
    pub result: Result<(), ScriptError>,
}

impl VerificationOutcome {
    /// Whether the contract was verified
    pub fn is_verified(&self) -> bool {
        self.result.is_ok()
    }
}
