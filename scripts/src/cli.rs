//! Definitions of CLI arguments and commands for deploy scripts

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{deploy, show, verify},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_DIR, DEFAULT_ETHERSCAN_API_URL, DEFAULT_NETWORK,
        DEFAULT_RPC_URL, DEFAULT_VERBOSITY, DEFAULT_VERIFY_MAX_POLLS,
        DEFAULT_VERIFY_POLL_INTERVAL_SECS, NUM_DEPLOY_CONFIRMATIONS,
    },
    errors::ScriptError,
    types::IdentityContract,
};

/// Deploy the identity platform contracts to an EVM chain
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The network to operate on
    #[command(flatten)]
    pub network: NetworkArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The network configuration shared by every command
#[derive(Args, Clone, Debug)]
pub struct NetworkArgs {
    /// Network name, also the name of the deployment record file
    #[arg(short, long, env = "NETWORK", default_value = DEFAULT_NETWORK, global = true)]
    pub network: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    pub rpc_url: String,

    /// Expected chain id. The run aborts if the RPC endpoint reports another
    #[arg(long, env = "CHAIN_ID", global = true)]
    pub chain_id: Option<u64>,

    /// Private key of the deployer
    #[arg(long = "pkey", env = "PKEY", hide_env_values = true, global = true)]
    pub priv_key: Option<String>,

    /// Directory deployment records are written to
    #[arg(long, env = "DEPLOYMENTS_DIR", default_value = DEFAULT_DEPLOYMENTS_DIR, global = true)]
    pub deployments_dir: PathBuf,

    /// Root of the compiled contract artifacts
    #[arg(long, env = "ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR, global = true)]
    pub artifacts_dir: PathBuf,

    /// Log filter, overridden by `RUST_LOG`
    #[arg(short, long, default_value = DEFAULT_VERBOSITY, global = true)]
    pub verbosity: String,
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy all contracts, verify them, and record their addresses
    Deploy(DeployArgs),
    /// Verify the contracts of an existing deployment record
    Verify(VerifyArgs),
    /// Print the deployment record of the network
    Show,
}

impl Command {
    /// Run the command against the given network
    pub async fn run(self, network: &NetworkArgs) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, network).await,
            Command::Verify(args) => verify(args, network).await,
            Command::Show => show(network),
        }
    }
}

/// Deploy the contracts
#[derive(Args, Clone, Debug)]
pub struct DeployArgs {
    /// Confirmations to wait for on each creation transaction
    #[arg(long, default_value_t = NUM_DEPLOY_CONFIRMATIONS)]
    pub confirmations: u64,

    /// Seconds to wait for a creation transaction before failing the run
    #[arg(long)]
    pub tx_timeout_secs: Option<u64>,

    /// Verification settings
    #[command(flatten)]
    pub etherscan: EtherscanArgs,
}

impl DeployArgs {
    /// The creation transaction timeout
    pub fn tx_timeout(&self) -> Option<Duration> {
        self.tx_timeout_secs.map(Duration::from_secs)
    }
}

/// Verify previously deployed contracts
#[derive(Args, Clone, Debug)]
pub struct VerifyArgs {
    /// Only verify this contract
    #[arg(short, long)]
    pub contract: Option<IdentityContract>,

    /// Verification settings
    #[command(flatten)]
    pub etherscan: EtherscanArgs,
}

/// Settings for verifying contracts through an Etherscan-compatible API.
///
/// Verification is skipped when no API key is given
#[derive(Args, Clone, Debug)]
pub struct EtherscanArgs {
    /// Explorer API key
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,

    /// Explorer API URL
    #[arg(long, env = "ETHERSCAN_API_URL", default_value = DEFAULT_ETHERSCAN_API_URL)]
    pub etherscan_api_url: String,

    /// Seconds between verification status checks
    #[arg(long, default_value_t = DEFAULT_VERIFY_POLL_INTERVAL_SECS)]
    pub verify_poll_interval_secs: u64,

    /// Verification status checks before giving up on a contract
    #[arg(long, default_value_t = DEFAULT_VERIFY_MAX_POLLS)]
    pub verify_max_polls: u32,
}
