//! Utilities for the deploy scripts.

use alloy::primitives::utils::format_ether;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::{
    errors::ScriptError,
    types::{DeploymentRecord, SignerInfo, VerificationOutcome},
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the given verbosity when set.
pub fn setup_logging(verbosity: &str) -> eyre::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(verbosity)?,
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

/// Check that a network name is usable as a deployment record key, i.e. that
/// it is a non-empty string of ASCII alphanumerics, `-` and `_`
pub fn validate_network_name(network: &str) -> Result<(), ScriptError> {
    let valid = !network.is_empty()
        && network.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ScriptError::InvalidNetworkName(network.to_string()))
    }
}

/// Format a deployer balance in ether
pub fn format_balance(signer: &SignerInfo) -> String {
    format!("{} ETH", format_ether(signer.balance))
}

/// Render the human-readable summary of a deployment record
pub fn format_summary(record: &DeploymentRecord) -> String {
    let width = record.contracts.keys().map(String::len).max().unwrap_or_default();
    let contracts: String = record
        .contracts
        .iter()
        .map(|(name, address)| format!("\t{name:<width$}  {address}\n"))
        .collect();

    format!(
        "{}\n\tNetwork:     {}\n\tChain ID:    {}\n\tDeployer:    {}\n\
         \tDeployed at: {}\n{}\n{contracts}",
        "Deployment summary".bold(),
        record.network,
        record.chain_id,
        record.deployer,
        record.deployed_at.to_rfc3339(),
        "Contracts".bold(),
    )
}

/// Print the human-readable summary of a deployment record to stdout
pub fn print_summary(record: &DeploymentRecord) {
    print!("{}", format_summary(record));
}

/// Print the outcome of each verification attempt to stdout
pub fn print_verification_outcomes(outcomes: &[VerificationOutcome]) {
    println!("{}", "Verification".bold());
    for outcome in outcomes {
        match &outcome.result {
            Ok(()) => {
                println!("\t{} {} ({})", "verified".green(), outcome.contract, outcome.address)
            }
            Err(e) => println!("\t{} {}", "failed".red(), e),
        }
    }
}
