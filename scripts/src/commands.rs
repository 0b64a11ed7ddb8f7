//! Implementations of the various deploy scripts

use std::time::Duration;

use tracing::info;

use crate::{
    artifacts::ArtifactStore,
    cli::{DeployArgs, EtherscanArgs, NetworkArgs, VerifyArgs},
    client::{setup_client, TxOptions},
    deployments::DeploymentStore,
    errors::ScriptError,
    orchestrator::{verify_all, Orchestrator},
    types::{DeploymentTarget, IdentityContract},
    utils::{print_summary, print_verification_outcomes},
    verify::{ContractVerifier, EtherscanConfig, EtherscanVerifier},
};

/// Deploy every contract to the network and record the result
pub async fn deploy(args: DeployArgs, network: &NetworkArgs) -> Result<(), ScriptError> {
    let artifacts = ArtifactStore::new(&network.artifacts_dir);
    let tx_options = TxOptions {
        confirmations: args.confirmations,
        timeout: args.tx_timeout(),
    };
    let client = setup_client(
        &network.network,
        &network.rpc_url,
        network.priv_key.as_deref(),
        artifacts.clone(),
        tx_options,
    )?;

    let verifier = etherscan_config(&args.etherscan).map(|config| {
        Box::new(EtherscanVerifier::new(config, artifacts)) as Box<dyn ContractVerifier>
    });

    let orchestrator =
        Orchestrator::new(&network.network, client, DeploymentStore::new(&network.deployments_dir))
            .with_expected_chain_id(network.chain_id)
            .with_verifier(verifier);

    let record = orchestrator.run().await?;
    print_summary(&record);
    Ok(())
}

/// Verify the contracts recorded for the network.
///
/// Individual verification failures are reported but do not fail the command
pub async fn verify(args: VerifyArgs, network: &NetworkArgs) -> Result<(), ScriptError> {
    let config = etherscan_config(&args.etherscan).ok_or(ScriptError::VerifierUnavailable)?;
    let record = DeploymentStore::new(&network.deployments_dir).read(&network.network)?;
    let verifier = EtherscanVerifier::new(config, ArtifactStore::new(&network.artifacts_dir));

    let contracts = match args.contract {
        Some(contract) => vec![contract],
        None => IdentityContract::DEPLOY_ORDER.to_vec(),
    };
    let deployed = contracts
        .into_iter()
        .map(|contract| {
            let address = record.address_of(contract).ok_or_else(|| {
                ScriptError::ReadDeployments(format!(
                    "{contract} missing from the {} record",
                    record.network
                ))
            })?;
            Ok((DeploymentTarget::new(contract), address))
        })
        .collect::<Result<Vec<_>, ScriptError>>()?;

    info!("verifying {} contracts on {}", deployed.len(), record.network);
    let outcomes = verify_all(&verifier, record.chain_id, &deployed).await;
    print_verification_outcomes(&outcomes);
    Ok(())
}

/// Print the deployment record of the network
pub fn show(network: &NetworkArgs) -> Result<(), ScriptError> {
    let record = DeploymentStore::new(&network.deployments_dir).read(&network.network)?;
    print_summary(&record);
    Ok(())
}

/// Build the verifier settings, or `None` if no API key is configured
fn etherscan_config(args: &EtherscanArgs) -> Option<EtherscanConfig> {
    let api_key = args.etherscan_api_key.clone()?;

    Some(EtherscanConfig {
        api_key,
        api_url: args.etherscan_api_url.clone(),
        poll_interval: Duration::from_secs(args.verify_poll_interval_secs),
        max_polls: args.verify_max_polls,
    })
}
