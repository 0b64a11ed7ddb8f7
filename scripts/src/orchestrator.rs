//! The deployment orchestrator.
//!
//! A run resolves the deployer, deploys the fixed list of contracts strictly
//! in order, optionally verifies each of them, and persists a deployment
//! record for the network. Failures are handled per phase:
//!
//! - resolving the deployer, deploying, and persisting are fatal; the run stops
//!   at the first such failure and nothing is persisted if any deploy failed
//! - verification is best-effort; a failure is logged and the run carries on
//!
//! Contracts deployed before a fatal failure stay deployed and are not
//! recorded. Re-running deploys fresh instances and replaces the record.

use alloy::primitives::Address;
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    client::DeployBackend,
    deployments::DeploymentStore,
    errors::ScriptError,
    types::{
        deployment_targets, DeployedContract, DeploymentRecord, DeploymentTarget, SignerInfo,
        VerificationOutcome,
    },
    utils::format_balance,
    verify::ContractVerifier,
};

/// Deploys the identity contracts to a single network
pub struct Orchestrator<B> {
    /// The name of the network, keying the deployment record
    network: String,
    /// The chain id the network must report, if configured
    expected_chain_id: Option<u64>,
    /// The network the contracts are deployed to
    backend: B,
    /// The verification service, absent when no credential is configured
    verifier: Option<Box<dyn ContractVerifier>>,
    /// Where the deployment record is persisted
    store: DeploymentStore,
    /// The contracts to deploy, in order
    targets: Vec<DeploymentTarget>,
}

impl<B: DeployBackend> Orchestrator<B> {
    /// An orchestrator deploying the fixed contract list without verification
    pub fn new(network: impl Into<String>, backend: B, store: DeploymentStore) -> Self {
        Self {
            network: network.into(),
            expected_chain_id: None,
            backend,
            verifier: None,
            store,
            targets: deployment_targets(),
        }
    }

    /// Verify contracts with the given service after deploying them
    pub fn with_verifier(mut self, verifier: Option<Box<dyn ContractVerifier>>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Abort before deploying if the network reports a different chain id
    pub fn with_expected_chain_id(mut self, chain_id: Option<u64>) -> Self {
        self.expected_chain_id = chain_id;
        self
    }

    /// Execute a full run, returning the persisted record
    pub async fn run(&self) -> Result<DeploymentRecord, ScriptError> {
        // Fail on a bad record key before anything is deployed
        self.store.record_path(&self.network)?;

        let signer = self.resolve_signer().await?;
        let chain_id = self.resolve_chain_id().await?;
        info!("deploying to {} (chain id {chain_id}) as {}", self.network, signer.address);

        if self.store.exists(&self.network) {
            warn!(
                "{} already has a deployment record, it will be replaced by this run",
                self.network
            );
        }

        let deployed = self.deploy_all().await?;
        self.verify_deployed(chain_id, &deployed).await;

        let record = build_record(&self.network, chain_id, signer.address, &deployed);
        self.persist_record(&record)?;
        Ok(record)
    }

    /// Resolve the deployer identity and balance
    pub async fn resolve_signer(&self) -> Result<SignerInfo, ScriptError> {
        let signer = self.backend.signer().await?;
        info!("deployer {} has balance {}", signer.address, format_balance(&signer));
        if signer.balance.is_zero() {
            warn!("deployer {} has no funds, deployments will likely fail", signer.address);
        }

        Ok(signer)
    }

    /// Fetch the network's chain id, checking it against the configured one
    pub async fn resolve_chain_id(&self) -> Result<u64, ScriptError> {
        let actual = self.backend.chain_id().await?;
        match self.expected_chain_id {
            Some(expected) if expected != actual => {
                Err(ScriptError::ChainIdMismatch { expected, actual })
            }
            _ => Ok(actual),
        }
    }

    /// Deploy a single contract, blocking until its creation is confirmed
    pub async fn deploy_contract(
        &self,
        target: &DeploymentTarget,
    ) -> Result<DeployedContract, ScriptError> {
        info!("deploying {}", target.contract);
        let address = self.backend.deploy(target).await?;
        info!("{} deployed at {address}", target.contract);

        Ok(DeployedContract {
            contract: target.contract,
            address,
        })
    }

    /// Deploy every target in order, stopping at the first failure
    pub async fn deploy_all(&self) -> Result<Vec<DeployedContract>, ScriptError> {
        let mut deployed = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let contract = self.deploy_contract(target).await.inspect_err(|_| {
                if !deployed.is_empty() {
                    warn!(
                        "aborting, already deployed contracts will not be recorded: {deployed:?}"
                    );
                }
            })?;
            deployed.push(contract);
        }

        Ok(deployed)
    }

    /// Attempt to verify each deployed contract on the given chain if a
    /// verifier is configured.
    ///
    /// Returns no outcomes when verification is disabled
    pub async fn verify_deployed(
        &self,
        chain_id: u64,
        deployed: &[DeployedContract],
    ) -> Vec<VerificationOutcome> {
        let Some(verifier) = &self.verifier else {
            return Vec::new();
        };

        let pairs: Vec<_> = self
            .targets
            .iter()
            .zip(deployed)
            .map(|(target, contract)| (target.clone(), contract.address))
            .collect();
        verify_all(verifier.as_ref(), chain_id, &pairs).await
    }

    /// Persist the record, replacing any prior record for the network
    pub fn persist_record(&self, record: &DeploymentRecord) -> Result<(), ScriptError> {
        let path = self.store.write(record)?;
        info!("deployment record written to {}", path.display());
        Ok(())
    }
}

/// Verify a contract, absorbing a failure into the returned outcome
pub async fn verify_contract(
    verifier: &dyn ContractVerifier,
    chain_id: u64,
    target: &DeploymentTarget,
    address: Address,
) -> VerificationOutcome {
    info!("verifying {} at {address}", target.contract);
    let result = verifier.verify(chain_id, target, address).await;
    match &result {
        Ok(()) => info!("{} verified", target.contract),
        Err(e) => warn!("{e}"),
    }

    VerificationOutcome {
        contract: target.contract,
        address,
        result,
    }
}

/// Verify each contract in turn. A failure never stops the remaining
/// contracts from being attempted
pub async fn verify_all(
    verifier: &dyn ContractVerifier,
    chain_id: u64,
    deployed: &[(DeploymentTarget, Address)],
) -> Vec<VerificationOutcome> {
    let mut outcomes = Vec::with_capacity(deployed.len());
    for (target, address) in deployed {
        outcomes.push(verify_contract(verifier, chain_id, target, *address).await);
    }

    let failures = outcomes.iter().filter(|outcome| !outcome.is_verified()).count();
    if failures > 0 {
        warn!("{failures} of {} contracts could not be verified", outcomes.len());
    }

    outcomes
}

/// Assemble the deployment record from the results of the deploy phase
pub fn build_record(
    network: &str,
    chain_id: u64,
    deployer: Address,
    deployed: &[DeployedContract],
) -> DeploymentRecord {
    DeploymentRecord {
        network: network.to_string(),
        chain_id,
        deployer,
        contracts: deployed
            .iter()
            .map(|contract| (contract.name().to_string(), contract.address))
            .collect(),
        deployed_at: Utc::now(),
    }
}
