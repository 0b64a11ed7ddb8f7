//! The network collaborator of the orchestrator: resolves the deployer and
//! creates contracts over JSON-RPC.

use std::{str::FromStr, time::Duration};

use alloy::{
    network::TransactionBuilder,
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use tracing::debug;

use crate::{
    artifacts::ArtifactStore,
    constants::NUM_DEPLOY_CONFIRMATIONS,
    errors::ScriptError,
    types::{DeploymentTarget, SignerInfo},
};

/// The capabilities the orchestrator needs from the network it deploys to
#[async_trait]
pub trait DeployBackend: Send + Sync {
    /// Resolve the deployer's identity and balance.
    ///
    /// Fails with [`ScriptError::SignerUnavailable`] when no signing
    /// credential is configured
    async fn signer(&self) -> Result<SignerInfo, ScriptError>;

    /// The chain id reported by the network
    async fn chain_id(&self) -> Result<u64, ScriptError>;

    /// Deploy the target and wait for the creation transaction to be
    /// confirmed, returning the address of the new contract.
    ///
    /// Fails with [`ScriptError::DeploymentFailed`]
    async fn deploy(&self, target: &DeploymentTarget) -> Result<Address, ScriptError>;
}

/// Options controlling how creation transactions are awaited
#[derive(Copy, Clone, Debug)]
pub struct TxOptions {
    /// The number of confirmations to wait for
    pub confirmations: u64,
    /// How long to wait for the confirmations before failing the deployment.
    /// `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            confirmations: NUM_DEPLOY_CONFIRMATIONS,
            timeout: None,
        }
    }
}

/// A [`DeployBackend`] talking to an EVM node over HTTP
pub struct RpcClient {
    /// The network name, used in error reporting
    network: String,
    /// The provider, with a wallet attached when a private key was given
    provider: DynProvider,
    /// The address of the attached wallet
    signer_address: Option<Address>,
    /// Where the creation bytecode is read from
    artifacts: ArtifactStore,
    /// How creation transactions are awaited
    tx_options: TxOptions,
}

/// Sets up the client with which to deploy contracts, attaching a wallet for
/// the given private key if there is one
pub fn setup_client(
    network: &str,
    rpc_url: &str,
    priv_key: Option<&str>,
    artifacts: ArtifactStore,
    tx_options: TxOptions,
) -> Result<RpcClient, ScriptError> {
    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let (provider, signer_address) = match priv_key {
        Some(priv_key) => {
            let signer = PrivateKeySigner::from_str(priv_key)
                .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
            let address = signer.address();
            let provider = ProviderBuilder::new().wallet(signer).connect_http(url);

            (DynProvider::new(provider), Some(address))
        }
        None => (DynProvider::new(ProviderBuilder::new().connect_http(url)), None),
    };

    Ok(RpcClient {
        network: network.to_string(),
        provider,
        signer_address,
        artifacts,
        tx_options,
    })
}

impl RpcClient {
    /// The address of the attached wallet
    fn signer_address(&self) -> Result<Address, ScriptError> {
        self.signer_address.ok_or_else(|| ScriptError::SignerUnavailable(self.network.clone()))
    }
}

#[async_trait]
impl DeployBackend for RpcClient {
    async fn signer(&self) -> Result<SignerInfo, ScriptError> {
        let address = self.signer_address()?;
        let balance = self
            .provider
            .get_balance(address)
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        Ok(SignerInfo { address, balance })
    }

    async fn chain_id(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
    }

    async fn deploy(&self, target: &DeploymentTarget) -> Result<Address, ScriptError> {
        let contract = target.contract;
        let fail = |cause: String| ScriptError::DeploymentFailed { contract, cause };

        let from = self.signer_address()?;
        let artifact = self.artifacts.load(contract).map_err(|e| fail(e.to_string()))?;

        // Constructor arguments are appended to the creation bytecode
        let mut code = artifact.bytecode.to_vec();
        code.extend(target.encoded_constructor_args());

        let tx = TransactionRequest::default().with_from(from).with_deploy_code(code);
        let pending_tx =
            self.provider.send_transaction(tx).await.map_err(|e| fail(e.to_string()))?;
        debug!("{contract} creation transaction: {}", pending_tx.tx_hash());

        let receipt = pending_tx
            .with_required_confirmations(self.tx_options.confirmations)
            .with_timeout(self.tx_options.timeout)
            .get_receipt()
            .await
            .map_err(|e| fail(e.to_string()))?;

        if !receipt.status() {
            return Err(fail(format!("transaction {} reverted", receipt.transaction_hash)));
        }

        receipt
            .contract_address
            .ok_or_else(|| fail(format!("no contract created by {}", receipt.transaction_hash)))
    }
}
