//! Best-effort source verification against an Etherscan-compatible explorer API

use std::time::Duration;

use alloy::{hex, primitives::Address};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    artifacts::ArtifactStore,
    constants::{
        ETHERSCAN_ALREADY_VERIFIED, ETHERSCAN_PENDING, ETHERSCAN_STATUS_OK,
        ETHERSCAN_VERIFIED_PREFIX, STANDARD_JSON_CODE_FORMAT,
    },
    errors::ScriptError,
    types::DeploymentTarget,
};

/// A service contracts can be verified with
#[async_trait]
pub trait ContractVerifier: Send + Sync {
    /// Submit the target's source for verification at the given address on
    /// the given chain and wait for the outcome.
    ///
    /// Fails with [`ScriptError::VerificationFailed`]
    async fn verify(
        &self,
        chain_id: u64,
        target: &DeploymentTarget,
        address: Address,
    ) -> Result<(), ScriptError>;
}

/// The envelope every Etherscan API response comes in
#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    /// `"1"` on success, `"0"` otherwise
    status: String,
    /// A short status message
    #[serde(default)]
    message: String,
    /// The GUID of a submission, or a human-readable status
    result: String,
}

impl EtherscanResponse {
    /// Whether the request succeeded
    fn is_ok(&self) -> bool {
        self.status == ETHERSCAN_STATUS_OK
    }

    /// Whether the contract had been verified before this request
    fn already_verified(&self) -> bool {
        self.result.to_lowercase().contains(ETHERSCAN_ALREADY_VERIFIED)
    }

    /// Whether the submission is still queued or being processed
    fn is_pending(&self) -> bool {
        self.result.to_lowercase().contains(ETHERSCAN_PENDING)
    }
}

/// Settings for an [`EtherscanVerifier`]
#[derive(Clone, Debug)]
pub struct EtherscanConfig {
    /// The API key
    pub api_key: String,
    /// The API endpoint
    pub api_url: String,
    /// How long to wait between status checks
    pub poll_interval: Duration,
    /// How many status checks to make before giving up
    pub max_polls: u32,
}

/// Verifies contracts through an Etherscan-compatible API using the
/// standard-JSON compiler input recorded in the artifacts' build info
pub struct EtherscanVerifier {
    /// The HTTP client
    client: reqwest::Client,
    /// The API settings
    config: EtherscanConfig,
    /// Where sources and compiler settings are read from
    artifacts: ArtifactStore,
}

impl EtherscanVerifier {
    /// Create a verifier
    pub fn new(config: EtherscanConfig, artifacts: ArtifactStore) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            artifacts,
        }
    }

    /// Submit the verification request, returning the GUID to poll, or `None`
    /// if the contract is already verified
    async fn submit(
        &self,
        chain_id: u64,
        target: &DeploymentTarget,
        address: Address,
    ) -> Result<Option<String>, String> {
        let artifact = self.artifacts.load(target.contract).map_err(|e| e.to_string())?;
        let build_info =
            self.artifacts.load_build_info(target.contract).map_err(|e| e.to_string())?;
        let source = serde_json::to_string(&build_info.input).map_err(|e| e.to_string())?;

        let form = [
            ("apikey", self.config.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", format!("{address:#x}")),
            ("sourceCode", source),
            ("codeformat", STANDARD_JSON_CODE_FORMAT.to_string()),
            ("contractname", artifact.fully_qualified_name()),
            ("compilerversion", format!("v{}", build_info.solc_long_version)),
            // Etherscan's spelling
            ("constructorArguements", hex::encode(target.encoded_constructor_args())),
        ];

        let response: EtherscanResponse = self
            .client
            .post(&self.config.api_url)
            .query(&[("chainid", chain_id.to_string())])
            .form(&form)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        if response.is_ok() {
            Ok(Some(response.result))
        } else if response.already_verified() {
            Ok(None)
        } else {
            Err(format!("{}: {}", response.message, response.result))
        }
    }

    /// Poll the verification status of a submission until it resolves
    async fn await_verification(&self, chain_id: u64, guid: &str) -> Result<(), String> {
        for _ in 0..self.config.max_polls {
            tokio::time::sleep(self.config.poll_interval).await;

            let response: EtherscanResponse = self
                .client
                .get(&self.config.api_url)
                .query(&[
                    ("chainid", chain_id.to_string()),
                    ("apikey", self.config.api_key.clone()),
                    ("module", "contract".to_string()),
                    ("action", "checkverifystatus".to_string()),
                    ("guid", guid.to_string()),
                ])
                .send()
                .await
                .map_err(|e| e.to_string())?
                .json()
                .await
                .map_err(|e| e.to_string())?;

            if response.result.starts_with(ETHERSCAN_VERIFIED_PREFIX) || response.already_verified()
            {
                return Ok(());
            }
            if !response.is_pending() {
                return Err(response.result);
            }
            debug!("verification {guid} still pending");
        }

        Err(format!("still pending after {} status checks", self.config.max_polls))
    }
}

#[async_trait]
impl ContractVerifier for EtherscanVerifier {
    async fn verify(
        &self,
        chain_id: u64,
        target: &DeploymentTarget,
        address: Address,
    ) -> Result<(), ScriptError> {
        let fail = |cause: String| ScriptError::VerificationFailed {
            contract: target.contract,
            cause,
        };

        match self.submit(chain_id, target, address).await.map_err(fail)? {
            Some(guid) => self.await_verification(chain_id, &guid).await.map_err(fail),
            None => Ok(()),
        }
    }
}
