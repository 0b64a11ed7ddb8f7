//! Definitions of errors that can occur during the execution of the deploy scripts

use thiserror::Error;

use crate::types::IdentityContract;

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug, Error)]
pub enum ScriptError {
    /// No signing credential is configured for the target network
    #[error("no deployer credential configured for network `{0}`")]
    SignerUnavailable(String),
    /// A contract creation transaction did not complete successfully
    #[error("error deploying {contract}: {cause}")]
    DeploymentFailed {
        /// The contract being deployed
        contract: IdentityContract,
        /// Why the deployment failed
        cause: String,
    },
    /// Best-effort source verification did not succeed
    #[error("error verifying {contract}: {cause}")]
    VerificationFailed {
        /// The contract being verified
        contract: IdentityContract,
        /// Why the verification failed
        cause: String,
    },
    /// Error writing the deployment record
    #[error("error writing deployment record: {0}")]
    PersistenceFailed(String),
    /// Error reading a deployment record
    #[error("error reading deployments: {0}")]
    ReadDeployments(String),
    /// There is no deployment record for the network
    #[error("no deployment record found at {0}")]
    RecordNotFound(String),
    /// Error parsing a compilation artifact
    #[error("error parsing artifact: {0}")]
    ArtifactParsing(String),
    /// Error initializing the RPC client or querying the network through it
    #[error("error initializing client: {0}")]
    ClientInitialization(String),
    /// The RPC endpoint serves a different chain than the one configured
    #[error("chain id mismatch: expected {expected}, RPC endpoint reports {actual}")]
    ChainIdMismatch {
        /// The configured chain id
        expected: u64,
        /// The chain id reported by the endpoint
        actual: u64,
    },
    /// The network name cannot be used as a record key
    #[error("invalid network name `{0}`, expected [A-Za-z0-9_-]+")]
    InvalidNetworkName(String),
    /// Verification was requested without an explorer API key
    #[error("no verification API key configured")]
    VerifierUnavailable,
}
