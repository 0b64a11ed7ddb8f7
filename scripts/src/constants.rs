//! Constants used in the deploy scripts

/// The network deployed to when none is given
pub const DEFAULT_NETWORK: &str = "hardhat";

/// The RPC URL of a locally running Hardhat / Anvil node
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// The directory in which deployment records are written, one file per network
pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

/// The root directory of the compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The default log filter
pub const DEFAULT_VERBOSITY: &str = "info";

/// The extension of a deployment record file
pub const DEPLOYMENT_RECORD_EXTENSION: &str = "json";

/// The extension of the scratch file a record is written to before being
/// moved into place
pub const DEPLOYMENT_RECORD_TMP_EXTENSION: &str = "json.tmp";

/// The number of confirmations to wait for on each contract creation transaction
pub const NUM_DEPLOY_CONFIRMATIONS: u64 = 1;

// -------------
// | Artifacts |
// -------------

/// The directory Hardhat places per-source artifact directories under
pub const HARDHAT_SOURCES_SEGMENT: &str = "contracts";

/// The extension of a Solidity source file
pub const SOLIDITY_EXTENSION: &str = "sol";

/// The extension of a compiled artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The extension of the Hardhat debug file sitting next to each artifact,
/// which points at the build info used to produce it
pub const DEBUG_ARTIFACT_EXTENSION: &str = "dbg.json";

// ----------------
// | Verification |
// ----------------

/// The Etherscan (v2, multichain) API endpoint
pub const DEFAULT_ETHERSCAN_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Seconds to wait between verification status checks
pub const DEFAULT_VERIFY_POLL_INTERVAL_SECS: u64 = 5;

/// Number of verification status checks before giving up on a contract
pub const DEFAULT_VERIFY_MAX_POLLS: u32 = 12;

/// The code format Etherscan expects for a standard-JSON compiler input
pub const STANDARD_JSON_CODE_FORMAT: &str = "solidity-standard-json-input";

/// The Etherscan status string for a successful request
pub const ETHERSCAN_STATUS_OK: &str = "1";

/// Substring of an Etherscan result marking a contract as verified
pub const ETHERSCAN_VERIFIED_PREFIX: &str = "Pass";

/// Substring (lowercased) of an Etherscan result for an already-verified contract
pub const ETHERSCAN_ALREADY_VERIFIED: &str = "already verified";

/// Substring (lowercased) of an Etherscan result for a verification still in the queue
pub const ETHERSCAN_PENDING: &str = "pending";
