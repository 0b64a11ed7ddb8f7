//! Loading of compiled contract artifacts.
//!
//! Both the Hardhat layout (`<root>/contracts/<Name>.sol/<Name>.json`) and the
//! Foundry layout (`<root>/<Name>.sol/<Name>.json`) are supported. Hardhat
//! artifacts additionally carry a `<Name>.dbg.json` file pointing at the build
//! info, which holds the standard-JSON compiler input needed for verification.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::primitives::Bytes;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    constants::{
        ARTIFACT_EXTENSION, DEBUG_ARTIFACT_EXTENSION, HARDHAT_SOURCES_SEGMENT, SOLIDITY_EXTENSION,
    },
    errors::ScriptError,
    types::IdentityContract,
};

/// The creation bytecode as found in an artifact.
///
/// Hardhat stores a hex string, Foundry an object with the hex under `object`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    /// A bare hex string
    Hex(String),
    /// A bytecode object
    Object {
        /// The hex-encoded bytecode
        object: String,
    },
}

impl RawBytecode {
    /// The hex-encoded bytecode
    fn hex(&self) -> &str {
        match self {
            RawBytecode::Hex(hex) => hex,
            RawBytecode::Object { object } => object,
        }
    }
}

/// The fields of an artifact file that deployment and verification need
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    /// The contract name, absent in Foundry artifacts
    contract_name: Option<String>,
    /// The source file path, absent in Foundry artifacts
    source_name: Option<String>,
    /// The creation bytecode
    bytecode: RawBytecode,
}

/// A Hardhat `.dbg.json` file
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugArtifact {
    /// Path of the build info, relative to the debug file
    build_info: String,
}

/// A compiled contract, ready to be deployed
#[derive(Clone, Debug)]
pub struct ContractArtifact {
    /// The contract name
    pub contract_name: String,
    /// The path of the source file the contract is defined in, relative to the project root
    pub source_name: String,
    /// The creation bytecode
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// The fully qualified name, `<source>:<contract>`, used by verification services
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// The compiler invocation an artifact was produced by
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// The full compiler version, e.g. `0.8.24+commit.e11b9ed9`
    pub solc_long_version: String,
    /// The standard-JSON compiler input
    pub input: Value,
}

/// Reads artifacts from a compilation output directory
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    /// The root of the compilation output
    root: PathBuf,
}

impl ArtifactStore {
    /// An artifact store reading from the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the artifact for the given contract, preferring the Hardhat layout
    pub fn artifact_path(&self, contract: IdentityContract) -> Result<PathBuf, ScriptError> {
        let source_dir = format!("{}.{SOLIDITY_EXTENSION}", contract.name());
        let file_name = format!("{}.{ARTIFACT_EXTENSION}", contract.name());

        let candidates = [
            self.root.join(HARDHAT_SOURCES_SEGMENT).join(&source_dir).join(&file_name),
            self.root.join(&source_dir).join(&file_name),
        ];

        candidates.into_iter().find(|path| path.is_file()).ok_or_else(|| {
            ScriptError::ArtifactParsing(format!(
                "no artifact for {contract} under {}",
                self.root.display()
            ))
        })
    }

    /// Load the artifact for the given contract
    pub fn load(&self, contract: IdentityContract) -> Result<ContractArtifact, ScriptError> {
        let path = self.artifact_path(contract)?;
        let raw: RawArtifact = read_json(&path)?;

        let hex = raw.bytecode.hex();
        let bytecode = Bytes::from_str(hex).map_err(|e| {
            ScriptError::ArtifactParsing(format!("invalid bytecode in {}: {e}", path.display()))
        })?;
        if bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{contract} has no creation bytecode, is it abstract?"
            )));
        }

        Ok(ContractArtifact {
            contract_name: raw.contract_name.unwrap_or_else(|| contract.name().to_string()),
            source_name: raw.source_name.unwrap_or_else(|| {
                format!("{HARDHAT_SOURCES_SEGMENT}/{}.{SOLIDITY_EXTENSION}", contract.name())
            }),
            bytecode,
        })
    }

    /// Load the build info the given contract was compiled with.
    ///
    /// Only available for Hardhat artifacts
    pub fn load_build_info(&self, contract: IdentityContract) -> Result<BuildInfo, ScriptError> {
        let artifact_path = self.artifact_path(contract)?;
        let debug_path = artifact_path
            .with_file_name(format!("{}.{DEBUG_ARTIFACT_EXTENSION}", contract.name()));
        if !debug_path.is_file() {
            return Err(ScriptError::ArtifactParsing(format!(
                "no build info recorded for {contract}"
            )));
        }

        let debug: DebugArtifact = read_json(&debug_path)?;
        // The build info path is relative to the debug file
        let dir = debug_path.parent().unwrap_or_else(|| Path::new("."));
        read_json(&dir.join(debug.build_info))
    }
}

/// Read and deserialize a JSON file
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;

    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))
}
