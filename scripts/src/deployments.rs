//! The deployment record store.
//!
//! Records are keyed by network name, one JSON file per network under the
//! deployments directory. Writing a record replaces whatever was there before;
//! no history is kept.

use std::{fs, io::ErrorKind, path::PathBuf};

use crate::{
    constants::{DEPLOYMENT_RECORD_EXTENSION, DEPLOYMENT_RECORD_TMP_EXTENSION},
    errors::ScriptError,
    types::DeploymentRecord,
    utils::validate_network_name,
};

/// A keyed, last-write-wins store of deployment records
#[derive(Clone, Debug)]
pub struct DeploymentStore {
    /// The directory holding the record files
    dir: PathBuf,
}

impl DeploymentStore {
    /// A store rooted at the given directory. The directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The path of the record for the given network
    pub fn record_path(&self, network: &str) -> Result<PathBuf, ScriptError> {
        validate_network_name(network)?;
        Ok(self.dir.join(format!("{network}.{DEPLOYMENT_RECORD_EXTENSION}")))
    }

    /// Whether a record exists for the given network
    pub fn exists(&self, network: &str) -> bool {
        self.record_path(network).map(|path| path.is_file()).unwrap_or(false)
    }

    /// Write the record, replacing any prior record for its network.
    ///
    /// The record is first written to a scratch file next to its destination
    /// and then renamed over it, so readers never observe a partial record.
    /// Returns the path the record was written to.
    pub fn write(&self, record: &DeploymentRecord) -> Result<PathBuf, ScriptError> {
        let path = self.record_path(&record.network)?;
        let tmp_path =
            self.dir.join(format!(".{}.{DEPLOYMENT_RECORD_TMP_EXTENSION}", record.network));

        fs::create_dir_all(&self.dir).map_err(|e| {
            ScriptError::PersistenceFailed(format!("creating {}: {e}", self.dir.display()))
        })?;

        let mut contents = serde_json::to_string_pretty(record)
            .map_err(|e| ScriptError::PersistenceFailed(e.to_string()))?;
        contents.push('\n');

        let res = fs::write(&tmp_path, contents)
            .map_err(|e| {
                ScriptError::PersistenceFailed(format!("writing {}: {e}", tmp_path.display()))
            })
            .and_then(|()| {
                fs::rename(&tmp_path, &path).map_err(|e| {
                    ScriptError::PersistenceFailed(format!("replacing {}: {e}", path.display()))
                })
            });

        // A failed write or rename must not leave a scratch file behind
        if res.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        res.map(|()| path)
    }

    /// Read the record for the given network
    pub fn read(&self, network: &str) -> Result<DeploymentRecord, ScriptError> {
        let path = self.record_path(network)?;
        let contents = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScriptError::RecordNotFound(path.display().to_string()),
            _ => ScriptError::ReadDeployments(format!("{}: {e}", path.display())),
        })?;

        serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", path.display())))
    }
}
