use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy::{hex, json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;

use crate::error::ClientError;

/// Compiled contract: creation code and ABI.
///
/// Loaded once and shared through [`Arc`] by every account handle targeting
/// the same contract type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractArtifact {
    /// Contract name, e.g. `TokenRoot`.
    pub name: String,
    /// Creation code.
    pub code: Bytes,
    /// Method and constructor schema.
    pub abi: JsonAbi,
}

#[derive(Deserialize)]
struct RawArtifact {
    abi: JsonAbi,
    bytecode: RawBytecode,
}

/// Build tools either nest the code in an object or emit it directly.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Object { object: String },
    Hex(String),
}

impl RawBytecode {
    fn as_str(&self) -> &str {
        match self {
            Self::Object { object } => object,
            Self::Hex(hex) => hex,
        }
    }
}

impl ContractArtifact {
    /// Load artifact `name` from build output directory `dir`.
    ///
    /// Both `<dir>/<name>.sol/<name>.json` and `<dir>/<name>.json` are
    /// accepted.
    ///
    /// # Errors
    ///
    /// May fail if no artifact exists or it is malformed.
    pub fn load(
        dir: impl AsRef<Path>,
        name: &str,
    ) -> Result<Arc<Self>, ClientError> {
        let dir = dir.as_ref();
        let candidates = [
            dir.join(format!("{name}.sol")).join(format!("{name}.json")),
            dir.join(format!("{name}.json")),
        ];

        let Some(path) = candidates.iter().find(|path| path.exists()) else {
            return Err(artifact_error(
                name,
                dir.to_path_buf(),
                "no artifact found".to_string(),
            ));
        };

        let contents = std::fs::read_to_string(path).map_err(|e| {
            artifact_error(name, path.clone(), e.to_string())
        })?;
        let artifact = Self::from_json(name, &contents)
            .map_err(|reason| artifact_error(name, path.clone(), reason))?;

        tracing::debug!(name, path = %path.display(), "loaded artifact");
        Ok(Arc::new(artifact))
    }

    /// Parse an artifact from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if `json` is not an artifact.
    pub fn from_json(name: &str, json: &str) -> Result<Self, String> {
        let raw: RawArtifact =
            serde_json::from_str(json).map_err(|e| e.to_string())?;
        let code = hex::decode(raw.bytecode.as_str())
            .map_err(|e| format!("invalid bytecode hex: {e}"))?;
        if code.is_empty() {
            return Err("empty bytecode, is the contract abstract?".to_string());
        }

        Ok(Self { name: name.to_string(), code: code.into(), abi: raw.abi })
    }
}

fn artifact_error(name: &str, path: PathBuf, reason: String) -> ClientError {
    ClientError::Artifact { name: name.to_string(), path, reason }
}
