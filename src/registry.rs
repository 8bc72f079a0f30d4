//! Deployment records, keyed by contract name and network.
//!
//! [`FileRegistry`] keeps one JSON record per contract under
//! `<deployments>/<network>/<Name>.json`, the layout hardhat-deploy writes,
//! so records produced by the existing deploy scripts resolve unchanged.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{McsError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: Address,
    #[serde(default)]
    pub abi: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub from: Address,
    /// ABI-encoded constructor arguments, appended to the creation code.
    pub args: Bytes,
    /// Artifact to deploy; may differ from the deployment name.
    pub contract: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeployOutcome {
    pub deployment: Deployment,
    /// False when an existing record was returned.
    pub newly_deployed: bool,
}

#[async_trait]
pub trait DeploymentRegistry: Send + Sync {
    /// Fails with [`McsError::Resolution`] if `name` was never deployed.
    async fn get(&self, name: &str) -> Result<Deployment>;

    /// Deploys `name` unless a deployment is already recorded, in which case
    /// the existing one is returned and nothing is submitted.
    async fn deploy(&self, name: &str, options: DeployOptions) -> Result<DeployOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedContract {
    pub address: Address,
    pub transaction_hash: TxHash,
}

/// Submits contract creation transactions and waits for their receipts.
#[async_trait]
pub trait ContractCreator: Send + Sync {
    async fn create(&self, from: Address, init_code: Bytes) -> Result<CreatedContract>;
}

pub struct FileRegistry<C> {
    network: String,
    deployments_dir: PathBuf,
    artifacts_dir: PathBuf,
    creator: C,
}

impl<C: ContractCreator> FileRegistry<C> {
    pub fn new(
        network: impl Into<String>,
        deployments_dir: impl Into<PathBuf>,
        artifacts_dir: impl Into<PathBuf>,
        creator: C,
    ) -> Self {
        Self {
            network: network.into(),
            deployments_dir: deployments_dir.into(),
            artifacts_dir: artifacts_dir.into(),
            creator,
        }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.deployments_dir
            .join(&self.network)
            .join(format!("{name}.json"))
    }

    async fn save(&self, name: &str, deployment: &Deployment) -> Result<()> {
        let path = self.record_path(name);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| McsError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
        let json = serde_json::to_string_pretty(deployment).map_err(|source| McsError::Json {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| McsError::Io { path, source })
    }
}

#[async_trait]
impl<C: ContractCreator> DeploymentRegistry for FileRegistry<C> {
    async fn get(&self, name: &str) -> Result<Deployment> {
        let path = self.record_path(name);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(McsError::Resolution {
                    name: name.to_string(),
                    network: self.network.clone(),
                })
            }
            Err(source) => return Err(McsError::Io { path, source }),
        };

        let deployment: Deployment =
            serde_json::from_str(&content).map_err(|source| McsError::Json {
                path: path.clone(),
                source,
            })?;
        debug!(name, address = %deployment.address, "resolved deployment");
        Ok(deployment)
    }

    async fn deploy(&self, name: &str, options: DeployOptions) -> Result<DeployOutcome> {
        match self.get(name).await {
            Ok(deployment) => {
                info!(name, address = %deployment.address, "reusing deployment");
                return Ok(DeployOutcome {
                    deployment,
                    newly_deployed: false,
                });
            }
            Err(McsError::Resolution { .. }) => {}
            Err(e) => return Err(e),
        }

        let root = self.artifacts_dir.clone();
        let contract = options.contract.clone();
        let artifact = tokio::task::spawn_blocking(move || Artifact::load(&root, &contract))
            .await
            .map_err(|e| McsError::Artifact {
                contract: options.contract.clone(),
                reason: e.to_string(),
            })??;
        let init_code: Bytes = [&artifact.bytecode()[..], &options.args[..]]
            .concat()
            .into();

        info!(
            name,
            contract = %options.contract,
            from = %options.from,
            "deploying contract"
        );
        let created = self.creator.create(options.from, init_code).await?;

        let deployment = Deployment {
            address: created.address,
            abi: artifact.abi,
            transaction_hash: Some(created.transaction_hash),
        };
        self.save(name, &deployment).await?;
        info!(
            name,
            address = %created.address,
            tx = %created.transaction_hash,
            "deployed contract"
        );

        Ok(DeployOutcome {
            deployment,
            newly_deployed: true,
        })
    }
}

/// Compiler output for a single contract, forge or hardhat flavoured.
#[derive(Debug, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub abi: serde_json::Value,
    bytecode: ArtifactBytecode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    // hardhat
    Hex(Bytes),
    // forge
    Object { object: Bytes },
}

impl Artifact {
    pub fn bytecode(&self) -> &Bytes {
        match &self.bytecode {
            ArtifactBytecode::Hex(code) | ArtifactBytecode::Object { object: code } => code,
        }
    }

    /// Finds `<contract>.sol/<contract>.json` anywhere under `root`, or
    /// `<contract>.json` directly in it.
    pub fn load(root: &Path, contract: &str) -> Result<Self> {
        let path = find_artifact(root, contract).ok_or_else(|| McsError::Artifact {
            contract: contract.to_string(),
            reason: format!("not found under {}", root.display()),
        })?;

        let content = std::fs::read_to_string(&path).map_err(|source| McsError::Io {
            path: path.clone(),
            source,
        })?;
        let artifact: Artifact =
            serde_json::from_str(&content).map_err(|source| McsError::Json { path, source })?;

        if artifact.bytecode().is_empty() {
            return Err(McsError::Artifact {
                contract: contract.to_string(),
                reason: "empty bytecode, is it an interface or abstract contract?".into(),
            });
        }
        Ok(artifact)
    }
}

fn find_artifact(root: &Path, contract: &str) -> Option<PathBuf> {
    let file = format!("{contract}.json");

    let flat = root.join(&file);
    if flat.is_file() {
        return Some(flat);
    }

    let source_dir = format!("{contract}.sol");
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            // symlinked directories are skipped so link cycles terminate
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            let path = entry.path();
            if entry.file_name() == source_dir.as_str() {
                let candidate = path.join(&file);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            pending.push(path);
        }
    }
    None
}
