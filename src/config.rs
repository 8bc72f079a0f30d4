use std::{fmt, path::PathBuf};

use alloy::transports::http::reqwest::Url;
use clap::Args;

use crate::{error::Result, signers::LocalSigners};

/// Connection and account settings shared by every command. Each flag falls
/// back to its `MCS_*` environment variable, which may come from `.env`.
#[derive(Clone, Args)]
pub struct Config {
    /// Network name, selects `<deployments-dir>/<network>`
    #[arg(long, env = "MCS_NETWORK", default_value = "localhost")]
    pub network: String,

    /// JSON-RPC endpoint of the network
    #[arg(long, env = "MCS_RPC_URL", default_value = "http://127.0.0.1:8545")]
    pub rpc_url: Url,

    /// Account private keys, comma separated or repeated
    #[arg(
        long = "private-key",
        env = "MCS_PRIVATE_KEYS",
        value_delimiter = ',',
        hide_env_values = true,
        required = true
    )]
    pub private_keys: Vec<String>,

    /// Which private key acts as the deployer
    #[arg(long, env = "MCS_DEPLOYER_INDEX", default_value_t = 0)]
    pub deployer_index: usize,

    /// Directory holding per-network deployment records
    #[arg(long, env = "MCS_DEPLOYMENTS_DIR", default_value = "deployments")]
    pub deployments_dir: PathBuf,

    /// Directory holding compiled contract artifacts
    #[arg(long, env = "MCS_ARTIFACTS_DIR", default_value = "out")]
    pub artifacts_dir: PathBuf,

    /// Blocks to wait for before a transaction counts as confirmed
    #[arg(long, env = "MCS_CONFIRMATIONS", default_value_t = 1)]
    pub confirmations: u64,
}

impl Config {
    pub fn signers(&self) -> Result<LocalSigners> {
        LocalSigners::from_private_keys(&self.private_keys, self.deployer_index)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("network", &self.network)
            .field("rpc_url", &self.rpc_url.as_str())
            .field("private_keys", &format!("<{} redacted>", self.private_keys.len()))
            .field("deployer_index", &self.deployer_index)
            .field("deployments_dir", &self.deployments_dir)
            .field("artifacts_dir", &self.artifacts_dir)
            .field("confirmations", &self.confirmations)
            .finish()
    }
}
