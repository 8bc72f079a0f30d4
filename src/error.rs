use std::path::PathBuf;

use thiserror::Error;

use crate::chains::ChainId;

pub type Result<T, E = McsError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum McsError {
    /// The named contract has no deployment record on the active network.
    #[error("no deployment of `{name}` found for network `{network}`")]
    Resolution { name: String, network: String },

    /// The node rejected the transaction before inclusion.
    #[error("transaction submission failed: {0}")]
    Submission(String),

    /// The transaction was included (or simulated) and reverted.
    #[error("transaction reverted: {0}")]
    Revert(String),

    /// A batch of authorizations stopped at `index` (1-indexed). Chains in
    /// `authorized` were confirmed before the failure and stay authorized.
    #[error(
        "setCanBridgeToken halted at chain {chain} ({index} of {total}), already authorized: [{done}]",
        done = join_chains(.authorized)
    )]
    BatchHalted {
        index: usize,
        total: usize,
        chain: ChainId,
        authorized: Vec<ChainId>,
        #[source]
        source: Box<McsError>,
    },

    #[error("invalid chain list: {0}")]
    InvalidChainList(String),

    #[error("no signer named `{0}`")]
    UnknownSigner(String),

    #[error("invalid signer configuration: {0}")]
    Signer(String),

    #[error("artifact for `{contract}`: {reason}")]
    Artifact { contract: String, reason: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn join_chains(chains: &[ChainId]) -> String {
    chains
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
