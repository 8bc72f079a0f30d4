//! Operator tooling for MAP Cross Chain Service (MCS) deployments.
//!
//! Deploys the `FeeCenter` contract, authorizes tokens to bridge to
//! destination chains on a `MapCrossChainService` proxy and registers named
//! chains with the `MAPCrossChainServiceRelay` proxy. Signers, deployment
//! records and contract access are passed in explicitly; see [`admin::Admin`].

pub mod admin;
pub mod bindings;
pub mod chain;
pub mod chains;
pub mod config;
pub mod error;
pub mod registry;
pub mod signers;

pub use error::{McsError, Result};
