//! Destination chain identifiers as understood by the MCS contracts.
//!
//! The contracts key their routing tables by `uint256`, so identifiers are
//! parsed up front instead of being handed to the node as raw strings. A
//! malformed list fails here, before any transaction is sent.

use std::{fmt, str::FromStr};

use alloy::primitives::U256;

use crate::error::McsError;

/// A destination chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(U256);

impl ChainId {
    pub const fn as_u256(&self) -> U256 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(U256::from(id))
    }
}

impl From<ChainId> for U256 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = McsError;

    /// Accepts decimal or `0x`-prefixed hex, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(McsError::InvalidChainList("empty chain id".into()));
        }

        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some("") => {
                return Err(McsError::InvalidChainList(format!(
                    "`{s}` has no hex digits"
                )))
            }
            Some(hex) => U256::from_str_radix(hex, 16),
            None => U256::from_str_radix(s, 10),
        };

        parsed
            .map(Self)
            .map_err(|e| McsError::InvalidChainList(format!("`{s}` is not a chain id: {e}")))
    }
}

/// A non-empty, ordered list of chain ids. Order is submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainList(Vec<ChainId>);

impl ChainList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A parsed list holds at least one id.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChainId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ChainId] {
        &self.0
    }
}

impl TryFrom<Vec<ChainId>> for ChainList {
    type Error = McsError;

    fn try_from(ids: Vec<ChainId>) -> Result<Self, Self::Error> {
        if ids.is_empty() {
            return Err(McsError::InvalidChainList("no chains given".into()));
        }
        Ok(Self(ids))
    }
}

impl FromStr for ChainList {
    type Err = McsError;

    /// Parses a comma separated list such as `"1,22776,0x4e454152"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(McsError::InvalidChainList("no chains given".into()));
        }

        let ids = s
            .split(',')
            .enumerate()
            .map(|(i, entry)| {
                entry.parse::<ChainId>().map_err(|e| match e {
                    McsError::InvalidChainList(reason) => {
                        McsError::InvalidChainList(format!("entry {}: {reason}", i + 1))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::try_from(ids)
    }
}
