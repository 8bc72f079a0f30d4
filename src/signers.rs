//! Signing identities used as the `from` of administrative transactions.

use std::collections::BTreeMap;

use alloy::{network::EthereumWallet, primitives::Address, signers::local::PrivateKeySigner};
use tracing::debug;

use crate::error::{McsError, Result};

/// Name under which the administrative account is registered.
pub const DEPLOYER: &str = "deployer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningIdentity {
    /// Position in the provider's account list.
    pub index: usize,
    pub address: Address,
}

#[derive(Debug, Clone, Default)]
pub struct NamedSigners(BTreeMap<String, SigningIdentity>);

impl NamedSigners {
    pub fn insert(&mut self, name: impl Into<String>, identity: SigningIdentity) {
        self.0.insert(name.into(), identity);
    }

    pub fn get(&self, name: &str) -> Result<SigningIdentity> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| McsError::UnknownSigner(name.to_string()))
    }

    pub fn deployer(&self) -> Result<SigningIdentity> {
        self.get(DEPLOYER)
    }
}

/// Source of the accounts a workflow may sign with.
pub trait SignerProvider: Send + Sync {
    /// All accounts, in configuration order. Index 0 is the deployer by
    /// convention.
    fn signers(&self) -> Vec<SigningIdentity>;

    fn named_signers(&self) -> NamedSigners;
}

/// Accounts backed by local private keys.
pub struct LocalSigners {
    keys: Vec<PrivateKeySigner>,
    named: BTreeMap<String, usize>,
}

impl LocalSigners {
    /// Builds the account list. `deployer_index` selects which key acts as
    /// the named `deployer`.
    pub fn from_private_keys<I, S>(keys: I, deployer_index: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .enumerate()
            .map(|(i, key)| {
                key.as_ref()
                    .trim()
                    .parse::<PrivateKeySigner>()
                    .map_err(|e| McsError::Signer(format!("private key #{i}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        if keys.is_empty() {
            return Err(McsError::Signer("no private keys configured".into()));
        }
        if deployer_index >= keys.len() {
            return Err(McsError::Signer(format!(
                "deployer index {deployer_index} out of range for {} keys",
                keys.len()
            )));
        }

        let named = BTreeMap::from([(DEPLOYER.to_string(), deployer_index)]);
        debug!(accounts = keys.len(), deployer_index, "loaded local signers");

        Ok(Self { keys, named })
    }

    /// Wallet holding every key; the deployer is the default signer and the
    /// rest are selected by a transaction's `from`.
    pub fn wallet(&self) -> EthereumWallet {
        let deployer = self.named.get(DEPLOYER).copied().unwrap_or_default();
        let mut wallet = EthereumWallet::from(self.keys[deployer].clone());
        for (i, key) in self.keys.iter().enumerate() {
            if i != deployer {
                wallet.register_signer(key.clone());
            }
        }
        wallet
    }
}

impl SignerProvider for LocalSigners {
    fn signers(&self) -> Vec<SigningIdentity> {
        self.keys
            .iter()
            .enumerate()
            .map(|(index, key)| SigningIdentity {
                index,
                address: key.address(),
            })
            .collect()
    }

    fn named_signers(&self) -> NamedSigners {
        let accounts = self.signers();
        let mut named = NamedSigners::default();
        for (name, &index) in &self.named {
            named.insert(name.clone(), accounts[index]);
        }
        named
    }
}
