use std::{fmt::Display, marker::PhantomData};

use alloy::{
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    providers::{PendingTransactionBuilder, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::Transport,
};
use async_trait::async_trait;
use tracing::debug;

use crate::{
    bindings::{
        CallReceipt, ContractBinder, CrossChainService, MAPCrossChainServiceRelay,
        MapCrossChainService, PendingCall, ServiceRelay,
    },
    chains::ChainId,
    error::{McsError, Result},
    registry::{ContractCreator, CreatedContract},
    signers::SigningIdentity,
};

/// An EVM chain reached through an alloy provider that holds the signing
/// wallet.
#[derive(Clone)]
pub struct EvmChain<P, T> {
    provider: P,
    confirmations: u64,
    _phantom: PhantomData<T>,
}

impl<P, T> EvmChain<P, T>
where
    P: Provider<T, Ethereum> + Clone,
    T: Transport + Clone,
{
    /// `confirmations` is the number of blocks a transaction must be buried
    /// under before it counts as confirmed.
    pub fn new(provider: P, confirmations: u64) -> Self {
        Self {
            provider,
            confirmations: confirmations.max(1),
            _phantom: PhantomData,
        }
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.map_err(classify)
    }
}

impl<P, T> ContractBinder for EvmChain<P, T>
where
    P: Provider<T, Ethereum> + Clone,
    T: Transport + Clone,
{
    type Service = EvmCrossChainService<P, T>;
    type Relay = EvmServiceRelay<P, T>;

    fn cross_chain_service_at(&self, address: Address, from: &SigningIdentity) -> Self::Service {
        EvmCrossChainService {
            instance: MapCrossChainService::new(address, self.provider.clone()),
            from: from.address,
            confirmations: self.confirmations,
        }
    }

    fn relay_at(&self, address: Address, from: &SigningIdentity) -> Self::Relay {
        EvmServiceRelay {
            instance: MAPCrossChainServiceRelay::new(address, self.provider.clone()),
            from: from.address,
            confirmations: self.confirmations,
        }
    }
}

#[async_trait]
impl<P, T> ContractCreator for EvmChain<P, T>
where
    P: Provider<T, Ethereum> + Clone,
    T: Transport + Clone,
{
    async fn create(&self, from: Address, init_code: Bytes) -> Result<CreatedContract> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(init_code);

        let pending = self.provider.send_transaction(tx).await.map_err(classify)?;
        let transaction_hash = *pending.tx_hash();
        debug!(tx = %transaction_hash, "submitted contract creation");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|e| McsError::Submission(e.to_string()))?;
        check_status(&receipt)?;

        let address = receipt.contract_address.ok_or_else(|| {
            McsError::Submission(format!("receipt of {transaction_hash} has no contract address"))
        })?;

        Ok(CreatedContract {
            address,
            transaction_hash,
        })
    }
}

pub struct EvmCrossChainService<P, T> {
    instance: MapCrossChainService::MapCrossChainServiceInstance<T, P>,
    from: Address,
    confirmations: u64,
}

#[async_trait]
impl<P, T> CrossChainService for EvmCrossChainService<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    type Pending = EvmPendingCall<T>;

    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn set_can_bridge_token(
        &self,
        token: Address,
        to_chain: ChainId,
        can_bridge: bool,
    ) -> Result<Self::Pending> {
        let pending = self
            .instance
            .setCanBridgeToken(token, to_chain.into(), can_bridge)
            .from(self.from)
            .send()
            .await
            .map_err(classify)?;

        Ok(EvmPendingCall::new(pending, self.confirmations))
    }
}

pub struct EvmServiceRelay<P, T> {
    instance: MAPCrossChainServiceRelay::MAPCrossChainServiceRelayInstance<T, P>,
    from: Address,
    confirmations: u64,
}

#[async_trait]
impl<P, T> ServiceRelay for EvmServiceRelay<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    type Pending = EvmPendingCall<T>;

    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn set_chain(&self, name: &str, chain: ChainId) -> Result<Self::Pending> {
        let pending = self
            .instance
            .setChain(name.to_string(), chain.into())
            .from(self.from)
            .send()
            .await
            .map_err(classify)?;

        Ok(EvmPendingCall::new(pending, self.confirmations))
    }
}

pub struct EvmPendingCall<T> {
    inner: PendingTransactionBuilder<T, Ethereum>,
}

impl<T: Transport + Clone> EvmPendingCall<T> {
    fn new(inner: PendingTransactionBuilder<T, Ethereum>, confirmations: u64) -> Self {
        Self {
            inner: inner.with_required_confirmations(confirmations),
        }
    }
}

#[async_trait]
impl<T: Transport + Clone> PendingCall for EvmPendingCall<T> {
    fn tx_hash(&self) -> TxHash {
        *self.inner.tx_hash()
    }

    async fn confirm(self) -> Result<CallReceipt> {
        let receipt = self
            .inner
            .get_receipt()
            .await
            .map_err(|e| McsError::Submission(e.to_string()))?;
        check_status(&receipt)?;

        Ok(CallReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: u128::from(receipt.gas_used),
        })
    }
}

fn check_status(receipt: &TransactionReceipt) -> Result<()> {
    if receipt.status() {
        return Ok(());
    }
    Err(McsError::Revert(format!(
        "transaction {} failed in block {}",
        receipt.transaction_hash,
        receipt
            .block_number
            .map_or_else(|| "<pending>".to_string(), |n| n.to_string())
    )))
}

/// Nodes report reverts found during gas estimation as RPC errors; those are
/// reverts, everything else never reached the chain.
fn classify(err: impl Display) -> McsError {
    let message = err.to_string();
    if message.to_lowercase().contains("revert") {
        McsError::Revert(message)
    } else {
        McsError::Submission(message)
    }
}
