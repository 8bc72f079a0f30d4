use alloy::{
    primitives::{Address, TxHash},
    sol,
};
use async_trait::async_trait;

use crate::{chains::ChainId, error::Result, signers::SigningIdentity};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface MapCrossChainService {
        function setCanBridgeToken(address token, uint256 toChainId, bool canBridge) external;
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface MAPCrossChainServiceRelay {
        function setChain(string memory name, uint256 chain) external;
    }
}

/// Interface name of the per-chain service proxy.
pub const CROSS_CHAIN_SERVICE: &str = "MapCrossChainService";
/// Interface name of the relay proxy on the MAP chain.
pub const SERVICE_RELAY: &str = "MAPCrossChainServiceRelay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u128,
}

/// A submitted transaction that has not been confirmed yet.
#[async_trait]
pub trait PendingCall: Send {
    fn tx_hash(&self) -> TxHash;

    /// Waits until the transaction is confirmed. A reverted receipt is an
    /// error.
    async fn confirm(self) -> Result<CallReceipt>;
}

#[async_trait]
pub trait CrossChainService: Send + Sync {
    type Pending: PendingCall;

    fn address(&self) -> Address;

    async fn set_can_bridge_token(
        &self,
        token: Address,
        to_chain: ChainId,
        can_bridge: bool,
    ) -> Result<Self::Pending>;
}

#[async_trait]
pub trait ServiceRelay: Send + Sync {
    type Pending: PendingCall;

    fn address(&self) -> Address;

    async fn set_chain(&self, name: &str, chain: ChainId) -> Result<Self::Pending>;
}

/// Binds deployed addresses to typed handles whose transactions are sent
/// from `from`.
pub trait ContractBinder: Send + Sync {
    type Service: CrossChainService;
    type Relay: ServiceRelay;

    fn cross_chain_service_at(&self, address: Address, from: &SigningIdentity) -> Self::Service;

    fn relay_at(&self, address: Address, from: &SigningIdentity) -> Self::Relay;
}
