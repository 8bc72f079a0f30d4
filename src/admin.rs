//! Administrative workflows against the deployed MCS contracts.
//!
//! Every mutating call is confirmed before the next one is submitted, so a
//! failure at step `k` means steps `k+1..` were never attempted.

use alloy::primitives::{Address, Bytes};
use tracing::{debug, info, warn};

use crate::{
    bindings::{
        CallReceipt, ContractBinder, CrossChainService, PendingCall, ServiceRelay,
        CROSS_CHAIN_SERVICE, SERVICE_RELAY,
    },
    chains::{ChainId, ChainList},
    error::{McsError, Result},
    registry::{DeployOptions, Deployment, DeploymentRegistry},
    signers::{SignerProvider, SigningIdentity},
};

pub const FEE_CENTER: &str = "FeeCenter";
pub const CROSS_CHAIN_SERVICE_PROXY: &str = "MapCrossChainServiceProxy";
pub const SERVICE_RELAY_PROXY: &str = "MAPCrossChainServiceRelayProxy";

/// The collaborators of a single workflow invocation.
pub struct Admin<'a, S, R, B> {
    signers: &'a S,
    registry: &'a R,
    binder: &'a B,
}

impl<'a, S, R, B> Admin<'a, S, R, B>
where
    S: SignerProvider,
    R: DeploymentRegistry,
    B: ContractBinder,
{
    pub fn new(signers: &'a S, registry: &'a R, binder: &'a B) -> Self {
        Self {
            signers,
            registry,
            binder,
        }
    }

    pub fn deployer(&self) -> Result<SigningIdentity> {
        let deployer = self.signers.named_signers().deployer()?;
        info!(address = %deployer.address, "deployer address");
        Ok(deployer)
    }

    pub async fn bind_cross_chain_service(
        &self,
        proxy: &str,
        from: &SigningIdentity,
    ) -> Result<B::Service> {
        let deployment = self.registry.get(proxy).await?;
        debug!(proxy, interface = CROSS_CHAIN_SERVICE, address = %deployment.address, "bound proxy");
        Ok(self.binder.cross_chain_service_at(deployment.address, from))
    }

    pub async fn bind_relay(&self, proxy: &str, from: &SigningIdentity) -> Result<B::Relay> {
        let deployment = self.registry.get(proxy).await?;
        debug!(proxy, interface = SERVICE_RELAY, address = %deployment.address, "bound proxy");
        Ok(self.binder.relay_at(deployment.address, from))
    }

    /// Deploys `FeeCenter` from the deployer unless the network already has
    /// one, and returns its deployment.
    pub async fn ensure_fee_center(&self) -> Result<Deployment> {
        let deployer = self.deployer()?;

        let outcome = self
            .registry
            .deploy(
                FEE_CENTER,
                DeployOptions {
                    from: deployer.address,
                    args: Bytes::new(),
                    contract: FEE_CENTER.to_string(),
                },
            )
            .await?;

        info!(
            address = %outcome.deployment.address,
            newly_deployed = outcome.newly_deployed,
            "feeCenter address"
        );
        Ok(outcome.deployment)
    }

    /// Authorizes `token` to bridge to every chain in `chains`, one
    /// confirmed transaction at a time, in list order.
    ///
    /// Stops at the first failure with [`McsError::BatchHalted`]; chains
    /// before it stay authorized and re-running the same list is safe.
    pub async fn set_can_bridge_token(
        &self,
        proxy: &str,
        token: Address,
        chains: &ChainList,
    ) -> Result<Vec<CallReceipt>> {
        let deployer = self.deployer()?;
        let service = self.bind_cross_chain_service(proxy, &deployer).await?;

        let total = chains.len();
        let mut receipts = Vec::with_capacity(total);
        for (i, &chain) in chains.iter().enumerate() {
            match authorize(&service, token, chain).await {
                Ok(receipt) => {
                    info!(
                        chain = %chain,
                        tx = %receipt.tx_hash,
                        block = ?receipt.block_number,
                        gas_used = receipt.gas_used,
                        index = i + 1,
                        total,
                        "setCanBridgeToken confirmed"
                    );
                    receipts.push(receipt);
                }
                Err(source) => {
                    warn!(chain = %chain, index = i + 1, total, error = %source, "setCanBridgeToken failed");
                    return Err(McsError::BatchHalted {
                        index: i + 1,
                        total,
                        chain,
                        authorized: chains.as_slice()[..i].to_vec(),
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(receipts)
    }

    /// Maps `name` to `chain` in the relay's chain table.
    pub async fn register_relay_chain(
        &self,
        proxy: &str,
        name: &str,
        chain: ChainId,
    ) -> Result<CallReceipt> {
        let deployer = self.deployer()?;
        let relay = self.bind_relay(proxy, &deployer).await?;

        let pending = relay.set_chain(name, chain).await?;
        debug!(relay = %relay.address(), name, chain = %chain, tx = %pending.tx_hash(), "setChain submitted");

        let receipt = pending.confirm().await?;
        info!(
            name,
            chain = %chain,
            tx = %receipt.tx_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "setChain confirmed"
        );
        Ok(receipt)
    }
}

async fn authorize<C: CrossChainService>(
    service: &C,
    token: Address,
    chain: ChainId,
) -> Result<CallReceipt> {
    let pending = service.set_can_bridge_token(token, chain, true).await?;
    debug!(
        proxy = %service.address(),
        token = %token,
        chain = %chain,
        tx = %pending.tx_hash(),
        "setCanBridgeToken submitted"
    );
    pending.confirm().await
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{BTreeSet, HashMap},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    use alloy::primitives::{address, TxHash};
    use async_trait::async_trait;

    use super::*;
    use crate::{
        registry::DeployOutcome,
        signers::{NamedSigners, DEPLOYER},
    };

    const OWNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const TOKEN: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const MCS_PROXY: Address = address!("0000000000000000000000000000000000000c05");
    const RELAY_PROXY: Address = address!("00000000000000000000000000000000000004e1");
    const FEE_CENTER_ADDRESS: Address = address!("000000000000000000000000000000000000fee0");

    struct OneSigner;

    impl SignerProvider for OneSigner {
        fn signers(&self) -> Vec<SigningIdentity> {
            vec![SigningIdentity {
                index: 0,
                address: OWNER,
            }]
        }

        fn named_signers(&self) -> NamedSigners {
            let mut named = NamedSigners::default();
            named.insert(DEPLOYER, self.signers()[0]);
            named
        }
    }

    #[derive(Default)]
    struct MemoryRegistry {
        records: Mutex<HashMap<String, Address>>,
        deployments: AtomicUsize,
    }

    impl MemoryRegistry {
        fn with_proxies() -> Self {
            let registry = Self::default();
            {
                let mut records = registry.records.lock().unwrap();
                records.insert(CROSS_CHAIN_SERVICE_PROXY.into(), MCS_PROXY);
                records.insert(SERVICE_RELAY_PROXY.into(), RELAY_PROXY);
            }
            registry
        }
    }

    #[async_trait]
    impl DeploymentRegistry for MemoryRegistry {
        async fn get(&self, name: &str) -> Result<Deployment> {
            let records = self.records.lock().unwrap();
            records
                .get(name)
                .map(|&address| Deployment {
                    address,
                    abi: serde_json::Value::Null,
                    transaction_hash: None,
                })
                .ok_or_else(|| McsError::Resolution {
                    name: name.into(),
                    network: "test".into(),
                })
        }

        async fn deploy(&self, name: &str, options: DeployOptions) -> Result<DeployOutcome> {
            assert_eq!(options.from, OWNER);
            if let Ok(deployment) = self.get(name).await {
                return Ok(DeployOutcome {
                    deployment,
                    newly_deployed: false,
                });
            }
            self.deployments.fetch_add(1, Ordering::SeqCst);
            self.records
                .lock()
                .unwrap()
                .insert(name.into(), FEE_CENTER_ADDRESS);
            Ok(DeployOutcome {
                deployment: self.get(name).await?,
                newly_deployed: true,
            })
        }
    }

    /// Every deployment attempt is rejected by the node.
    struct UnfundedRegistry;

    #[async_trait]
    impl DeploymentRegistry for UnfundedRegistry {
        async fn get(&self, name: &str) -> Result<Deployment> {
            Err(McsError::Resolution {
                name: name.into(),
                network: "test".into(),
            })
        }

        async fn deploy(&self, _name: &str, _options: DeployOptions) -> Result<DeployOutcome> {
            Err(McsError::Submission(
                "insufficient funds for gas * price + value".into(),
            ))
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Bound(Address, Address),
        Submitted(String),
        Confirmed(String),
    }

    #[derive(Debug, Clone, Copy)]
    enum Failure {
        Submit,
        Revert,
    }

    /// Stands in for the chain: records every step and keeps the resulting
    /// contract state.
    #[derive(Clone, Default)]
    struct MockChain {
        events: Arc<Mutex<Vec<Event>>>,
        authorized: Arc<Mutex<BTreeSet<(Address, ChainId)>>>,
        relay_chains: Arc<Mutex<HashMap<String, ChainId>>>,
        fail_on: Option<(ChainId, Failure)>,
        sent: Arc<AtomicUsize>,
    }

    impl MockChain {
        fn failing(chain: u64, failure: Failure) -> Self {
            Self {
                fail_on: Some((ChainId::from(chain), failure)),
                ..Self::default()
            }
        }

        fn record(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn failure_for(&self, chain: ChainId) -> Option<Failure> {
            self.fail_on
                .filter(|(failing, _)| *failing == chain)
                .map(|(_, failure)| failure)
        }

        fn next_hash(&self) -> TxHash {
            let n = self.sent.fetch_add(1, Ordering::SeqCst) as u8;
            TxHash::repeat_byte(n + 1)
        }
    }

    struct MockPending {
        chain: MockChain,
        label: String,
        tx_hash: TxHash,
        revert: bool,
        apply: Box<dyn FnOnce() + Send>,
    }

    #[async_trait]
    impl PendingCall for MockPending {
        fn tx_hash(&self) -> TxHash {
            self.tx_hash
        }

        async fn confirm(self) -> Result<CallReceipt> {
            tokio::task::yield_now().await;
            if self.revert {
                return Err(McsError::Revert(format!("{} reverted", self.label)));
            }
            (self.apply)();
            self.chain.record(Event::Confirmed(self.label));
            Ok(CallReceipt {
                tx_hash: self.tx_hash,
                block_number: Some(1),
                gas_used: 21_000,
            })
        }
    }

    struct MockService {
        chain: MockChain,
        address: Address,
        from: Address,
    }

    #[async_trait]
    impl CrossChainService for MockService {
        type Pending = MockPending;

        fn address(&self) -> Address {
            self.address
        }

        async fn set_can_bridge_token(
            &self,
            token: Address,
            to_chain: ChainId,
            can_bridge: bool,
        ) -> Result<MockPending> {
            assert_eq!(self.from, OWNER);
            let label = format!("setCanBridgeToken({token},{to_chain},{can_bridge})");
            self.chain.record(Event::Submitted(label.clone()));

            let failure = self.chain.failure_for(to_chain);
            if let Some(Failure::Submit) = failure {
                return Err(McsError::Submission("nonce too low".into()));
            }

            let authorized = self.chain.authorized.clone();
            Ok(MockPending {
                tx_hash: self.chain.next_hash(),
                chain: self.chain.clone(),
                label,
                revert: matches!(failure, Some(Failure::Revert)),
                apply: Box::new(move || {
                    if can_bridge {
                        authorized.lock().unwrap().insert((token, to_chain));
                    }
                }),
            })
        }
    }

    struct MockRelay {
        chain: MockChain,
        address: Address,
    }

    #[async_trait]
    impl ServiceRelay for MockRelay {
        type Pending = MockPending;

        fn address(&self) -> Address {
            self.address
        }

        async fn set_chain(&self, name: &str, chain: ChainId) -> Result<MockPending> {
            let label = format!("setChain({name},{chain})");
            self.chain.record(Event::Submitted(label.clone()));

            let failure = self.chain.failure_for(chain);
            if let Some(Failure::Submit) = failure {
                return Err(McsError::Submission("nonce too low".into()));
            }

            let table = self.chain.relay_chains.clone();
            let name = name.to_string();
            Ok(MockPending {
                tx_hash: self.chain.next_hash(),
                chain: self.chain.clone(),
                label,
                revert: matches!(failure, Some(Failure::Revert)),
                apply: Box::new(move || {
                    table.lock().unwrap().insert(name, chain);
                }),
            })
        }
    }

    impl ContractBinder for MockChain {
        type Service = MockService;
        type Relay = MockRelay;

        fn cross_chain_service_at(&self, address: Address, from: &SigningIdentity) -> MockService {
            self.record(Event::Bound(address, from.address));
            MockService {
                chain: self.clone(),
                address,
                from: from.address,
            }
        }

        fn relay_at(&self, address: Address, from: &SigningIdentity) -> MockRelay {
            self.record(Event::Bound(address, from.address));
            MockRelay {
                chain: self.clone(),
                address,
            }
        }
    }

    fn grant(chain: u64) -> String {
        format!("setCanBridgeToken({TOKEN},{chain},true)")
    }

    #[tokio::test]
    async fn authorizes_each_chain_after_the_previous_confirms() {
        let registry = MemoryRegistry::with_proxies();
        let chain = MockChain::default();
        let admin = Admin::new(&OneSigner, &registry, &chain);

        let chains: ChainList = "1,2,3".parse().unwrap();
        let receipts = admin
            .set_can_bridge_token(CROSS_CHAIN_SERVICE_PROXY, TOKEN, &chains)
            .await
            .unwrap();

        assert_eq!(receipts.len(), 3);
        assert_eq!(
            chain.events(),
            [
                Event::Bound(MCS_PROXY, OWNER),
                Event::Submitted(grant(1)),
                Event::Confirmed(grant(1)),
                Event::Submitted(grant(2)),
                Event::Confirmed(grant(2)),
                Event::Submitted(grant(3)),
                Event::Confirmed(grant(3)),
            ]
        );

        let authorized = chain.authorized.lock().unwrap();
        let expected: BTreeSet<_> = [1u64, 2, 3]
            .into_iter()
            .map(|id| (TOKEN, ChainId::from(id)))
            .collect();
        assert_eq!(*authorized, expected);
    }

    #[tokio::test]
    async fn submission_failure_halts_the_batch() {
        let registry = MemoryRegistry::with_proxies();
        let chain = MockChain::failing(2, Failure::Submit);
        let admin = Admin::new(&OneSigner, &registry, &chain);

        let chains: ChainList = "1,2,3".parse().unwrap();
        let err = admin
            .set_can_bridge_token(CROSS_CHAIN_SERVICE_PROXY, TOKEN, &chains)
            .await
            .unwrap_err();

        match err {
            McsError::BatchHalted {
                index,
                total,
                chain: failed,
                authorized,
                source,
            } => {
                assert_eq!((index, total), (2, 3));
                assert_eq!(failed, ChainId::from(2u64));
                assert_eq!(authorized, [ChainId::from(1u64)]);
                assert!(matches!(*source, McsError::Submission(_)));
            }
            other => panic!("unexpected error: {other}"),
        }

        let events = chain.events();
        assert!(!events.contains(&Event::Submitted(grant(3))));
        assert_eq!(events.last(), Some(&Event::Submitted(grant(2))));
    }

    #[tokio::test]
    async fn revert_halts_without_rolling_back() {
        let registry = MemoryRegistry::with_proxies();
        let chain = MockChain::failing(3, Failure::Revert);
        let admin = Admin::new(&OneSigner, &registry, &chain);

        let chains: ChainList = "1,2,3,4".parse().unwrap();
        let err = admin
            .set_can_bridge_token(CROSS_CHAIN_SERVICE_PROXY, TOKEN, &chains)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            McsError::BatchHalted { index: 3, total: 4, ref source, .. }
                if matches!(**source, McsError::Revert(_))
        ));
        assert!(!chain.events().contains(&Event::Submitted(grant(4))));

        let authorized = chain.authorized.lock().unwrap();
        assert_eq!(authorized.len(), 2);
        assert!(authorized.contains(&(TOKEN, ChainId::from(2u64))));
    }

    #[tokio::test]
    async fn missing_proxy_sends_nothing() {
        let registry = MemoryRegistry::default();
        let chain = MockChain::default();
        let admin = Admin::new(&OneSigner, &registry, &chain);

        let chains: ChainList = "1".parse().unwrap();
        let err = admin
            .set_can_bridge_token(CROSS_CHAIN_SERVICE_PROXY, TOKEN, &chains)
            .await
            .unwrap_err();

        assert!(matches!(err, McsError::Resolution { .. }));
        assert!(chain.events().is_empty());
    }

    #[tokio::test]
    async fn registers_relay_chain_once() {
        let registry = MemoryRegistry::with_proxies();
        let chain = MockChain::default();
        let admin = Admin::new(&OneSigner, &registry, &chain);

        let receipt = admin
            .register_relay_chain(SERVICE_RELAY_PROXY, "near", ChainId::from(5566u64))
            .await
            .unwrap();

        assert_eq!(receipt.tx_hash, TxHash::repeat_byte(1));
        assert_eq!(
            chain.events(),
            [
                Event::Bound(RELAY_PROXY, OWNER),
                Event::Submitted("setChain(near,5566)".into()),
                Event::Confirmed("setChain(near,5566)".into()),
            ]
        );
        assert_eq!(
            chain.relay_chains.lock().unwrap().get("near"),
            Some(&ChainId::from(5566u64))
        );
    }

    #[tokio::test]
    async fn fee_center_is_deployed_once() {
        let registry = MemoryRegistry::default();
        let chain = MockChain::default();
        let admin = Admin::new(&OneSigner, &registry, &chain);

        let first = admin.ensure_fee_center().await.unwrap();
        let second = admin.ensure_fee_center().await.unwrap();

        assert_eq!(first.address, FEE_CENTER_ADDRESS);
        assert_eq!(second.address, first.address);
        assert_eq!(registry.deployments.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn existing_fee_center_is_not_redeployed() {
        let registry = MemoryRegistry::default();
        registry
            .records
            .lock()
            .unwrap()
            .insert(FEE_CENTER.into(), FEE_CENTER_ADDRESS);
        let chain = MockChain::default();
        let admin = Admin::new(&OneSigner, &registry, &chain);

        for _ in 0..2 {
            let deployment = admin.ensure_fee_center().await.unwrap();
            assert_eq!(deployment.address, FEE_CENTER_ADDRESS);
        }
        assert_eq!(registry.deployments.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn relay_submission_error_is_returned_unchanged() {
        let registry = MemoryRegistry::with_proxies();
        let chain = MockChain::failing(5566, Failure::Submit);
        let admin = Admin::new(&OneSigner, &registry, &chain);

        let err = admin
            .register_relay_chain(SERVICE_RELAY_PROXY, "near", ChainId::from(5566u64))
            .await
            .unwrap_err();

        assert!(matches!(err, McsError::Submission(ref msg) if msg == "nonce too low"));
        assert_eq!(
            chain.events(),
            [
                Event::Bound(RELAY_PROXY, OWNER),
                Event::Submitted("setChain(near,5566)".into()),
            ]
        );
    }

    #[tokio::test]
    async fn relay_revert_leaves_chain_table_untouched() {
        let registry = MemoryRegistry::with_proxies();
        let chain = MockChain::failing(5566, Failure::Revert);
        let admin = Admin::new(&OneSigner, &registry, &chain);

        let err = admin
            .register_relay_chain(SERVICE_RELAY_PROXY, "near", ChainId::from(5566u64))
            .await
            .unwrap_err();

        assert!(matches!(err, McsError::Revert(_)));
        assert!(chain.relay_chains.lock().unwrap().is_empty());
        assert!(!chain
            .events()
            .contains(&Event::Confirmed("setChain(near,5566)".into())));
    }

    #[tokio::test]
    async fn fee_center_deploy_failure_propagates() {
        let chain = MockChain::default();
        let admin = Admin::new(&OneSigner, &UnfundedRegistry, &chain);

        let err = admin.ensure_fee_center().await.unwrap_err();
        assert!(matches!(err, McsError::Submission(ref msg) if msg.starts_with("insufficient funds")));
        assert!(chain.events().is_empty());
    }
}
