//! Behavioural tests for the deployment orchestrator, run against an
//! in-memory network and verifier

use std::{
    fmt, fs,
    sync::{
        atomic::{AtomicU8, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use eyre::Result;
use scripts::{
    client::DeployBackend,
    deployments::DeploymentStore,
    errors::ScriptError,
    orchestrator::{verify_all, Orchestrator},
    types::{DeploymentRecord, DeploymentTarget, IdentityContract, SignerInfo},
    verify::ContractVerifier,
};
use tempfile::{tempdir, TempDir};
use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer, Registry,
};

/// The deployer of the worked example
const DEPLOYER_BYTE: u8 = 0xaa;
/// The chain id of a local Hardhat node
const HARDHAT_CHAIN_ID: u64 = 1337;

// ------------
// | Fixtures |
// ------------

/// An in-memory network that hands out sequential addresses
struct MockNetwork {
    /// The deployer, `None` if no credential is configured
    signer: Option<SignerInfo>,
    /// The reported chain id
    chain_id: u64,
    /// The contract whose deployment fails, if any
    fail_on: Option<IdentityContract>,
    /// The last address byte handed out, shared across runs
    next_address: Arc<AtomicU8>,
    /// Every deployment attempted, in order
    attempts: Arc<Mutex<Vec<IdentityContract>>>,
}

impl MockNetwork {
    fn new(chain_id: u64) -> Self {
        Self {
            signer: Some(SignerInfo {
                address: Address::repeat_byte(DEPLOYER_BYTE),
                balance: U256::from(10u64).pow(U256::from(18u64)),
            }),
            chain_id,
            fail_on: None,
            next_address: Arc::new(AtomicU8::new(0)),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing_on(mut self, contract: IdentityContract) -> Self {
        self.fail_on = Some(contract);
        self
    }

    fn without_signer(mut self) -> Self {
        self.signer = None;
        self
    }

    /// A second handle on the same network, for a second run
    fn handle(&self) -> Self {
        Self {
            signer: self.signer,
            chain_id: self.chain_id,
            fail_on: self.fail_on,
            next_address: self.next_address.clone(),
            attempts: self.attempts.clone(),
        }
    }

    fn attempts(&self) -> Vec<IdentityContract> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeployBackend for MockNetwork {
    async fn signer(&self) -> Result<SignerInfo, ScriptError> {
        self.signer.ok_or_else(|| ScriptError::SignerUnavailable("hardhat".to_string()))
    }

    async fn chain_id(&self) -> Result<u64, ScriptError> {
        Ok(self.chain_id)
    }

    async fn deploy(&self, target: &DeploymentTarget) -> Result<Address, ScriptError> {
        self.attempts.lock().unwrap().push(target.contract);
        if self.fail_on == Some(target.contract) {
            return Err(ScriptError::DeploymentFailed {
                contract: target.contract,
                cause: "execution reverted".to_string(),
            });
        }

        let byte = self.next_address.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Address::repeat_byte(byte))
    }
}

/// A verifier counting its calls, failing for one contract if asked to
#[derive(Clone, Default)]
struct CountingVerifier {
    calls: Arc<AtomicUsize>,
    fail_on: Option<IdentityContract>,
}

impl CountingVerifier {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractVerifier for CountingVerifier {
    async fn verify(
        &self,
        _chain_id: u64,
        target: &DeploymentTarget,
        _address: Address,
    ) -> Result<(), ScriptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(target.contract) {
            return Err(ScriptError::VerificationFailed {
                contract: target.contract,
                cause: "Fail - Unable to verify".to_string(),
            });
        }

        Ok(())
    }
}

/// Collects the messages of every event emitted while installed
#[derive(Clone, Default)]
struct CollectingLayer {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingLayer {
    /// Route the current thread's events into this layer until the guard drops
    fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(Registry::default().with(self.clone()))
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for CollectingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.messages.lock().unwrap().push(visitor.0);
    }
}

/// Extracts the formatted message of an event
#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

fn orchestrator(network: MockNetwork, dir: &TempDir) -> Orchestrator<MockNetwork> {
    Orchestrator::new("hardhat", network, DeploymentStore::new(dir.path()))
}

fn read_record(dir: &TempDir) -> Result<DeploymentRecord> {
    let contents = fs::read_to_string(dir.path().join("hardhat.json"))?;
    Ok(serde_json::from_str(&contents)?)
}

// ---------
// | Tests |
// ---------

#[tokio::test]
async fn test_hardhat_deployment_record() -> Result<()> {
    let dir = tempdir()?;
    let record = orchestrator(MockNetwork::new(HARDHAT_CHAIN_ID), &dir).run().await?;

    let persisted = read_record(&dir)?;
    assert_eq!(persisted, record);
    assert_eq!(persisted.network, "hardhat");
    assert_eq!(persisted.chain_id, 1337);
    assert_eq!(persisted.deployer, Address::repeat_byte(DEPLOYER_BYTE));
    assert_eq!(
        persisted.address_of(IdentityContract::IdentityRegistry),
        Some(Address::repeat_byte(1))
    );
    assert_eq!(
        persisted.address_of(IdentityContract::CredentialVerifier),
        Some(Address::repeat_byte(2))
    );
    assert_eq!(
        persisted.address_of(IdentityContract::ReputationLeaderboard),
        Some(Address::repeat_byte(3))
    );

    Ok(())
}

#[tokio::test]
async fn test_record_holds_exactly_the_fixed_targets() -> Result<()> {
    let dir = tempdir()?;
    orchestrator(MockNetwork::new(31337), &dir).run().await?;

    let persisted = read_record(&dir)?;
    let names: Vec<_> = persisted.contracts.keys().cloned().collect();
    let mut expected: Vec<_> =
        IdentityContract::DEPLOY_ORDER.iter().map(|c| c.name().to_string()).collect();
    expected.sort();
    assert_eq!(names, expected);

    // The raw JSON uses the documented field names
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(
        dir.path().join("hardhat.json"),
    )?)?;
    for key in ["network", "chainId", "deployer", "contracts", "deployedAt"] {
        assert!(raw.get(key).is_some(), "missing {key}");
    }

    Ok(())
}

#[tokio::test]
async fn test_contracts_deploy_in_declared_order() -> Result<()> {
    let dir = tempdir()?;
    let network = MockNetwork::new(HARDHAT_CHAIN_ID);
    let attempts = network.handle();

    orchestrator(network, &dir).run().await?;

    assert_eq!(attempts.attempts(), IdentityContract::DEPLOY_ORDER.to_vec());
    Ok(())
}

#[tokio::test]
async fn test_failed_deploy_aborts_without_record() -> Result<()> {
    let dir = tempdir()?;
    let network =
        MockNetwork::new(HARDHAT_CHAIN_ID).failing_on(IdentityContract::CredentialVerifier);
    let observer = network.handle();
    let verifier = CountingVerifier::default();

    let res = orchestrator(network, &dir)
        .with_verifier(Some(Box::new(verifier.clone())))
        .run()
        .await;

    assert!(matches!(
        res,
        Err(ScriptError::DeploymentFailed { contract: IdentityContract::CredentialVerifier, .. })
    ));
    // The third contract is never attempted, nothing is verified or written
    assert_eq!(
        observer.attempts(),
        vec![IdentityContract::IdentityRegistry, IdentityContract::CredentialVerifier]
    );
    assert_eq!(verifier.calls(), 0);
    assert!(!dir.path().join("hardhat.json").exists());

    Ok(())
}

#[tokio::test]
async fn test_failed_deploy_leaves_prior_record_untouched() -> Result<()> {
    let dir = tempdir()?;
    let network = MockNetwork::new(HARDHAT_CHAIN_ID);
    orchestrator(network.handle(), &dir).run().await?;
    let before = fs::read(dir.path().join("hardhat.json"))?;

    let failing = network.handle().failing_on(IdentityContract::CredentialVerifier);
    let res = orchestrator(failing, &dir).run().await;

    assert!(res.is_err());
    assert_eq!(fs::read(dir.path().join("hardhat.json"))?, before);
    Ok(())
}

#[tokio::test]
async fn test_verification_failures_are_not_fatal() -> Result<()> {
    let dir = tempdir()?;
    let verifier = CountingVerifier {
        fail_on: Some(IdentityContract::IdentityRegistry),
        ..Default::default()
    };

    let with_failures = orchestrator(MockNetwork::new(HARDHAT_CHAIN_ID), &dir)
        .with_verifier(Some(Box::new(verifier.clone())))
        .run()
        .await?;

    // Every contract is attempted despite the first one failing
    assert_eq!(verifier.calls(), IdentityContract::DEPLOY_ORDER.len());

    // The record looks the same as one produced without verification
    let other_dir = tempdir()?;
    let without_verifier =
        orchestrator(MockNetwork::new(HARDHAT_CHAIN_ID), &other_dir).run().await?;
    assert_eq!(with_failures.contracts, without_verifier.contracts);

    let raw = fs::read_to_string(dir.path().join("hardhat.json"))?.to_lowercase();
    assert!(!raw.contains("verified") && !raw.contains("verification"));
    Ok(())
}

#[tokio::test]
async fn test_no_verification_without_credential() -> Result<()> {
    let dir = tempdir()?;
    let logs = CollectingLayer::default();
    let _guard = logs.install();

    let record =
        orchestrator(MockNetwork::new(HARDHAT_CHAIN_ID), &dir).with_verifier(None).run().await?;

    assert_eq!(read_record(&dir)?, record);
    let messages = logs.messages();
    assert!(messages.iter().any(|m| m.starts_with("deploying")));
    for message in messages.iter().map(|m| m.to_lowercase()) {
        assert!(!message.contains("verifying") && !message.contains("verified"), "{message}");
    }
    Ok(())
}

#[tokio::test]
async fn test_verification_is_logged_when_configured() -> Result<()> {
    let dir = tempdir()?;
    let logs = CollectingLayer::default();
    let _guard = logs.install();

    orchestrator(MockNetwork::new(HARDHAT_CHAIN_ID), &dir)
        .with_verifier(Some(Box::new(CountingVerifier::default())))
        .run()
        .await?;

    let verifying = logs.messages().iter().filter(|m| m.starts_with("verifying")).count();
    assert_eq!(verifying, IdentityContract::DEPLOY_ORDER.len());
    Ok(())
}

#[tokio::test]
async fn test_verification_outcomes_cover_every_contract() -> Result<()> {
    let dir = tempdir()?;
    let verifier = CountingVerifier {
        fail_on: Some(IdentityContract::CredentialVerifier),
        ..Default::default()
    };
    let orchestrator = orchestrator(MockNetwork::new(HARDHAT_CHAIN_ID), &dir)
        .with_verifier(Some(Box::new(verifier.clone())));

    let deployed = orchestrator.deploy_all().await?;
    let outcomes = orchestrator.verify_deployed(HARDHAT_CHAIN_ID, &deployed).await;

    let verified: Vec<_> = outcomes.iter().map(|o| (o.contract, o.is_verified())).collect();
    assert_eq!(
        verified,
        vec![
            (IdentityContract::IdentityRegistry, true),
            (IdentityContract::CredentialVerifier, false),
            (IdentityContract::ReputationLeaderboard, true),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_verify_all_continues_past_failures() -> Result<()> {
    let verifier = CountingVerifier {
        fail_on: Some(IdentityContract::IdentityRegistry),
        ..Default::default()
    };
    let deployed: Vec<_> = IdentityContract::DEPLOY_ORDER
        .into_iter()
        .map(|c| (DeploymentTarget::new(c), Address::repeat_byte(0x11)))
        .collect();

    let outcomes = verify_all(&verifier, HARDHAT_CHAIN_ID, &deployed).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes.iter().filter(|o| o.is_verified()).count(), 2);
    assert_eq!(verifier.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_rerun_replaces_record() -> Result<()> {
    let dir = tempdir()?;
    let network = MockNetwork::new(HARDHAT_CHAIN_ID);

    let first = orchestrator(network.handle(), &dir).run().await?;
    let second = orchestrator(network.handle(), &dir).run().await?;

    // Fresh instances every run
    for contract in IdentityContract::DEPLOY_ORDER {
        assert_ne!(first.address_of(contract), second.address_of(contract));
    }

    // Only the second run's record survives
    assert_eq!(read_record(&dir)?, second);
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_signer_unavailable_aborts_before_deploying() -> Result<()> {
    let dir = tempdir()?;
    let network = MockNetwork::new(HARDHAT_CHAIN_ID).without_signer();
    let observer = network.handle();

    let res = orchestrator(network, &dir).run().await;

    assert!(matches!(res, Err(ScriptError::SignerUnavailable(_))));
    assert!(observer.attempts().is_empty());
    assert!(!dir.path().join("hardhat.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_chain_id_mismatch_aborts_before_deploying() -> Result<()> {
    let dir = tempdir()?;
    let network = MockNetwork::new(31337);
    let observer = network.handle();

    let res = orchestrator(network, &dir).with_expected_chain_id(Some(1337)).run().await;

    assert!(matches!(res, Err(ScriptError::ChainIdMismatch { expected: 1337, actual: 31337 })));
    assert!(observer.attempts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_persistence_failure_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let blocker = dir.path().join("deployments");
    fs::write(&blocker, "")?;
    let network = MockNetwork::new(HARDHAT_CHAIN_ID);
    let observer = network.handle();

    let res = Orchestrator::new("hardhat", network, DeploymentStore::new(&blocker)).run().await;

    assert!(matches!(res, Err(ScriptError::PersistenceFailed(_))));
    // Deployments already happened and are not rolled back
    assert_eq!(observer.attempts().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_invalid_network_name_aborts_before_deploying() -> Result<()> {
    let dir = tempdir()?;
    let network = MockNetwork::new(HARDHAT_CHAIN_ID);
    let observer = network.handle();

    let res = Orchestrator::new("../escape", network, DeploymentStore::new(dir.path())).run().await;

    assert!(matches!(res, Err(ScriptError::InvalidNetworkName(_))));
    assert!(observer.attempts().is_empty());
    Ok(())
}
