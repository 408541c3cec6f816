//! End-to-end workflows over in-memory fakes: dominion fallback, idempotent
//! key generation, configure-keys dispatch, and batch breaches.

use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tiller::application::{
    BreachOrchestrator, KeyConfigurationDispatcher, KeyMaterialSource, NetworkKeyCache, PointInfoAggregator,
    SponsorshipService, TransferOutcome,
};
use tiller::domain::{
    AuthorityCheck, ConfigureOutcome, ConfiguredKeys, KeyDeriver, NetworkKeyPair, PointInfo, Receipt, SigningIdentity,
    TicketKeyDeriver,
};
use tiller::foundation::{Dominion, EthAddress, Point, Result, TillerError};
use tiller::infrastructure::ledger::{DataSourceSelector, KeyConfiguration, Ledger, RollerClient};
use tiller::infrastructure::storage::{ArtifactStore, MemoryStore};

const TICKET: &str = "~marbud-tidsev-litsut-hidfep";

fn identity() -> SigningIdentity {
    let address = EthAddress::from_str("0x6d654ef2479f427950ca0e6c3bca2db5080c74e6").unwrap();
    SigningIdentity::from_parts(address, &"11".repeat(32)).unwrap()
}

fn snapshot(point: Point, dominion: Dominion, life: u64, rift: u64, keys: Option<ConfiguredKeys>) -> PointInfo {
    PointInfo {
        point,
        dominion,
        owner: Some(identity().address),
        spawn_proxy: None,
        management_proxy: None,
        transfer_proxy: None,
        sponsor: Some(point.parent()),
        keys,
        life,
        rift,
        spawn_count: 0,
    }
}

/// Ledger fake: a mutable map of point snapshots plus a submission log.
struct FakeLedger {
    dominion: Dominion,
    points: Mutex<HashMap<Point, PointInfo>>,
    submissions: Mutex<Vec<(Point, KeyConfiguration)>>,
    deny_reason: Option<String>,
    outage: bool,
}

impl FakeLedger {
    fn new(dominion: Dominion) -> Self {
        Self {
            dominion,
            points: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            deny_reason: None,
            outage: false,
        }
    }

    fn with_point(self, info: PointInfo) -> Self {
        self.points.lock().unwrap().insert(info.point, info);
        self
    }

    fn denying(mut self, reason: &str) -> Self {
        self.deny_reason = Some(reason.to_string());
        self
    }

    fn unreachable_backend(mut self) -> Self {
        self.outage = true;
        self
    }

    fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    fn dominion(&self) -> Dominion {
        self.dominion
    }

    async fn point_info(&self, point: Point) -> Result<PointInfo> {
        if self.outage {
            return Err(TillerError::chain("point_info", "connection timed out"));
        }
        self.points
            .lock()
            .unwrap()
            .get(&point)
            .cloned()
            .ok_or_else(|| TillerError::not_found(point, "fake ledger"))
    }

    async fn can_configure_keys(&self, _point: Point, _address: &EthAddress) -> Result<AuthorityCheck> {
        match &self.deny_reason {
            Some(reason) => Ok(AuthorityCheck::denied(reason.clone())),
            None => Ok(AuthorityCheck::allowed()),
        }
    }

    async fn configure_keys(&self, point: Point, params: &KeyConfiguration, _identity: &SigningIdentity) -> Result<Receipt> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push((point, params.clone()));
        let sequence = submissions.len() as u64;
        drop(submissions);

        let mut points = self.points.lock().unwrap();
        if let Some(info) = points.get_mut(&point) {
            if params.breach {
                info.life += 1;
                info.rift = info.life;
            }
            info.keys = Some(ConfiguredKeys {
                crypt: params.crypt_public.clone(),
                auth: params.auth_public.clone(),
                suite: params.suite,
            });
        }

        let tx_hash = format!("0x{:064x}", sequence);
        Ok(match self.dominion {
            Dominion::L1 => Receipt::L1 { tx_hash, gas_gwei: 21 },
            Dominion::L2 => Receipt::L2 { tx_hash, nonce: sequence - 1 },
        })
    }
}

struct CountingDeriver {
    calls: AtomicUsize,
}

impl CountingDeriver {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

impl KeyDeriver for CountingDeriver {
    fn derive(&self, point: Point, life: u64, ticket: &str) -> Result<NetworkKeyPair> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        TicketKeyDeriver.derive(point, life, ticket)
    }
}

struct Stack {
    l1: Arc<FakeLedger>,
    l2: Arc<FakeLedger>,
    selector: Arc<DataSourceSelector>,
    store: Arc<MemoryStore>,
    deriver: Arc<CountingDeriver>,
    cache: Arc<NetworkKeyCache>,
    dispatcher: Arc<KeyConfigurationDispatcher>,
}

fn stack(l1: FakeLedger, l2: FakeLedger, force: Option<Dominion>) -> Stack {
    let l1 = Arc::new(l1);
    let l2 = Arc::new(l2);
    let selector = Arc::new(DataSourceSelector::new(l1.clone(), l2.clone(), force));
    let store = Arc::new(MemoryStore::new());
    let deriver = Arc::new(CountingDeriver::new());
    let cache = Arc::new(NetworkKeyCache::new(store.clone(), deriver.clone()));
    let dispatcher = Arc::new(KeyConfigurationDispatcher::new(selector.clone(), store.clone()));
    Stack { l1, l2, selector, store, deriver, cache, dispatcher }
}

#[tokio::test]
async fn rollup_miss_falls_back_to_l1() {
    let zod = Point::new(0);
    let s = stack(
        FakeLedger::new(Dominion::L1).with_point(snapshot(zod, Dominion::L1, 2, 1, None)),
        FakeLedger::new(Dominion::L2),
        None,
    );

    let aggregator = PointInfoAggregator::new(s.selector.clone());
    let info = aggregator.info(zod).await.unwrap();
    assert_eq!(info.dominion, Dominion::L1);
    assert_eq!(info.life, 2);
}

#[tokio::test]
async fn rollup_outage_is_not_absence() {
    let zod = Point::new(0);
    let s = stack(
        FakeLedger::new(Dominion::L1).with_point(snapshot(zod, Dominion::L1, 2, 1, None)),
        FakeLedger::new(Dominion::L2).unreachable_backend(),
        None,
    );

    // A transport failure must propagate, never silently read L1 instead.
    let err = s.selector.resolve_info(zod).await.unwrap_err();
    assert!(matches!(err, TillerError::ChainCommunication { .. }));
}

#[tokio::test]
async fn miss_on_both_ledgers_suggests_an_override() {
    let s = stack(FakeLedger::new(Dominion::L1), FakeLedger::new(Dominion::L2), None);

    let err = s.selector.resolve_info(Point::new(7)).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("dominion override"));
}

#[tokio::test]
async fn forced_dominion_skips_the_probe() {
    let zod = Point::new(0);
    let s = stack(
        FakeLedger::new(Dominion::L1).with_point(snapshot(zod, Dominion::L1, 2, 1, None)),
        FakeLedger::new(Dominion::L2).unreachable_backend(),
        Some(Dominion::L1),
    );

    let info = s.selector.resolve_info(zod).await.unwrap();
    assert_eq!(info.dominion, Dominion::L1);
}

#[tokio::test]
async fn first_keying_of_an_unkeyed_galaxy_submits_at_revision_zero() {
    let zod = Point::new(0);
    let s = stack(
        FakeLedger::new(Dominion::L1).with_point(snapshot(zod, Dominion::L1, 0, 0, None)),
        FakeLedger::new(Dominion::L2),
        None,
    );
    let aggregator = PointInfoAggregator::new(s.selector.clone());

    let info = aggregator.info(zod).await.unwrap();
    assert!(info.keys.is_none());

    let keys = s.cache.get_or_generate(zod, info.life, KeyMaterialSource::Ticket(TICKET)).unwrap();
    let outcome = s.dispatcher.dispatch(&info, &keys, false, &identity()).await.unwrap();

    let configuration = match outcome {
        ConfigureOutcome::Submitted(configuration) => configuration,
        other => panic!("expected a submission, got {:?}", other),
    };
    assert_eq!(configuration.life, 0);
    assert_eq!(configuration.rift, 0);
    assert_eq!(configuration.receipt.dominion(), Dominion::L1);

    assert_eq!(s.l1.submission_count(), 1);
    assert_eq!(s.l2.submission_count(), 0);
    let receipt = s.store.get_receipt(zod, "networkkey-0").unwrap().unwrap();
    assert_eq!(receipt.tx_hash(), configuration.receipt.tx_hash());
}

#[tokio::test]
async fn breach_bumps_revision_and_continuity_together() {
    let marzod = Point::new(256);
    let old_keys = ConfiguredKeys { crypt: "aa".into(), auth: "bb".into(), suite: 1 };
    let s = stack(
        FakeLedger::new(Dominion::L1),
        FakeLedger::new(Dominion::L2).with_point(snapshot(marzod, Dominion::L2, 3, 2, Some(old_keys))),
        None,
    );
    let orchestrator = BreachOrchestrator::new(s.selector.clone(), s.cache.clone(), s.dispatcher.clone());

    let report = orchestrator.breach_all(&[marzod], TICKET, &identity()).await;
    assert!(report.all_succeeded());
    assert_eq!(report.successes.len(), 1);

    let outcome = &report.successes[0];
    assert_eq!(outcome.configuration.life, 4);
    assert_eq!(outcome.configuration.rift, 4);
    assert_eq!(outcome.keys.life, 4);
    assert_eq!(outcome.keyfile.life, 4);
    assert_eq!(outcome.configuration.receipt.dominion(), Dominion::L2);

    let (_, params) = &s.l2.submissions.lock().unwrap()[0];
    assert!(params.breach);
    assert_eq!(params.suite, 1);
    assert_eq!(params.crypt_public, outcome.keys.crypt.public);

    // Artifacts for the new revision are durable.
    assert!(s.store.get_network_keys(marzod, 4).unwrap().is_some());
    assert!(s.store.get_keyfile(marzod, 4).unwrap().is_some());
    assert!(s.store.get_receipt(marzod, "networkkey-4").unwrap().is_some());
}

#[tokio::test]
async fn interrupted_breach_resumes_without_rederiving() {
    let marzod = Point::new(256);
    let s = stack(
        FakeLedger::new(Dominion::L1),
        FakeLedger::new(Dominion::L2).with_point(snapshot(marzod, Dominion::L2, 3, 2, None)),
        None,
    );

    // First run died after key generation, before any submission.
    let generated = s.cache.get_or_generate(marzod, 4, KeyMaterialSource::Ticket(TICKET)).unwrap();
    assert_eq!(s.deriver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(s.l2.submission_count(), 0);

    let orchestrator = BreachOrchestrator::new(s.selector.clone(), s.cache.clone(), s.dispatcher.clone());
    let report = orchestrator.breach_all(&[marzod], TICKET, &identity()).await;

    assert!(report.all_succeeded());
    // The rerun reused the cached material and still submitted.
    assert_eq!(s.deriver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(s.l2.submission_count(), 1);
    assert_eq!(report.successes[0].keys, generated);
}

#[tokio::test]
async fn matching_keys_without_breach_submit_nothing() {
    let marzod = Point::new(256);
    let target = TicketKeyDeriver.derive(marzod, 3, TICKET).unwrap();
    // On-chain copy differs only by prefix and case; still a match.
    let configured = ConfiguredKeys {
        crypt: format!("0x{}", target.crypt.public.to_uppercase()),
        auth: target.auth.public.clone(),
        suite: 1,
    };
    let s = stack(
        FakeLedger::new(Dominion::L1),
        FakeLedger::new(Dominion::L2).with_point(snapshot(marzod, Dominion::L2, 3, 2, Some(configured))),
        None,
    );

    let info = s.selector.resolve_info(marzod).await.unwrap();
    let keys = s.cache.get_or_generate(marzod, 3, KeyMaterialSource::Ticket(TICKET)).unwrap();
    let outcome = s.dispatcher.dispatch(&info, &keys, false, &identity()).await.unwrap();

    assert!(matches!(outcome, ConfigureOutcome::AlreadyConfigured));
    assert_eq!(s.l2.submission_count(), 0);
    assert!(s.store.get_receipt(marzod, "networkkey-3").unwrap().is_none());
}

#[tokio::test]
async fn unauthorized_address_makes_no_submission() {
    let marzod = Point::new(256);
    let s = stack(
        FakeLedger::new(Dominion::L1),
        FakeLedger::new(Dominion::L2)
            .with_point(snapshot(marzod, Dominion::L2, 3, 2, None))
            .denying("address holds no proxy for this point"),
        None,
    );

    let info = s.selector.resolve_info(marzod).await.unwrap();
    let keys = s.cache.get_or_generate(marzod, 3, KeyMaterialSource::Ticket(TICKET)).unwrap();
    let outcome = s.dispatcher.dispatch(&info, &keys, false, &identity()).await.unwrap();

    match outcome {
        ConfigureOutcome::NotAuthorized { reason } => assert!(reason.contains("no proxy")),
        other => panic!("expected denial, got {:?}", other),
    }
    assert_eq!(s.l2.submission_count(), 0);

    // Through the breach path the denial surfaces as a per-point failure.
    let orchestrator = BreachOrchestrator::new(s.selector.clone(), s.cache.clone(), s.dispatcher.clone());
    let report = orchestrator.breach_all(&[marzod], TICKET, &identity()).await;
    assert!(!report.all_succeeded());
    assert!(matches!(report.failures[0].error, TillerError::Authorization { .. }));
}

#[tokio::test]
async fn batch_continues_past_a_failing_point() {
    let marzod = Point::new(256);
    let unknown = Point::new(512);
    let s = stack(
        FakeLedger::new(Dominion::L1),
        FakeLedger::new(Dominion::L2).with_point(snapshot(marzod, Dominion::L2, 1, 1, None)),
        None,
    );
    let orchestrator = BreachOrchestrator::new(s.selector.clone(), s.cache.clone(), s.dispatcher.clone());

    let report = orchestrator.breach_all(&[unknown, marzod], TICKET, &identity()).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].point, unknown);
    assert!(report.failures[0].error.is_not_found());
    assert_eq!(report.successes.len(), 1);
    assert_eq!(report.successes[0].point, marzod);
    assert_eq!(report.successes[0].configuration.life, 2);
}

fn sponsorship(s: &Stack) -> SponsorshipService {
    // Unreachable endpoint: these tests only exercise paths that stop before
    // any roller round trip.
    let roller = Arc::new(RollerClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(1)).unwrap());
    SponsorshipService::new(s.selector.clone(), roller, s.store.clone())
}

#[tokio::test]
async fn sponsorship_operations_reject_l1_points() {
    let zod = Point::new(0);
    let s = stack(
        FakeLedger::new(Dominion::L1).with_point(snapshot(zod, Dominion::L1, 1, 0, None)),
        FakeLedger::new(Dominion::L2),
        None,
    );

    let err = sponsorship(&s).escape(zod, Point::new(1), &identity()).await.unwrap_err();
    assert!(err.to_string().contains("require L2"));
}

#[tokio::test]
async fn transfer_to_current_owner_submits_nothing() {
    let marzod = Point::new(256);
    let s = stack(
        FakeLedger::new(Dominion::L1),
        FakeLedger::new(Dominion::L2).with_point(snapshot(marzod, Dominion::L2, 1, 1, None)),
        None,
    );

    let owner = identity().address;
    let outcome = sponsorship(&s).transfer(marzod, &owner, false, &identity()).await.unwrap();
    assert!(matches!(outcome, TransferOutcome::AlreadyOwner));
    assert!(s.store.get_receipt(marzod, "transfer").unwrap().is_none());
}

#[tokio::test]
async fn aggregator_batch_reports_per_point() {
    let zod = Point::new(0);
    let unknown = Point::new(512);
    let s = stack(
        FakeLedger::new(Dominion::L1).with_point(snapshot(zod, Dominion::L1, 1, 0, None)),
        FakeLedger::new(Dominion::L2),
        None,
    );
    let aggregator = PointInfoAggregator::new(s.selector.clone());

    let report = aggregator.info_many(&[zod, unknown]).await;
    assert_eq!(report.successes.len(), 1);
    assert_eq!(report.successes[0].point, zod);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.is_not_found());
}
