use crate::application::{
    BreachOrchestrator, KeyConfigurationDispatcher, NetworkKeyCache, PointInfoAggregator, SponsorshipService,
};
use crate::config::AppConfig;
use crate::domain::KeyDeriver;
use crate::foundation::Result;
use crate::infrastructure::ledger::{
    DataSourceSelector, GasOracle, HttpGasOracle, L1Ledger, L1Rpc, L2Ledger, Ledger, RollerClient,
};
use crate::infrastructure::storage::FsStore;
use std::sync::Arc;
use std::time::Duration;

/// Fully wired orchestration stack. The L1 transaction transport and the
/// ticket-to-seed scheme are supplied by the caller; everything else is
/// assembled from configuration.
pub struct Orchestrator {
    pub aggregator: PointInfoAggregator,
    pub breach: BreachOrchestrator,
    pub sponsorship: SponsorshipService,
    pub cache: Arc<NetworkKeyCache>,
    pub dispatcher: Arc<KeyConfigurationDispatcher>,
    pub selector: Arc<DataSourceSelector>,
}

pub fn build(config: &AppConfig, l1_rpc: Arc<dyn L1Rpc>, deriver: Arc<dyn KeyDeriver>) -> Result<Orchestrator> {
    let timeout = Duration::from_secs(config.roller.timeout_secs);

    let oracle: Option<Arc<dyn GasOracle>> = match &config.l1.gas_oracle_url {
        Some(url) => Some(Arc::new(HttpGasOracle::new(url.clone(), timeout)?)),
        None => None,
    };
    let l1: Arc<dyn Ledger> = Arc::new(L1Ledger::new(l1_rpc, config.l1.gas_gwei, oracle));

    let roller = Arc::new(RollerClient::new(config.roller.url.clone(), timeout)?);
    let l2: Arc<dyn Ledger> = Arc::new(L2Ledger::new(roller.clone()));

    let selector = Arc::new(DataSourceSelector::new(l1, l2, config.force_dominion));
    let store = Arc::new(FsStore::new(&config.work_dir)?);

    let cache = Arc::new(NetworkKeyCache::new(store.clone(), deriver));
    let dispatcher = Arc::new(KeyConfigurationDispatcher::new(selector.clone(), store.clone()));

    Ok(Orchestrator {
        aggregator: PointInfoAggregator::new(selector.clone()),
        breach: BreachOrchestrator::new(selector.clone(), cache.clone(), dispatcher.clone()),
        sponsorship: SponsorshipService::new(selector.clone(), roller, store),
        cache,
        dispatcher,
        selector,
    })
}
