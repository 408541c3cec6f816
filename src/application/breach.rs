use crate::application::dispatcher::KeyConfigurationDispatcher;
use crate::application::key_cache::{KeyMaterialSource, NetworkKeyCache};
use crate::domain::{BatchReport, BreachOutcome, ConfigureOutcome, SigningIdentity};
use crate::foundation::{Point, Result, TillerError};
use crate::infrastructure::ledger::DataSourceSelector;
use log::{error, info};
use std::sync::Arc;

/// Drives a continuity breach across a batch of points: fresh snapshot,
/// next-revision key material, boot keyfile, then a breaching configure-keys
/// submission. Points are processed sequentially and independently; one
/// failure never stops the batch.
pub struct BreachOrchestrator {
    selector: Arc<DataSourceSelector>,
    cache: Arc<NetworkKeyCache>,
    dispatcher: Arc<KeyConfigurationDispatcher>,
}

impl BreachOrchestrator {
    pub fn new(
        selector: Arc<DataSourceSelector>,
        cache: Arc<NetworkKeyCache>,
        dispatcher: Arc<KeyConfigurationDispatcher>,
    ) -> Self {
        Self { selector, cache, dispatcher }
    }

    pub async fn breach_all(&self, points: &[Point], ticket: &str, identity: &SigningIdentity) -> BatchReport<BreachOutcome> {
        let mut report = BatchReport::new();
        for &point in points {
            match self.breach_one(point, ticket, identity).await {
                Ok(outcome) => {
                    info!(
                        "breach complete point={} life={} rift={} tx_hash={}",
                        point,
                        outcome.configuration.life,
                        outcome.configuration.rift,
                        outcome.configuration.receipt.tx_hash()
                    );
                    report.record_success(outcome);
                }
                Err(err) => {
                    error!("breach failed point={} err={}", point, err);
                    report.record_failure(point, err);
                }
            }
        }
        report
    }

    async fn breach_one(&self, point: Point, ticket: &str, identity: &SigningIdentity) -> Result<BreachOutcome> {
        let info = self.selector.resolve_info(point).await?;
        // A breach keys the next revision and resets continuity to match it.
        let next_life = info.life + 1;

        let keys = self.cache.get_or_generate(point, next_life, KeyMaterialSource::Ticket(ticket))?;
        let keyfile = self.cache.keyfile(point, next_life, &keys)?;

        let configuration = match self.dispatcher.dispatch(&info, &keys, true, identity).await? {
            ConfigureOutcome::Submitted(configuration) => configuration,
            ConfigureOutcome::AlreadyConfigured => {
                return Err(TillerError::CacheConsistency {
                    point,
                    details: "breach submission short-circuited as already configured".to_string(),
                })
            }
            ConfigureOutcome::NotAuthorized { reason } => return Err(TillerError::Authorization { point, reason }),
        };

        Ok(BreachOutcome { point, info, keys, keyfile, configuration })
    }
}
