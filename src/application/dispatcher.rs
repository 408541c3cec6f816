use crate::domain::{ConfigureOutcome, NetworkKeyPair, PointInfo, SigningIdentity, SubmittedConfiguration};
use crate::foundation::{Result, CRYPTO_SUITE_VERSION};
use crate::infrastructure::ledger::{DataSourceSelector, KeyConfiguration};
use crate::infrastructure::storage::ArtifactStore;
use log::{info, warn};
use std::sync::Arc;

/// Routes a configure-keys mutation to the ledger that holds the point,
/// after checking authority and skipping work the chain already reflects.
pub struct KeyConfigurationDispatcher {
    selector: Arc<DataSourceSelector>,
    store: Arc<dyn ArtifactStore>,
}

impl KeyConfigurationDispatcher {
    pub fn new(selector: Arc<DataSourceSelector>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { selector, store }
    }

    /// Submits `keys` for the point described by `info`. The snapshot must be
    /// fresh; the dominion recorded in it decides where the mutation goes.
    pub async fn dispatch(
        &self,
        info: &PointInfo,
        keys: &NetworkKeyPair,
        breach: bool,
        identity: &SigningIdentity,
    ) -> Result<ConfigureOutcome> {
        let point = info.point;
        let ledger = self.selector.ledger_for(info.dominion);

        let authority = ledger.can_configure_keys(point, &identity.address).await?;
        if !authority.allowed {
            let reason = authority.reason.unwrap_or_else(|| "address may not configure keys".to_string());
            warn!("configureKeys not authorized point={} address={} reason={}", point, identity.address, reason);
            return Ok(ConfigureOutcome::NotAuthorized { reason });
        }

        // If the chain already holds exactly these public keys and no breach
        // was asked for, submitting again would be a paid no-op.
        if !breach {
            if let Some(current) = &info.keys {
                if current.matches(&keys.crypt.public, &keys.auth.public) {
                    info!("keys already configured point={} life={}", point, info.life);
                    return Ok(ConfigureOutcome::AlreadyConfigured);
                }
            }
        }

        let (life, rift) = if breach { (info.life + 1, info.life + 1) } else { (info.life, info.rift) };
        let params = KeyConfiguration {
            crypt_public: keys.crypt.public.clone(),
            auth_public: keys.auth.public.clone(),
            suite: CRYPTO_SUITE_VERSION,
            breach,
        };

        let receipt = ledger.configure_keys(point, &params, identity).await?;
        info!(
            "configureKeys submitted point={} dominion={} life={} breach={} tx_hash={}",
            point,
            receipt.dominion(),
            life,
            breach,
            receipt.tx_hash()
        );

        let operation = format!("networkkey-{}", life);
        self.store.put_receipt_if_absent(point, &operation, &receipt)?;

        Ok(ConfigureOutcome::Submitted(SubmittedConfiguration { receipt, life, rift }))
    }
}
