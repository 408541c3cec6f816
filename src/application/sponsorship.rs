use crate::domain::{PointInfo, Receipt, SigningIdentity};
use crate::foundation::{Dominion, EthAddress, Point, Result, TillerError};
use crate::infrastructure::ledger::l2::SponsoredPoints;
use crate::infrastructure::ledger::{DataSourceSelector, RollerClient};
use crate::infrastructure::storage::ArtifactStore;
use log::info;
use std::sync::Arc;

/// Rollup-side sponsorship and ownership mutations: escape, adopt, transfer.
/// All of them require the point to live on L2; points still on the
/// authoritative chain are rejected before any submission is attempted.
pub struct SponsorshipService {
    selector: Arc<DataSourceSelector>,
    roller: Arc<RollerClient>,
    store: Arc<dyn ArtifactStore>,
}

impl SponsorshipService {
    pub fn new(selector: Arc<DataSourceSelector>, roller: Arc<RollerClient>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { selector, roller, store }
    }

    pub async fn sponsored(&self, point: Point) -> Result<SponsoredPoints> {
        self.roller.get_sponsored(point).await
    }

    pub async fn spawned(&self, point: Point) -> Result<Vec<Point>> {
        self.roller.get_spawned(point).await
    }

    async fn require_l2(&self, point: Point) -> Result<PointInfo> {
        let info = self.selector.resolve_info(point).await?;
        if info.dominion != Dominion::L2 {
            return Err(TillerError::Message(format!(
                "{} lives on {}; rollup sponsorship operations require L2 dominion",
                point, info.dominion
            )));
        }
        Ok(info)
    }

    /// Petitions `sponsor` to become the new sponsor of `point`.
    pub async fn escape(&self, point: Point, sponsor: Point, identity: &SigningIdentity) -> Result<Receipt> {
        self.require_l2(point).await?;
        if !self.roller.can_escape(point, &identity.address).await? {
            return Err(TillerError::Authorization { point, reason: "address may not escape this point".to_string() });
        }
        let receipt = self.roller.escape(point, sponsor, identity).await?;
        info!("escape submitted point={} sponsor={} tx_hash={}", point, sponsor, receipt.tx_hash());
        self.store.put_receipt_if_absent(point, &format!("escape-{}", stem(sponsor)), &receipt)?;
        Ok(receipt)
    }

    /// Accepts a pending escape of `adoptee` as `sponsor`.
    pub async fn adopt(&self, sponsor: Point, adoptee: Point, identity: &SigningIdentity) -> Result<Receipt> {
        self.require_l2(sponsor).await?;
        if !self.roller.can_adopt(adoptee, &identity.address).await? {
            return Err(TillerError::Authorization { point: sponsor, reason: "address may not adopt this point".to_string() });
        }
        let receipt = self.roller.adopt(sponsor, adoptee, identity).await?;
        info!("adopt submitted sponsor={} adoptee={} tx_hash={}", sponsor, adoptee, receipt.tx_hash());
        self.store.put_receipt_if_absent(sponsor, &format!("adopt-{}", stem(adoptee)), &receipt)?;
        Ok(receipt)
    }

    /// Transfers ownership of `point` to `target`, optionally resetting its
    /// keys and proxies. Transferring to the current owner is a no-op.
    pub async fn transfer(
        &self,
        point: Point,
        target: &EthAddress,
        reset: bool,
        identity: &SigningIdentity,
    ) -> Result<TransferOutcome> {
        let info = self.require_l2(point).await?;
        if info.owner.as_ref() == Some(target) {
            info!("transfer skipped, target already owns point={} target={}", point, target);
            return Ok(TransferOutcome::AlreadyOwner);
        }
        if !self.roller.can_transfer(point, &identity.address).await? {
            return Err(TillerError::Authorization { point, reason: "address may not transfer this point".to_string() });
        }
        let receipt = self.roller.transfer(point, target, reset, identity).await?;
        info!("transfer submitted point={} target={} reset={} tx_hash={}", point, target, reset, receipt.tx_hash());
        self.store.put_receipt_if_absent(point, "transfer", &receipt)?;
        Ok(TransferOutcome::Submitted(receipt))
    }
}

/// Result of a transfer request.
#[derive(Clone, Debug)]
pub enum TransferOutcome {
    Submitted(Receipt),
    /// The target address already owns the point; nothing was submitted.
    AlreadyOwner,
}

fn stem(point: Point) -> String {
    point.name().trim_start_matches('~').to_string()
}
