use crate::domain::PointInfo;
use crate::foundation::{Dominion, Point, Result, TillerError};
use crate::infrastructure::ledger::Ledger;
use log::{debug, warn};
use std::sync::Arc;

/// Decides, per point, which ledger holds authority. The rollup is probed
/// first; a structured not-found answer means the point never moved to L2
/// and the authoritative chain is consulted instead. Transport failures are
/// never treated as absence.
pub struct DataSourceSelector {
    l1: Arc<dyn Ledger>,
    l2: Arc<dyn Ledger>,
    force: Option<Dominion>,
}

impl DataSourceSelector {
    pub fn new(l1: Arc<dyn Ledger>, l2: Arc<dyn Ledger>, force: Option<Dominion>) -> Self {
        Self { l1, l2, force }
    }

    /// Fresh canonical snapshot from whichever ledger holds the point.
    pub async fn resolve_info(&self, point: Point) -> Result<PointInfo> {
        if let Some(dominion) = self.force {
            debug!("dominion forced point={} dominion={}", point, dominion);
            return self.ledger_for(dominion).point_info(point).await;
        }

        match self.l2.point_info(point).await {
            Ok(info) => Ok(info),
            Err(err) if err.is_not_found() => {
                debug!("point unknown to rollup, falling back to L1 point={}", point);
                self.l1.point_info(point).await.map_err(|err| {
                    if err.is_not_found() {
                        TillerError::not_found(point, "point on either ledger (retry with an explicit dominion override)")
                    } else {
                        err
                    }
                })
            }
            Err(err) => {
                warn!("rollup probe failed point={} err={}", point, err);
                Err(err)
            }
        }
    }

    /// Direct routing when the dominion is already known, e.g. from a fresh
    /// snapshot. Mutations go through this so a point read on L1 but marked
    /// with an L2 dominion is submitted to the rollup.
    pub fn ledger_for(&self, dominion: Dominion) -> Arc<dyn Ledger> {
        match dominion {
            Dominion::L1 => self.l1.clone(),
            Dominion::L2 => self.l2.clone(),
        }
    }
}
