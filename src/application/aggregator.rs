use crate::domain::{BatchReport, PointInfo};
use crate::foundation::{Point, Result};
use crate::infrastructure::ledger::DataSourceSelector;
use log::warn;
use std::sync::Arc;

/// Produces canonical point snapshots, one ledger round trip per query. No
/// caching: every call reflects the chain state at the moment it was made.
pub struct PointInfoAggregator {
    selector: Arc<DataSourceSelector>,
}

impl PointInfoAggregator {
    pub fn new(selector: Arc<DataSourceSelector>) -> Self {
        Self { selector }
    }

    pub async fn info(&self, point: Point) -> Result<PointInfo> {
        self.selector.resolve_info(point).await
    }

    /// Snapshots for a batch of points. One failing point is recorded and
    /// the rest of the batch still runs.
    pub async fn info_many(&self, points: &[Point]) -> BatchReport<PointInfo> {
        let mut report = BatchReport::new();
        for &point in points {
            match self.info(point).await {
                Ok(info) => report.record_success(info),
                Err(err) => {
                    warn!("point info failed point={} err={}", point, err);
                    report.record_failure(point, err);
                }
            }
        }
        report
    }
}
