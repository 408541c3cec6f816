//! Backend abstraction over the two ledgers. Dominion dispatch happens once,
//! through this trait, instead of string comparisons at every call site.

pub mod l1;
pub mod l2;
pub mod selector;

use crate::domain::{AuthorityCheck, PointInfo, Receipt, SigningIdentity};
use crate::foundation::{Dominion, EthAddress, Point, Result};
use async_trait::async_trait;

/// Wire parameters of a configure-keys mutation, identical in meaning across
/// both ledgers even though transport differs.
#[derive(Clone, Debug)]
pub struct KeyConfiguration {
    pub crypt_public: String,
    pub auth_public: String,
    pub suite: u32,
    pub breach: bool,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    fn dominion(&self) -> Dominion;

    /// Fresh canonical snapshot; implementations never cache.
    async fn point_info(&self, point: Point) -> Result<PointInfo>;

    async fn can_configure_keys(&self, point: Point, address: &EthAddress) -> Result<AuthorityCheck>;

    async fn configure_keys(&self, point: Point, params: &KeyConfiguration, identity: &SigningIdentity) -> Result<Receipt>;
}

pub use l1::{GasOracle, HttpGasOracle, L1Ledger, L1Rpc};
pub use l2::{L2Ledger, RollerClient};
pub use selector::DataSourceSelector;
