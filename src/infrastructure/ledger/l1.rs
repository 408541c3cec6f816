use crate::domain::{AuthorityCheck, ConfiguredKeys, PointInfo, Receipt, SigningIdentity};
use crate::foundation::{Dominion, EthAddress, Point, Result, TillerError};
use crate::infrastructure::ledger::{KeyConfiguration, Ledger};
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// The escrow address a point's spawn proxy is parked at while it lives on
/// the rollup. An L1 read showing this proxy means the point's dominion is
/// actually L2.
const L2_DEPOSIT_ADDRESS: &str = "0x1111111111111111111111111111111111111111";

/// Read/write seam to the authoritative chain. Contract encoding,
/// transaction signing and broadcast live behind this trait; the
/// orchestrator only sees typed per-point reads and a submitted receipt.
#[async_trait]
pub trait L1Rpc: Send + Sync {
    async fn owner_of(&self, point: Point) -> Result<EthAddress>;
    async fn sponsor_of(&self, point: Point) -> Result<Point>;
    async fn has_sponsor(&self, point: Point) -> Result<bool>;
    async fn spawn_proxy_of(&self, point: Point) -> Result<EthAddress>;
    async fn management_proxy_of(&self, point: Point) -> Result<EthAddress>;
    async fn transfer_proxy_of(&self, point: Point) -> Result<EthAddress>;
    async fn key_revision_of(&self, point: Point) -> Result<u64>;
    async fn continuity_of(&self, point: Point) -> Result<u64>;
    async fn spawn_count_of(&self, point: Point) -> Result<u64>;
    async fn configured_keys_of(&self, point: Point) -> Result<Option<ConfiguredKeys>>;
    async fn can_configure_keys(&self, point: Point, address: &EthAddress) -> Result<AuthorityCheck>;

    /// Signs and broadcasts a configure-keys transaction, awaiting its
    /// receipt. Returns the transaction hash.
    async fn configure_keys(
        &self,
        point: Point,
        params: &KeyConfiguration,
        gas_gwei: u64,
        identity: &SigningIdentity,
    ) -> Result<String>;
}

/// Live gas price lookup, consulted only when no explicit override is
/// configured.
#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn gas_gwei(&self) -> Result<u64>;
}

#[derive(Deserialize)]
struct GasQuote {
    fast: f64,
}

/// Fee oracle over HTTP; expects a JSON body with a `fast` gwei field.
pub struct HttpGasOracle {
    client: reqwest::Client,
    url: String,
}

impl HttpGasOracle {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TillerError::chain("build gas oracle client", err.to_string()))?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl GasOracle for HttpGasOracle {
    async fn gas_gwei(&self) -> Result<u64> {
        let quote: GasQuote = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| TillerError::chain_with_source("fetch gas price", self.url.clone(), err))?
            .error_for_status()
            .map_err(|err| TillerError::chain_with_source("fetch gas price", self.url.clone(), err))?
            .json()
            .await
            .map_err(|err| TillerError::chain_with_source("decode gas price", self.url.clone(), err))?;
        Ok(quote.fast.ceil() as u64)
    }
}

/// The authoritative-chain backend. L1 exposes no aggregate view, so a
/// snapshot is assembled from independent reads, awaited one at a time.
pub struct L1Ledger {
    rpc: Arc<dyn L1Rpc>,
    gas_override: Option<u64>,
    oracle: Option<Arc<dyn GasOracle>>,
}

impl L1Ledger {
    pub fn new(rpc: Arc<dyn L1Rpc>, gas_override: Option<u64>, oracle: Option<Arc<dyn GasOracle>>) -> Self {
        Self { rpc, gas_override, oracle }
    }

    async fn resolve_gas_gwei(&self) -> Result<u64> {
        if let Some(gwei) = self.gas_override {
            return Ok(gwei);
        }
        match &self.oracle {
            Some(oracle) => oracle.gas_gwei().await,
            None => Err(TillerError::ConfigError("no gas price configured and no fee oracle available".to_string())),
        }
    }
}

#[async_trait]
impl Ledger for L1Ledger {
    fn dominion(&self) -> Dominion {
        Dominion::L1
    }

    async fn point_info(&self, point: Point) -> Result<PointInfo> {
        let owner = self.rpc.owner_of(point).await?.sanitized();
        let has_sponsor = self.rpc.has_sponsor(point).await?;
        let sponsor = if has_sponsor { Some(self.rpc.sponsor_of(point).await?) } else { None };
        let spawn_proxy = self.rpc.spawn_proxy_of(point).await?;
        let management_proxy = self.rpc.management_proxy_of(point).await?.sanitized();
        let transfer_proxy = self.rpc.transfer_proxy_of(point).await?.sanitized();
        let life = self.rpc.key_revision_of(point).await?;
        let rift = self.rpc.continuity_of(point).await?;
        let spawn_count = self.rpc.spawn_count_of(point).await?;
        let keys = self.rpc.configured_keys_of(point).await?;

        let dominion = if spawn_proxy == EthAddress::from_str(L2_DEPOSIT_ADDRESS)? { Dominion::L2 } else { Dominion::L1 };
        debug!("assembled L1 point info point={} dominion={} life={} rift={}", point, dominion, life, rift);

        Ok(PointInfo {
            point,
            dominion,
            owner,
            spawn_proxy: spawn_proxy.sanitized(),
            management_proxy,
            transfer_proxy,
            sponsor,
            keys,
            life,
            rift,
            spawn_count,
        })
    }

    async fn can_configure_keys(&self, point: Point, address: &EthAddress) -> Result<AuthorityCheck> {
        self.rpc.can_configure_keys(point, address).await
    }

    async fn configure_keys(&self, point: Point, params: &KeyConfiguration, identity: &SigningIdentity) -> Result<Receipt> {
        let gas_gwei = self.resolve_gas_gwei().await?;
        info!("submitting L1 configureKeys point={} breach={} gas_gwei={}", point, params.breach, gas_gwei);
        let tx_hash = self.rpc.configure_keys(point, params, gas_gwei, identity).await?;
        Ok(Receipt::L1 { tx_hash, gas_gwei })
    }
}
