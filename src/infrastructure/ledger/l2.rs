use crate::domain::{AuthorityCheck, ConfiguredKeys, PointInfo, Receipt, SigningIdentity};
use crate::foundation::{Dominion, EthAddress, Point, Result, TillerError};
use crate::infrastructure::ledger::{KeyConfiguration, Ledger};
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The roller surfaces "unknown point" through this error message; it is the
/// structured signal that drives dominion fallback. Anything else is a real
/// failure and propagates.
const NOT_FOUND_MESSAGE: &str = "Resource not found";

/// JSON-RPC client for the L2 rollup aggregator.
pub struct RollerClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// A numeric field the roller may serialize as a number or a string.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FlexU64 {
    Num(u64),
    Str(String),
}

impl FlexU64 {
    fn get(&self) -> Result<u64> {
        match self {
            FlexU64::Num(value) => Ok(*value),
            FlexU64::Str(raw) => {
                let trimmed = raw.trim();
                if let Some(hex_part) = trimmed.strip_prefix("0x") {
                    u64::from_str_radix(hex_part, 16)
                } else {
                    trimmed.parse::<u64>()
                }
                .map_err(|_| TillerError::SerializationError {
                    format: "roller".to_string(),
                    details: format!("'{}' is not a u64", raw),
                })
            }
        }
    }
}

/// Aggregate point record as the roller nests it; normalized into the
/// canonical `PointInfo` shape by the L2 backend.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollerPointRecord {
    pub dominion: String,
    pub ownership: OwnershipRecord,
    pub network: NetworkRecord,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnershipRecord {
    pub owner: AddressEntry,
    pub spawn_proxy: AddressEntry,
    pub management_proxy: AddressEntry,
    pub transfer_proxy: AddressEntry,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AddressEntry {
    pub address: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub keys: KeysRecord,
    pub rift: FlexU64,
    pub sponsor: SponsorRecord,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysRecord {
    pub life: FlexU64,
    #[serde(default)]
    pub suite: Option<FlexU64>,
    #[serde(default)]
    pub crypt: Option<String>,
    #[serde(default)]
    pub auth: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorRecord {
    pub has: bool,
    pub who: FlexU64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SponsoredPoints {
    pub residents: Vec<FlexU64>,
    pub requests: Vec<FlexU64>,
}

impl AddressEntry {
    fn sanitized(&self) -> Result<Option<EthAddress>> {
        match &self.address {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => Ok(EthAddress::from_str(raw)?.sanitized()),
        }
    }
}

impl KeysRecord {
    fn configured(&self) -> Result<Option<ConfiguredKeys>> {
        let auth = self.auth.as_deref().unwrap_or("").trim();
        let crypt = self.crypt.as_deref().unwrap_or("").trim();
        // The roller signals "never keyed" with an empty or all-zero auth key.
        let unset = auth.is_empty() || auth.trim_start_matches("0x").chars().all(|c| c == '0');
        if unset {
            return Ok(None);
        }
        let suite = match &self.suite {
            Some(value) => value.get()? as u32,
            None => crate::foundation::CRYPTO_SUITE_VERSION,
        };
        Ok(Some(ConfiguredKeys { crypt: crypt.to_string(), auth: auth.to_string(), suite }))
    }
}

impl RollerClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TillerError::chain("build roller client", err.to_string()))?;
        Ok(Self { client, url: url.into(), next_id: AtomicU64::new(1) })
    }

    async fn call(&self, method: &str, params: Value, point: Point) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|err| TillerError::chain_with_source(method, self.url.clone(), err))?
            .error_for_status()
            .map_err(|err| TillerError::chain_with_source(method, self.url.clone(), err))?
            .json()
            .await
            .map_err(|err| TillerError::chain_with_source(method, "malformed roller response", err))?;

        if let Some(error) = response.error {
            if error.message.contains(NOT_FOUND_MESSAGE) {
                return Err(TillerError::not_found(point, format!("roller {}", method)));
            }
            return Err(TillerError::chain(method, format!("roller error {}: {}", error.code, error.message)));
        }
        response.result.ok_or_else(|| TillerError::chain(method, "roller response had neither result nor error"))
    }

    pub async fn get_point(&self, point: Point) -> Result<RollerPointRecord> {
        let result = self.call("getPoint", json!({ "ship": point.value() }), point).await?;
        serde_json::from_value(result).map_err(|err| TillerError::SerializationError {
            format: "roller".to_string(),
            details: format!("getPoint({}): {}", point, err),
        })
    }

    pub async fn get_spawned(&self, point: Point) -> Result<Vec<Point>> {
        let result = self.call("getSpawned", json!({ "ship": point.value() }), point).await?;
        let raw: Vec<FlexU64> = serde_json::from_value(result).map_err(|err| TillerError::SerializationError {
            format: "roller".to_string(),
            details: format!("getSpawned({}): {}", point, err),
        })?;
        raw.iter().map(|value| value.get().map(Point::new)).collect()
    }

    pub async fn get_sponsored(&self, point: Point) -> Result<SponsoredPoints> {
        let result = self.call("getSponsoredPoints", json!({ "ship": point.value() }), point).await?;
        serde_json::from_value(result).map_err(|err| TillerError::SerializationError {
            format: "roller".to_string(),
            details: format!("getSponsoredPoints({}): {}", point, err),
        })
    }

    async fn get_nonce(&self, point: Point, proxy: &str) -> Result<u64> {
        let result = self.call("getNonce", json!({ "from": { "ship": point.value(), "proxy": proxy } }), point).await?;
        let nonce: FlexU64 = serde_json::from_value(result).map_err(|err| TillerError::SerializationError {
            format: "roller".to_string(),
            details: format!("getNonce({}): {}", point, err),
        })?;
        nonce.get()
    }

    async fn capability(&self, method: &str, point: Point, address: &EthAddress) -> Result<bool> {
        let result = self.call(method, json!({ "ship": point.value(), "address": address.to_string() }), point).await?;
        expect_bool(method, point, &result)
    }

    pub async fn can_configure_keys(&self, point: Point, address: &EthAddress) -> Result<bool> {
        self.capability("canConfigureKeys", point, address).await
    }

    pub async fn can_escape(&self, point: Point, address: &EthAddress) -> Result<bool> {
        self.capability("canEscape", point, address).await
    }

    pub async fn can_adopt(&self, point: Point, address: &EthAddress) -> Result<bool> {
        self.capability("canAdopt", point, address).await
    }

    pub async fn can_transfer(&self, point: Point, address: &EthAddress) -> Result<bool> {
        self.capability("canTransferPoint", point, address).await
    }

    /// Picks the proxy role the signing address holds for management-class
    /// mutations (configureKeys, escape, adopt): owner or management proxy.
    fn management_role(record: &RollerPointRecord, address: &EthAddress) -> Result<&'static str> {
        let owner = record.ownership.owner.sanitized()?;
        let manage = record.ownership.management_proxy.sanitized()?;
        if owner.as_ref() == Some(address) {
            Ok("own")
        } else if manage.as_ref() == Some(address) {
            Ok("manage")
        } else {
            Err(TillerError::Message("signing address holds neither ownership nor the management proxy".to_string()))
        }
    }

    fn transfer_role(record: &RollerPointRecord, address: &EthAddress) -> Result<&'static str> {
        let owner = record.ownership.owner.sanitized()?;
        let transfer = record.ownership.transfer_proxy.sanitized()?;
        if owner.as_ref() == Some(address) {
            Ok("own")
        } else if transfer.as_ref() == Some(address) {
            Ok("transfer")
        } else {
            Err(TillerError::Message("signing address holds neither ownership nor the transfer proxy".to_string()))
        }
    }

    /// Signs and submits one rollup mutation: fetch the role nonce, sign the
    /// canonical payload digest, post, await the roller's receipt.
    async fn submit(
        &self,
        method: &str,
        point: Point,
        proxy: &'static str,
        data: Value,
        identity: &SigningIdentity,
    ) -> Result<Receipt> {
        let nonce = self.get_nonce(point, proxy).await?;

        // serde_json maps are ordered, so this rendering is deterministic
        // and both sides can reproduce the digest.
        let unsigned = json!({
            "method": method,
            "from": { "ship": point.value(), "proxy": proxy },
            "nonce": nonce,
            "data": data,
        });
        let digest = blake3::hash(unsigned.to_string().as_bytes());
        let sig = identity.sign_digest(*digest.as_bytes())?;

        let params = json!({
            "address": identity.address.to_string(),
            "sig": format!("0x{}", sig),
            "from": { "ship": point.value(), "proxy": proxy },
            "data": data,
        });

        let result = self.call(method, params, point).await?;
        let tx_hash = extract_tx_hash(&result)
            .ok_or_else(|| TillerError::chain(method, "roller receipt carried no transaction hash"))?;
        debug!("roller mutation accepted method={} point={} nonce={} tx_hash={}", method, point, nonce, tx_hash);
        Ok(Receipt::L2 { tx_hash, nonce })
    }

    pub async fn configure_keys(
        &self,
        point: Point,
        params: &KeyConfiguration,
        identity: &SigningIdentity,
    ) -> Result<Receipt> {
        let record = self.get_point(point).await?;
        let proxy = Self::management_role(&record, &identity.address)
            .map_err(|err| TillerError::Authorization { point, reason: err.to_string() })?;
        let data = json!({
            "encrypt": with_hex_prefix(&params.crypt_public),
            "auth": with_hex_prefix(&params.auth_public),
            "cryptoSuite": params.suite.to_string(),
            "breach": params.breach,
        });
        info!("submitting L2 configureKeys point={} proxy={} breach={}", point, proxy, params.breach);
        self.submit("configureKeys", point, proxy, data, identity).await
    }

    pub async fn escape(&self, point: Point, sponsor: Point, identity: &SigningIdentity) -> Result<Receipt> {
        let record = self.get_point(point).await?;
        let proxy = Self::management_role(&record, &identity.address)
            .map_err(|err| TillerError::Authorization { point, reason: err.to_string() })?;
        self.submit("escape", point, proxy, json!({ "ship": sponsor.value() }), identity).await
    }

    pub async fn adopt(&self, sponsor: Point, adoptee: Point, identity: &SigningIdentity) -> Result<Receipt> {
        let record = self.get_point(sponsor).await?;
        let proxy = Self::management_role(&record, &identity.address)
            .map_err(|err| TillerError::Authorization { point: sponsor, reason: err.to_string() })?;
        self.submit("adopt", sponsor, proxy, json!({ "ship": adoptee.value() }), identity).await
    }

    pub async fn transfer(
        &self,
        point: Point,
        target: &EthAddress,
        reset: bool,
        identity: &SigningIdentity,
    ) -> Result<Receipt> {
        let record = self.get_point(point).await?;
        let proxy = Self::transfer_role(&record, &identity.address)
            .map_err(|err| TillerError::Authorization { point, reason: err.to_string() })?;
        let data = json!({ "address": target.to_string(), "reset": reset });
        self.submit("transferPoint", point, proxy, data, identity).await
    }
}

fn with_hex_prefix(value: &str) -> String {
    if value.starts_with("0x") {
        value.to_string()
    } else {
        format!("0x{}", value)
    }
}

/// A capability answer that is not a boolean is a malformed response, not a
/// denial.
fn expect_bool(method: &str, point: Point, result: &Value) -> Result<bool> {
    result.as_bool().ok_or_else(|| TillerError::SerializationError {
        format: "roller".to_string(),
        details: format!("{}({}): expected a boolean, got {}", method, point, result),
    })
}

fn extract_tx_hash(result: &Value) -> Option<String> {
    match result {
        Value::String(hash) => Some(hash.clone()),
        Value::Object(map) => map.get("hash").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// The rollup backend: one aggregate query per snapshot, normalized into the
/// canonical shape.
pub struct L2Ledger {
    roller: Arc<RollerClient>,
}

impl L2Ledger {
    pub fn new(roller: Arc<RollerClient>) -> Self {
        Self { roller }
    }

    pub fn roller(&self) -> &Arc<RollerClient> {
        &self.roller
    }

    pub fn normalize(point: Point, record: &RollerPointRecord, spawn_count: u64) -> Result<PointInfo> {
        let dominion = Dominion::from_str(&record.dominion)?;
        // Sponsor absence is an explicit flag in the source data; the sponsor
        // number alone is not trusted.
        let sponsor = if record.network.sponsor.has { Some(Point::new(record.network.sponsor.who.get()?)) } else { None };

        Ok(PointInfo {
            point,
            dominion,
            owner: record.ownership.owner.sanitized()?,
            spawn_proxy: record.ownership.spawn_proxy.sanitized()?,
            management_proxy: record.ownership.management_proxy.sanitized()?,
            transfer_proxy: record.ownership.transfer_proxy.sanitized()?,
            sponsor,
            keys: record.network.keys.configured()?,
            life: record.network.keys.life.get()?,
            rift: record.network.rift.get()?,
            spawn_count,
        })
    }
}

#[async_trait]
impl Ledger for L2Ledger {
    fn dominion(&self) -> Dominion {
        Dominion::L2
    }

    async fn point_info(&self, point: Point) -> Result<PointInfo> {
        let record = self.roller.get_point(point).await?;
        let spawned = self.roller.get_spawned(point).await?;
        Self::normalize(point, &record, spawned.len() as u64)
    }

    async fn can_configure_keys(&self, point: Point, address: &EthAddress) -> Result<AuthorityCheck> {
        if self.roller.can_configure_keys(point, address).await? {
            Ok(AuthorityCheck::allowed())
        } else {
            Ok(AuthorityCheck::denied("roller denies configureKeys for this address"))
        }
    }

    async fn configure_keys(&self, point: Point, params: &KeyConfiguration, identity: &SigningIdentity) -> Result<Receipt> {
        self.roller.configure_keys(point, params, identity).await
    }
}
