use crate::domain::model::KeyHalf;
use crate::foundation::{EthAddress, Point, Result, TillerError};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A locally stored wallet record, one JSON file per point. Only the fields
/// the orchestrator needs are modeled; unknown fields are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct WalletRecord {
    pub point: PointField,
    #[serde(default)]
    pub ownership: Option<OwnershipSection>,
    #[serde(default)]
    pub network: Option<NetworkSection>,
}

/// Wallet files may carry the point as a number or a phonemic name.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PointField {
    Number(u64),
    Name(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct OwnershipSection {
    #[serde(default)]
    pub address: Option<EthAddress>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NetworkSection {
    #[serde(default)]
    pub keys: Option<WalletNetworkKeys>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WalletNetworkKeys {
    pub crypt: KeyHalf,
    pub auth: KeyHalf,
}

impl WalletRecord {
    pub fn point(&self) -> Result<Point> {
        match &self.point {
            PointField::Number(value) => Ok(Point::new(*value)),
            PointField::Name(name) => Point::from_str(name),
        }
    }

    pub fn network_keys(&self) -> Option<&WalletNetworkKeys> {
        self.network.as_ref().and_then(|n| n.keys.as_ref())
    }
}

/// Reads every `*.json` wallet record under `dir`. A file that fails to
/// parse aborts the read: a declared wallet directory with malformed records
/// is a setup problem, not something to skip past silently.
pub fn load_wallets(dir: &Path) -> Result<Vec<WalletRecord>> {
    let mut records = Vec::new();
    let entries = fs::read_dir(dir)
        .map_err(|err| TillerError::ConfigError(format!("cannot read wallet directory {}: {}", dir.display(), err)))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    for path in paths {
        let contents = fs::read_to_string(&path)?;
        let record: WalletRecord = serde_json::from_str(&contents).map_err(|err| TillerError::SerializationError {
            format: "json".to_string(),
            details: format!("wallet record {}: {}", path.display(), err),
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accepts_numeric_and_named_points() {
        let record: WalletRecord = serde_json::from_str(r#"{"point": 256}"#).unwrap();
        assert_eq!(record.point().unwrap(), Point::new(256));

        let record: WalletRecord = serde_json::from_str(r#"{"point": "~marzod"}"#).unwrap();
        assert_eq!(record.point().unwrap(), Point::new(256));
        assert!(record.network_keys().is_none());
    }

    #[test]
    fn record_surfaces_network_keys() {
        let record: WalletRecord = serde_json::from_str(
            r#"{
                "point": "~zod",
                "ownership": {"address": "0x6d654ef2479f427950ca0e6c3bca2db5080c74e6"},
                "network": {"keys": {
                    "crypt": {"public": "aa", "private": "bb"},
                    "auth": {"public": "cc", "private": "dd"}
                }}
            }"#,
        )
        .unwrap();
        let keys = record.network_keys().unwrap();
        assert_eq!(keys.crypt.public, "aa");
        assert_eq!(keys.auth.private, "dd");
    }
}
