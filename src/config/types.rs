use crate::foundation::Dominion;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Immutable application configuration. Constructed once per invocation and
/// passed by reference into every component; no option bags are threaded
/// through individual calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding write-once artifacts (key material, keyfiles,
    /// receipts). Created on demand by the store.
    pub work_dir: PathBuf,
    /// When set, skips the L2 probe entirely and uses the named ledger.
    pub force_dominion: Option<Dominion>,
    pub l1: L1Config,
    pub roller: RollerConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct L1Config {
    pub rpc_url: String,
    /// Explicit gas price override in gwei. Wins over the fee oracle.
    pub gas_gwei: Option<u64>,
    /// Fee-oracle endpoint consulted when no override is set.
    pub gas_oracle_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RollerConfig {
    pub url: String,
    /// Transport-level timeout; the core imposes none of its own.
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { work_dir: PathBuf::from("."), force_dominion: None, l1: L1Config::default(), roller: RollerConfig::default() }
    }
}

impl Default for L1Config {
    fn default() -> Self {
        Self { rpc_url: String::new(), gas_gwei: None, gas_oracle_url: None }
    }
}

impl Default for RollerConfig {
    fn default() -> Self {
        Self { url: String::new(), timeout_secs: 0 }
    }
}
