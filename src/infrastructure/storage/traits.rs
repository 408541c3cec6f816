use crate::domain::{KeyFile, NetworkKeyPair, Receipt};
use crate::foundation::{Point, Result};

/// Write-once artifact store. Existence of an entry is authoritative proof
/// that the work producing it already ran; `put_*_if_absent` never
/// overwrites and reports whether a write happened.
pub trait ArtifactStore: Send + Sync {
    fn get_network_keys(&self, point: Point, life: u64) -> Result<Option<NetworkKeyPair>>;

    /// Returns `Ok(true)` if the entry was newly written, `Ok(false)` if it
    /// already existed (in which case the stored entry is left untouched).
    fn put_network_keys_if_absent(&self, point: Point, life: u64, keys: &NetworkKeyPair) -> Result<bool>;

    fn get_keyfile(&self, point: Point, life: u64) -> Result<Option<KeyFile>>;
    fn put_keyfile_if_absent(&self, point: Point, life: u64, keyfile: &KeyFile) -> Result<bool>;

    /// Receipts are keyed by `(point, operation)`; the operation tag encodes
    /// the revision where one applies (e.g. `networkkey-4`).
    fn get_receipt(&self, point: Point, operation: &str) -> Result<Option<Receipt>>;
    fn put_receipt_if_absent(&self, point: Point, operation: &str, receipt: &Receipt) -> Result<bool>;
}
