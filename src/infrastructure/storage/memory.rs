use crate::domain::{KeyFile, NetworkKeyPair, Receipt};
use crate::foundation::{Point, Result, TillerError};
use crate::infrastructure::storage::traits::ArtifactStore;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryInner {
    keys: HashMap<(Point, u64), NetworkKeyPair>,
    keyfiles: HashMap<(Point, u64), KeyFile>,
    receipts: HashMap<(Point, String), Receipt>,
}

/// In-memory artifact store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner.lock().map_err(|_| TillerError::StorageError {
            operation: "memory store lock".to_string(),
            details: "poisoned".to_string(),
        })
    }

    /// Receipts recorded so far, for test assertions.
    pub fn receipt_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.receipts.len()).unwrap_or(0)
    }
}

impl ArtifactStore for MemoryStore {
    fn get_network_keys(&self, point: Point, life: u64) -> Result<Option<NetworkKeyPair>> {
        Ok(self.lock_inner()?.keys.get(&(point, life)).cloned())
    }

    fn put_network_keys_if_absent(&self, point: Point, life: u64, keys: &NetworkKeyPair) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        if inner.keys.contains_key(&(point, life)) {
            return Ok(false);
        }
        inner.keys.insert((point, life), keys.clone());
        Ok(true)
    }

    fn get_keyfile(&self, point: Point, life: u64) -> Result<Option<KeyFile>> {
        Ok(self.lock_inner()?.keyfiles.get(&(point, life)).cloned())
    }

    fn put_keyfile_if_absent(&self, point: Point, life: u64, keyfile: &KeyFile) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        if inner.keyfiles.contains_key(&(point, life)) {
            return Ok(false);
        }
        inner.keyfiles.insert((point, life), keyfile.clone());
        Ok(true)
    }

    fn get_receipt(&self, point: Point, operation: &str) -> Result<Option<Receipt>> {
        Ok(self.lock_inner()?.receipts.get(&(point, operation.to_string())).cloned())
    }

    fn put_receipt_if_absent(&self, point: Point, operation: &str, receipt: &Receipt) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        let key = (point, operation.to_string());
        if inner.receipts.contains_key(&key) {
            return Ok(false);
        }
        inner.receipts.insert(key, receipt.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KeyHalf;

    fn sample_keys(life: u64) -> NetworkKeyPair {
        NetworkKeyPair {
            crypt: KeyHalf { public: "aa".into(), private: "bb".into() },
            auth: KeyHalf { public: "cc".into(), private: "dd".into() },
            life,
            rift: life,
        }
    }

    #[test]
    fn put_if_absent_never_overwrites() {
        let store = MemoryStore::new();
        let point = Point::new(0);

        assert!(store.put_network_keys_if_absent(point, 1, &sample_keys(1)).unwrap());
        let mut replacement = sample_keys(1);
        replacement.crypt.public = "ee".into();
        assert!(!store.put_network_keys_if_absent(point, 1, &replacement).unwrap());

        let stored = store.get_network_keys(point, 1).unwrap().unwrap();
        assert_eq!(stored.crypt.public, "aa");
        assert!(store.get_network_keys(point, 2).unwrap().is_none());
    }

    #[test]
    fn receipts_key_by_operation() {
        let store = MemoryStore::new();
        let point = Point::new(256);
        let receipt = Receipt::L2 { tx_hash: "0xabc".into(), nonce: 7 };

        assert!(store.put_receipt_if_absent(point, "networkkey-4", &receipt).unwrap());
        assert!(!store.put_receipt_if_absent(point, "networkkey-4", &receipt).unwrap());
        assert!(store.put_receipt_if_absent(point, "escape", &receipt).unwrap());
        assert!(store.get_receipt(point, "networkkey-4").unwrap().is_some());
        assert_eq!(store.receipt_count(), 2);
    }
}
