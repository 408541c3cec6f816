use crate::domain::{derive_keyfile, KeyDeriver, KeyFile, NetworkKeyPair, WalletRecord};
use crate::foundation::{Point, Result, TillerError};
use crate::infrastructure::storage::ArtifactStore;
use log::{debug, info};
use std::sync::Arc;

/// Where fresh key material comes from when the cache has none.
pub enum KeyMaterialSource<'a> {
    /// Derive from a master ticket.
    Ticket(&'a str),
    /// Adopt the keys a local wallet record already holds.
    Wallet(&'a WalletRecord),
}

/// Durable cache of per-revision key material. Generation is strictly
/// once per `(point, life)`: a cached entry always wins over regeneration,
/// so an interrupted run resumes with the material it already produced.
pub struct NetworkKeyCache {
    store: Arc<dyn ArtifactStore>,
    deriver: Arc<dyn KeyDeriver>,
}

impl NetworkKeyCache {
    pub fn new(store: Arc<dyn ArtifactStore>, deriver: Arc<dyn KeyDeriver>) -> Self {
        Self { store, deriver }
    }

    /// Returns the key material for `(point, life)`, generating and persisting
    /// it only if no cached entry exists.
    pub fn get_or_generate(&self, point: Point, life: u64, source: KeyMaterialSource<'_>) -> Result<NetworkKeyPair> {
        if let Some(cached) = self.store.get_network_keys(point, life)? {
            debug!("network keys cache hit point={} life={}", point, life);
            return Ok(cached);
        }

        let fresh = match source {
            KeyMaterialSource::Ticket(ticket) => self.deriver.derive(point, life, ticket)?,
            KeyMaterialSource::Wallet(record) => {
                let keys = record.network_keys().ok_or_else(|| TillerError::CacheConsistency {
                    point,
                    details: "wallet record carries no network keys".to_string(),
                })?;
                NetworkKeyPair { crypt: keys.crypt.clone(), auth: keys.auth.clone(), life, rift: life }
            }
        };

        if self.store.put_network_keys_if_absent(point, life, &fresh)? {
            info!("network keys generated point={} life={}", point, life);
            return Ok(fresh);
        }
        // Lost the write race; the stored entry is authoritative.
        self.store.get_network_keys(point, life)?.ok_or_else(|| TillerError::CacheConsistency {
            point,
            details: format!("keys for life {} vanished between write and read", life),
        })
    }

    /// The boot keyfile for `(point, life)`, generated at most once.
    pub fn keyfile(&self, point: Point, life: u64, keys: &NetworkKeyPair) -> Result<KeyFile> {
        if let Some(cached) = self.store.get_keyfile(point, life)? {
            debug!("keyfile cache hit point={} life={}", point, life);
            return Ok(cached);
        }
        let fresh = derive_keyfile(keys, point, life)?;
        if self.store.put_keyfile_if_absent(point, life, &fresh)? {
            info!("keyfile written point={} life={}", point, life);
            return Ok(fresh);
        }
        self.store.get_keyfile(point, life)?.ok_or_else(|| TillerError::CacheConsistency {
            point,
            details: format!("keyfile for life {} vanished between write and read", life),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TicketKeyDeriver;
    use crate::infrastructure::storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDeriver {
        calls: AtomicUsize,
    }

    impl KeyDeriver for CountingDeriver {
        fn derive(&self, point: Point, life: u64, ticket: &str) -> Result<NetworkKeyPair> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            TicketKeyDeriver.derive(point, life, ticket)
        }
    }

    #[test]
    fn second_lookup_never_rederives() {
        let store = Arc::new(MemoryStore::new());
        let deriver = Arc::new(CountingDeriver { calls: AtomicUsize::new(0) });
        let cache = NetworkKeyCache::new(store, deriver.clone());
        let point = Point::new(65792);

        let first = cache.get_or_generate(point, 4, KeyMaterialSource::Ticket("ticket")).unwrap();
        let second = cache.get_or_generate(point, 4, KeyMaterialSource::Ticket("ticket")).unwrap();

        assert_eq!(first, second);
        assert_eq!(deriver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_revisions_get_distinct_material() {
        let store = Arc::new(MemoryStore::new());
        let cache = NetworkKeyCache::new(store, Arc::new(TicketKeyDeriver));
        let point = Point::new(0);

        let a = cache.get_or_generate(point, 1, KeyMaterialSource::Ticket("ticket")).unwrap();
        let b = cache.get_or_generate(point, 2, KeyMaterialSource::Ticket("ticket")).unwrap();
        assert_ne!(a.crypt, b.crypt);
        assert_eq!(b.life, 2);
        assert_eq!(b.rift, 2);
    }

    #[test]
    fn wallet_without_keys_is_a_consistency_error() {
        let store = Arc::new(MemoryStore::new());
        let cache = NetworkKeyCache::new(store, Arc::new(TicketKeyDeriver));
        let record: WalletRecord = serde_json::from_str(r#"{"point": "~zod"}"#).unwrap();

        let err = cache.get_or_generate(Point::new(0), 1, KeyMaterialSource::Wallet(&record)).unwrap_err();
        assert!(matches!(err, TillerError::CacheConsistency { .. }));
    }

    #[test]
    fn wallet_keys_are_adopted_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let cache = NetworkKeyCache::new(store, Arc::new(TicketKeyDeriver));
        let record: WalletRecord = serde_json::from_str(
            r#"{
                "point": "~zod",
                "network": {"keys": {
                    "crypt": {"public": "aa", "private": "bb"},
                    "auth": {"public": "cc", "private": "dd"}
                }}
            }"#,
        )
        .unwrap();

        let keys = cache.get_or_generate(Point::new(0), 3, KeyMaterialSource::Wallet(&record)).unwrap();
        assert_eq!(keys.crypt.public, "aa");
        assert_eq!(keys.life, 3);
    }

    #[test]
    fn keyfile_is_generated_once_and_reused() {
        let store = Arc::new(MemoryStore::new());
        let cache = NetworkKeyCache::new(store.clone(), Arc::new(TicketKeyDeriver));
        let point = Point::new(256);
        let keys = cache.get_or_generate(point, 2, KeyMaterialSource::Ticket("ticket")).unwrap();

        let first = cache.keyfile(point, 2, &keys).unwrap();
        let second = cache.keyfile(point, 2, &keys).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.get_keyfile(point, 2).unwrap().unwrap(), first);
    }
}
