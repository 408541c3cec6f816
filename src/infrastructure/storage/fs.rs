use crate::domain::{KeyFile, NetworkKeyPair, Receipt};
use crate::foundation::{Point, Result, TillerError};
use crate::infrastructure::storage::traits::ArtifactStore;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem-backed artifact store: one file per artifact under the work
/// directory, named after the point's phonemic name (sans `~`).
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|err| TillerError::StorageError { operation: "create work dir".to_string(), details: err.to_string() })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stem(point: Point) -> String {
        // "~marzod" -> "marzod"
        point.name().trim_start_matches('~').to_string()
    }

    fn keys_path(&self, point: Point, life: u64) -> PathBuf {
        self.root.join(format!("{}-networkkeys-{}.json", Self::stem(point), life))
    }

    fn keyfile_path(&self, point: Point, life: u64) -> PathBuf {
        self.root.join(format!("{}-{}.key", Self::stem(point), life))
    }

    fn receipt_path(&self, point: Point, operation: &str) -> PathBuf {
        self.root.join(format!("{}-{}-receipt.json", Self::stem(point), operation))
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let value = serde_json::from_str(&contents).map_err(|err| TillerError::SerializationError {
            format: "json".to_string(),
            details: format!("{}: {}", path.display(), err),
        })?;
        Ok(Some(value))
    }

    fn write_new(path: &Path, contents: &str) -> Result<bool> {
        // Existence check before any write; write-once is the contract.
        if path.exists() {
            debug!("artifact already exists path={}", path.display());
            return Ok(false);
        }
        fs::write(path, contents)?;
        debug!("artifact written path={}", path.display());
        Ok(true)
    }
}

impl ArtifactStore for FsStore {
    fn get_network_keys(&self, point: Point, life: u64) -> Result<Option<NetworkKeyPair>> {
        Self::read_json(&self.keys_path(point, life))
    }

    fn put_network_keys_if_absent(&self, point: Point, life: u64, keys: &NetworkKeyPair) -> Result<bool> {
        let body = serde_json::to_string_pretty(keys)?;
        Self::write_new(&self.keys_path(point, life), &body)
    }

    fn get_keyfile(&self, point: Point, life: u64) -> Result<Option<KeyFile>> {
        let path = self.keyfile_path(point, life);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        Ok(Some(KeyFile { point, life, contents }))
    }

    fn put_keyfile_if_absent(&self, point: Point, life: u64, keyfile: &KeyFile) -> Result<bool> {
        // The keyfile is stored raw; point and life are recovered from the
        // file name on read.
        Self::write_new(&self.keyfile_path(point, life), &keyfile.contents)
    }

    fn get_receipt(&self, point: Point, operation: &str) -> Result<Option<Receipt>> {
        Self::read_json(&self.receipt_path(point, operation))
    }

    fn put_receipt_if_absent(&self, point: Point, operation: &str, receipt: &Receipt) -> Result<bool> {
        let body = serde_json::to_string_pretty(receipt)?;
        Self::write_new(&self.receipt_path(point, operation), &body)
    }
}
