use crate::registry::DedupRegistry;
use anyhow::Result;
use bincode::{deserialize, serialize};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use plex_dubs_models::{LibraryKind, MediaId};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk form: registered ids per library, oldest first
type Snapshot = Vec<(LibraryKind, Vec<MediaId>)>;

/// Persists dedup registries across restarts.
///
/// Binary (bincode) snapshot, gzip compressed, written atomically.
#[derive(Debug, Clone)]
pub struct RegistryStorage {
    path: PathBuf,
}

impl RegistryStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load registries from disk; a missing or unreadable snapshot yields empty registries
    pub fn load(&self, capacity: usize) -> Result<BTreeMap<LibraryKind, DedupRegistry>> {
        let mut registries = BTreeMap::new();

        if !self.path.exists() {
            debug!(path = %self.path.display(), "Registry snapshot does not exist, starting empty");
            return Ok(registries);
        }

        let data = std::fs::read(&self.path)?;
        let snapshot: Snapshot = match Self::decode(&data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Keep the unreadable file around for inspection and start fresh
                let backup_path = self.path.with_extension("bin.bak");
                if let Err(backup_err) = std::fs::copy(&self.path, &backup_path) {
                    warn!(
                        "Failed to backup unreadable registry snapshot: {}. Starting with empty registry.",
                        backup_err
                    );
                } else {
                    warn!(
                        "Registry snapshot unreadable (error: {}). Backed up to {:?} and starting with empty registry.",
                        e, backup_path
                    );
                }
                return Ok(registries);
            }
        };

        let mut total = 0;
        for (kind, ids) in snapshot {
            let registry = DedupRegistry::from_ids(capacity, ids);
            total += registry.len();
            registries.insert(kind, registry);
        }

        info!(
            operation = "registry_loaded",
            entries = total,
            path = %self.path.display(),
            "Loaded dedup registry"
        );
        Ok(registries)
    }

    pub fn save(&self, registries: &BTreeMap<LibraryKind, DedupRegistry>) -> Result<()> {
        let snapshot: Snapshot = registries
            .iter()
            .map(|(kind, registry)| (*kind, registry.iter().cloned().collect()))
            .collect();

        let serialized = serialize(&snapshot)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&serialized)?;
        let encoded = encoder.finish()?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, encoded)?;
        std::fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), "Saved dedup registry");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!(path = %self.path.display(), "Removed dedup registry snapshot");
        }
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<Snapshot> {
        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(deserialize(&decompressed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registries(entries: &[(LibraryKind, &[&str])]) -> BTreeMap<LibraryKind, DedupRegistry> {
        entries
            .iter()
            .map(|(kind, ids)| {
                (*kind, DedupRegistry::from_ids(100, ids.iter().map(|id| MediaId::from(*id))))
            })
            .collect()
    }

    #[test]
    fn test_save_then_load_keeps_order_per_library() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RegistryStorage::new(dir.path().join("data").join("registry.bin"));

        storage
            .save(&registries(&[
                (LibraryKind::Series, &["ep42", "ep7"]),
                (LibraryKind::Movie, &["m1"]),
            ]))
            .unwrap();

        let loaded = storage.load(100).unwrap();
        let series: Vec<&str> = loaded[&LibraryKind::Series].iter().map(|id| id.as_str()).collect();
        assert_eq!(series, vec!["ep42", "ep7"]);
        assert!(loaded[&LibraryKind::Movie].contains(&MediaId::from("m1")));
    }

    #[test]
    fn test_load_applies_smaller_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RegistryStorage::new(dir.path().join("registry.bin"));
        storage
            .save(&registries(&[(LibraryKind::Series, &["1", "2", "3"])]))
            .unwrap();

        let loaded = storage.load(2).unwrap();
        assert!(!loaded[&LibraryKind::Series].contains(&MediaId::from("1")));
        assert_eq!(loaded[&LibraryKind::Series].len(), 2);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RegistryStorage::new(dir.path().join("missing.bin"));
        assert!(storage.load(10).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.bin");
        std::fs::write(&path, b"not a snapshot").unwrap();

        let storage = RegistryStorage::new(&path);
        assert!(storage.load(10).unwrap().is_empty());
        assert!(path.with_extension("bin.bak").exists());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RegistryStorage::new(dir.path().join("registry.bin"));
        storage.save(&registries(&[(LibraryKind::Movie, &["m1"])])).unwrap();
        storage.clear().unwrap();
        assert!(!storage.path().exists());
    }
}
