// Cache snapshot store.
// Reads and writes cache snapshots as JSON, atomically via a temp file.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::Result;

use super::CacheEntry;

/// Read a snapshot, returning an empty map when none exists.
///
/// A snapshot that no longer parses is discarded rather than failing the caller.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<HashMap<String, CacheEntry<T>>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let contents = fs::read_to_string(path)?;
    match serde_json::from_str(&contents) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding unreadable cache snapshot");
            Ok(HashMap::new())
        }
    }
}

/// Write a snapshot to disk.
pub fn save_snapshot<T: Serialize>(
    path: &Path,
    entries: &HashMap<String, CacheEntry<T>>,
) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(entries)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    debug!(path = %path.display(), entries = entries.len(), "saved cache snapshot");
    Ok(())
}

/// Delete a snapshot file.
pub fn delete_snapshot(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_write_and_read_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("metadata.json");

        let mut entries = HashMap::new();
        entries.insert(
            "acme/widgets".to_string(),
            CacheEntry {
                payload: Some(TestData {
                    name: "test".to_string(),
                    value: 42,
                }),
                fetched_at: 1_000,
                rate_limit_reset_at: Some(2_000),
            },
        );
        entries.insert(
            "acme/missing".to_string(),
            CacheEntry {
                payload: None,
                fetched_at: 1_500,
                rate_limit_reset_at: None,
            },
        );

        save_snapshot(&path, &entries).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded: HashMap<String, CacheEntry<TestData>> = load_snapshot(&path).unwrap();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_read_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.json");

        let loaded: HashMap<String, CacheEntry<TestData>> = load_snapshot(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("issues.json");
        fs::write(&path, "{not json").unwrap();

        let loaded: HashMap<String, CacheEntry<TestData>> = load_snapshot(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_delete_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("issues.json");
        fs::write(&path, "{}").unwrap();

        delete_snapshot(&path).unwrap();
        assert!(!path.exists());
        delete_snapshot(&path).unwrap();
    }
}
