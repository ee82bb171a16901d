//! Registry stored as a single JSON document.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use super::{RegistryEntry, RegistryStore};
use crate::error::{GateError, Result};

/// Value in the on-disk map.
///
/// Older files map tokens straight to folder id strings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Entry(RegistryEntry),
    FolderId(String),
}

impl StoredValue {
    fn into_entry(self, token: String) -> RegistryEntry {
        match self {
            StoredValue::Entry(mut entry) => {
                entry.token = token;
                entry
            }
            StoredValue::FolderId(folder_id) => RegistryEntry {
                token,
                folder_id,
                name: String::new(),
                private: true,
                created_at: None,
            },
        }
    }
}

/// JSON document store.
///
/// Every insert loads the whole map, adds the entry and writes the whole map
/// back while holding `write_lock`. The new document is written to a sibling
/// temporary file and renamed over the old one, so lock-free readers see
/// either the previous or the next version.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store backed by `path`. The file is created on first insert.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, RegistryEntry>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(GateError::Persistence(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let map: BTreeMap<String, StoredValue> = serde_json::from_slice(&raw).map_err(|e| {
            GateError::Persistence(format!("failed to parse {}: {e}", self.path.display()))
        })?;

        Ok(map
            .into_iter()
            .map(|(token, value)| {
                let entry = value.into_entry(token.clone());
                (token, entry)
            })
            .collect())
    }

    async fn save(&self, map: &BTreeMap<String, RegistryEntry>) -> Result<()> {
        let persistence = |e: std::io::Error| {
            GateError::Persistence(format!("failed to write {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(persistence)?;
            }
        }

        let json = serde_json::to_vec_pretty(map)
            .map_err(|e| GateError::Persistence(format!("failed to encode registry: {e}")))?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json).await.map_err(persistence)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "registry.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    async fn insert(&self, entry: RegistryEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.load().await?;
        if map.contains_key(&entry.token) {
            warn!(token = %entry.token, "Token already registered, overwriting entry");
        }
        map.insert(entry.token.clone(), entry);
        self.save(&map).await
    }

    async fn get(&self, token: &str) -> Result<Option<RegistryEntry>> {
        Ok(self.load().await?.remove(token))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.load().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(token: &str, folder_id: &str) -> RegistryEntry {
        RegistryEntry {
            token: token.to_string(),
            folder_id: folder_id.to_string(),
            name: format!("{token} folder"),
            private: true,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("folderMap.json"));

        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.get("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_creates_parent_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("folderMap.json");
        let store = JsonFileStore::new(&path);

        store.insert(entry("abc", "f1")).await.unwrap();
        assert!(path.exists());
        assert!(!store.temp_path().exists());

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("abc").await.unwrap(), Some(entry("abc", "f1")));
    }

    #[tokio::test]
    async fn test_insert_overwrites_same_token() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("folderMap.json"));

        store.insert(entry("abc", "f1")).await.unwrap();
        store.insert(entry("abc", "f2")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.get("abc").await.unwrap().unwrap().folder_id, "f2");
    }

    #[tokio::test]
    async fn test_reads_legacy_string_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folderMap.json");
        std::fs::write(&path, r#"{ "abc123": "1legacyFolder" }"#).unwrap();

        let store = JsonFileStore::new(&path);
        let found = store.get("abc123").await.unwrap().unwrap();
        assert_eq!(found.token, "abc123");
        assert_eq!(found.folder_id, "1legacyFolder");

        // Legacy values are rewritten in the current shape on the next insert.
        store.insert(entry("new", "f9")).await.unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["abc123"]["folderId"], "1legacyFolder");
        assert_eq!(raw["new"]["folderId"], "f9");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folderMap.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get("abc").await,
            Err(GateError::Persistence(_))
        ));
        assert!(matches!(
            store.insert(entry("abc", "f1")).await,
            Err(GateError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_keep_every_entry() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::new(dir.path().join("folderMap.json")));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert(entry(&format!("t{i}"), &format!("f{i}")))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await.unwrap(), 20);
        for i in 0..20 {
            let found = store.get(&format!("t{i}")).await.unwrap().unwrap();
            assert_eq!(found.folder_id, format!("f{i}"));
        }
    }
}
