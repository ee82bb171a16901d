//! Concurrency tests for the folder registry.
//!
//! Concurrent registrations must all be persisted, whichever backend stores
//! them.

use std::sync::Arc;

use drivegate::registry::{JsonFileStore, RegistrationRequest, Registry, SqliteStore};

const TASKS: usize = 25;

async fn register_concurrently(registry: Arc<Registry>) -> Vec<String> {
    let mut handles = Vec::new();
    for i in 0..TASKS {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let request = RegistrationRequest::new(
                format!("Folder {i}"),
                format!("https://drive.google.com/drive/folders/folder{i}"),
                i % 2 == 0,
            );
            registry.register(&request).await.unwrap().token
        }));
    }

    let mut tokens = Vec::new();
    for handle in handles {
        tokens.push(handle.await.unwrap());
    }
    tokens
}

async fn assert_all_resolve(registry: &Registry, tokens: &[String]) {
    let mut unique = tokens.to_vec();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), TASKS);

    for token in tokens {
        let entry = registry.resolve(token).await.unwrap();
        assert!(entry.folder_id.starts_with("folder"));
    }
    assert_eq!(registry.len().await.unwrap(), TASKS);
}

/// Test concurrent registrations against the JSON document backend.
///
/// Every writer rewrites the whole document, so a lost update would drop
/// an entry from the file.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folderMap.json");
    let registry = Arc::new(Registry::new(Arc::new(JsonFileStore::new(&path)), 8));

    let tokens = register_concurrently(registry.clone()).await;
    assert_all_resolve(&registry, &tokens).await;

    // A fresh store over the same file sees every entry
    let reopened = Registry::new(Arc::new(JsonFileStore::new(&path)), 8);
    assert_all_resolve(&reopened, &tokens).await;
}

/// Test concurrent registrations against the SQLite backend.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("registry.db")).await.unwrap();
    let registry = Arc::new(Registry::new(Arc::new(store), 8));

    let tokens = register_concurrently(registry.clone()).await;
    assert_all_resolve(&registry, &tokens).await;
}
