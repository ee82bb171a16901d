//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use bytes::Bytes;
use futures::StreamExt;
use tempfile::TempDir;

use drivegate::archive::ArchiveOptions;
use drivegate::drive::{ByteStream, DriveSource, FileDescriptor, FileMetadata};
use drivegate::registry::{JsonFileStore, RegistrationRequest, Registry};
use drivegate::web::{create_router, AppState};
use drivegate::{GateError, Result};

/// A folder link that parses to `folder_id`.
pub fn folder_link(folder_id: &str) -> String {
    format!("https://drive.google.com/drive/folders/{folder_id}?usp=sharing")
}

/// A remote call made against [`MockDrive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Metadata(String),
    Open(String),
}

/// How a mock file misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Metadata lookup fails.
    Metadata,
    /// Opening the content fails.
    Open,
    /// The content stream errors after its first chunk.
    MidStream,
}

#[derive(Debug, Clone)]
pub struct MockFile {
    pub id: String,
    pub name: Option<String>,
    pub parents: Vec<String>,
    pub chunks: Vec<Vec<u8>>,
    pub delay: Duration,
    pub fault: Option<Fault>,
}

impl MockFile {
    pub fn new(id: &str, name: &str, folder_id: &str, content: &[u8]) -> Self {
        Self {
            id: id.to_string(),
            name: Some(name.to_string()),
            parents: vec![folder_id.to_string()],
            chunks: content.chunks(4).map(|c| c.to_vec()).collect(),
            delay: Duration::ZERO,
            fault: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn content(&self) -> Vec<u8> {
        self.chunks.concat()
    }
}

/// In-memory remote store that records every call.
#[derive(Default)]
pub struct MockDrive {
    files: HashMap<String, MockFile>,
    calls: Mutex<Vec<Call>>,
    list_fails: bool,
}

impl MockDrive {
    pub fn new(files: Vec<MockFile>) -> Self {
        Self {
            files: files.into_iter().map(|f| (f.id.clone(), f)).collect(),
            ..Self::default()
        }
    }

    pub fn failing_list() -> Self {
        Self {
            list_fails: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn file(&self, id: &str) -> Result<&MockFile> {
        self.files
            .get(id)
            .ok_or_else(|| GateError::Upstream(format!("HTTP 404 for {id}")))
    }
}

#[async_trait]
impl DriveSource for MockDrive {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<FileDescriptor>> {
        self.record(Call::List(folder_id.to_string()));
        if self.list_fails {
            return Err(GateError::Upstream("HTTP 500 from drive".to_string()));
        }
        let mut files: Vec<FileDescriptor> = self
            .files
            .values()
            .filter(|f| f.parents.iter().any(|p| p == folder_id))
            .map(|f| FileDescriptor {
                id: f.id.clone(),
                name: f.name.clone().unwrap_or_default(),
                mime_type: "image/jpeg".to_string(),
                web_view_link: None,
                web_content_link: None,
            })
            .collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(files)
    }

    async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata> {
        self.record(Call::Metadata(file_id.to_string()));
        let file = self.file(file_id)?;
        tokio::time::sleep(file.delay).await;
        if file.fault == Some(Fault::Metadata) {
            return Err(GateError::Upstream("metadata unavailable".to_string()));
        }
        Ok(FileMetadata {
            name: file.name.clone(),
            parents: file.parents.clone(),
            size: Some(file.content().len() as u64),
        })
    }

    async fn open_content(&self, file_id: &str) -> Result<ByteStream> {
        self.record(Call::Open(file_id.to_string()));
        let file = self.file(file_id)?.clone();
        tokio::time::sleep(file.delay).await;
        if file.fault == Some(Fault::Open) {
            return Err(GateError::Upstream("content unavailable".to_string()));
        }

        let mut items: Vec<io::Result<Bytes>> = file
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.clone())))
            .collect();
        if file.fault == Some(Fault::MidStream) {
            items.truncate(1);
            items.push(Err(io::Error::other("connection reset")));
        }
        let delay = file.delay;
        Ok(futures::stream::iter(items)
            .then(move |item| async move {
                tokio::time::sleep(delay / 4).await;
                item
            })
            .boxed())
    }
}

/// Application wired to a mock remote store and a temporary JSON registry.
pub struct TestApp {
    pub registry: Arc<Registry>,
    pub drive: Arc<MockDrive>,
    pub router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub fn new(drive: MockDrive) -> Self {
        Self::with_options(drive, ArchiveOptions::default())
    }

    pub fn with_options(drive: MockDrive, options: ArchiveOptions) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("folderMap.json"));
        let registry = Arc::new(Registry::new(Arc::new(store), 8));
        let drive = Arc::new(drive);

        let state = AppState::new(registry.clone(), drive.clone(), options);
        let router = create_router(Arc::new(state), &[]);

        Self {
            registry,
            drive,
            router,
            _dir: dir,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).unwrap()
    }

    /// Register `folder_id` and return its token.
    pub async fn register(&self, name: &str, folder_id: &str) -> String {
        self.registry
            .register(&RegistrationRequest::new(name, folder_link(folder_id), true))
            .await
            .unwrap()
            .token
    }
}
