//! Folder registry.
//!
//! Maps opaque access tokens to Google Drive folder ids. The registry is the
//! only place tokens are checked: listing and archive requests both go
//! through [`Registry::resolve`].
//!
//! Entries are insert-only. Writers are serialized by the store (a mutex for
//! the JSON document, an atomic upsert for SQLite); readers never block on
//! writers.

mod json_store;
mod link;
mod sqlite_store;
mod token;

pub use json_store::JsonFileStore;
pub use link::extract_folder_id;
pub use sqlite_store::SqliteStore;
pub use token::{TokenGenerator, PUBLIC_TOKEN_PREFIX};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{RegistryBackend, RegistryConfig};
use crate::error::{GateError, Result, ValidationError};

/// A registered folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Access token (primary key).
    #[serde(default)]
    pub token: String,
    /// Google Drive folder id.
    pub folder_id: String,
    /// Display label.
    #[serde(default)]
    pub name: String,
    /// Whether the token was generated randomly.
    #[serde(default = "default_private")]
    pub private: bool,
    /// Registration time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_private() -> bool {
    true
}

/// Input of [`Registry::register`].
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Display label.
    pub name: String,
    /// Folder share link.
    pub folder_link: String,
    /// Issue a random token instead of a timestamp-derived one.
    pub private: bool,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(name: impl Into<String>, folder_link: impl Into<String>, private: bool) -> Self {
        Self {
            name: name.into(),
            folder_link: folder_link.into(),
            private,
        }
    }
}

/// Persistent token → entry storage.
///
/// `insert` overwrites an existing entry with the same token.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Insert or replace an entry.
    async fn insert(&self, entry: RegistryEntry) -> Result<()>;

    /// Look up an entry by exact token.
    async fn get(&self, token: &str) -> Result<Option<RegistryEntry>>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;
}

/// Registration and token resolution on top of a [`RegistryStore`].
pub struct Registry {
    store: Arc<dyn RegistryStore>,
    tokens: TokenGenerator,
}

impl Registry {
    /// Create a registry over the given store.
    pub fn new(store: Arc<dyn RegistryStore>, token_length: usize) -> Self {
        Self {
            store,
            tokens: TokenGenerator::new(token_length),
        }
    }

    /// Open the store selected by the configuration.
    pub async fn open(config: &RegistryConfig) -> Result<Self> {
        let store: Arc<dyn RegistryStore> = match config.backend {
            RegistryBackend::Json => Arc::new(JsonFileStore::new(&config.path)),
            RegistryBackend::Sqlite => Arc::new(SqliteStore::open(&config.path).await?),
        };
        info!(backend = ?config.backend, path = %config.path, "Registry opened");
        Ok(Self::new(store, config.token_length))
    }

    /// Register a folder and return the stored entry.
    ///
    /// Nothing is written when validation fails.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<RegistryEntry> {
        let folder_id = extract_folder_id(&request.folder_link)?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName.into());
        }

        let entry = RegistryEntry {
            token: self.tokens.generate(request.private),
            folder_id,
            name: name.to_string(),
            private: request.private,
            created_at: Some(Utc::now()),
        };
        self.store.insert(entry.clone()).await?;

        info!(
            token = %entry.token,
            folder_id = %entry.folder_id,
            private = entry.private,
            "Folder registered"
        );
        Ok(entry)
    }

    /// Resolve a token to its entry.
    pub async fn resolve(&self, token: &str) -> Result<RegistryEntry> {
        match self.store.get(token).await? {
            Some(entry) => Ok(entry),
            None => {
                debug!("Token did not resolve");
                Err(GateError::Authorization)
            }
        }
    }

    /// Upsert a fixed token for a configured folder.
    pub async fn seed(&self, token: &str, folder_id: &str, name: &str) -> Result<()> {
        if token.is_empty() || folder_id.is_empty() {
            return Err(GateError::Config(
                "bootstrap token and folder id must not be empty".to_string(),
            ));
        }
        self.store
            .insert(RegistryEntry {
                token: token.to_string(),
                folder_id: folder_id.to_string(),
                name: name.to_string(),
                private: true,
                created_at: Some(Utc::now()),
            })
            .await?;
        info!(folder_id = %folder_id, "Bootstrap folder seeded");
        Ok(())
    }

    /// Number of registered folders.
    pub async fn len(&self) -> Result<usize> {
        self.store.len().await
    }

    /// Whether no folder is registered.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
