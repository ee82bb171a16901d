//! Registry stored in SQLite.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::{RegistryEntry, RegistryStore};
use crate::error::{GateError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS folders (
    token       TEXT PRIMARY KEY NOT NULL,
    folder_id   TEXT NOT NULL,
    name        TEXT NOT NULL DEFAULT '',
    private     INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT
)
"#;

#[derive(Debug, sqlx::FromRow)]
struct FolderRow {
    token: String,
    folder_id: String,
    name: String,
    private: bool,
    created_at: Option<String>,
}

impl From<FolderRow> for RegistryEntry {
    fn from(row: FolderRow) -> Self {
        let created_at = row
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        RegistryEntry {
            token: row.token,
            folder_id: row.folder_id,
            name: row.name,
            private: row.private,
            created_at,
        }
    }
}

/// SQLite store. Inserts are single-statement upserts.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) a database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening registry database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory registry database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // A second connection would see a different in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for SqliteStore {
    async fn insert(&self, entry: RegistryEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO folders (token, folder_id, name, private, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(token) DO UPDATE SET
                folder_id = excluded.folder_id,
                name = excluded.name,
                private = excluded.private,
                created_at = excluded.created_at",
        )
        .bind(&entry.token)
        .bind(&entry.folder_id)
        .bind(&entry.name)
        .bind(entry.private)
        .bind(entry.created_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<RegistryEntry>> {
        let row = sqlx::query_as::<_, FolderRow>(
            "SELECT token, folder_id, name, private, created_at FROM folders WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RegistryEntry::from))
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders")
            .fetch_one(&self.pool)
            .await?;
        usize::try_from(count).map_err(|e| GateError::Persistence(e.to_string()))
    }
}
