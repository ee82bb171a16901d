//! Google Drive access.
//!
//! [`DriveSource`] is the seam between the gallery and the remote store:
//! [`DriveClient`] talks to the Drive v3 REST API, tests substitute an
//! in-memory implementation.

mod auth;
mod client;

pub use auth::{ServiceAccountAuth, ServiceAccountKey, DRIVE_READONLY_SCOPE};
pub use client::{Authorizer, DriveClient};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::Result;

/// Content of one remote file, chunk by chunk.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A file listed in a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Drive file id.
    pub id: String,
    /// File name.
    pub name: String,
    /// Media type.
    pub mime_type: String,
    /// Link to the Drive viewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    /// Direct download link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
}

/// Metadata needed to add a file to an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    /// File name, when the provider reports one.
    pub name: Option<String>,
    /// Ids of the folders containing the file.
    pub parents: Vec<String>,
    /// Size in bytes, when known.
    pub size: Option<u64>,
}

/// Read-only access to a remote file store.
#[async_trait]
pub trait DriveSource: Send + Sync {
    /// List the non-trashed children of a folder.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<FileDescriptor>>;

    /// Fetch a file's metadata.
    async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata>;

    /// Open a file's content.
    async fn open_content(&self, file_id: &str) -> Result<ByteStream>;
}
