//! Bulk ZIP download.
//!
//! [`ArchivePipeline::stream_archive`] checks the token, then spawns a job
//! that walks the requested files in order: fetch metadata, open the remote
//! stream, copy it into the ZIP encoder, close it, move on. Encoded bytes
//! reach the HTTP body through a bounded channel.
//!
//! Failures after the first byte is queued cannot become an error response.
//! The job stops at the first failed file, pushes an error into the channel
//! and the body terminates abnormally, leaving the client with a truncated
//! archive. Later files are never requested.

mod naming;
mod writer;

pub use naming::{
    archive_filename, content_disposition, sanitize_entry_name, EntryNamer, FALLBACK_ENTRY_NAME,
};
pub use writer::ZipStreamWriter;

use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::ArchiveConfig;
use crate::drive::DriveSource;
use crate::error::{GateError, Result, ValidationError};
use crate::registry::Registry;

/// Media type of the archive response.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Tunables of the pipeline.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Filename used when the folder name gives none.
    pub default_filename: String,
    /// Deflate level.
    pub compression_level: i64,
    /// Chunks buffered ahead of the client.
    pub channel_capacity: usize,
    /// Bound on metadata fetch and content open.
    pub fetch_timeout: Duration,
    /// Bound on the wait for each content chunk.
    pub idle_timeout: Duration,
}

impl From<&ArchiveConfig> for ArchiveOptions {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            default_filename: config.default_filename.clone(),
            compression_level: config.compression_level,
            channel_capacity: config.channel_capacity.max(1),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::from(&ArchiveConfig::default())
    }
}

/// A validated download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Access token.
    pub token: String,
    /// Files to include, in order, without duplicates.
    pub file_ids: Vec<String>,
}

impl ArchiveRequest {
    /// Validate raw request fields.
    ///
    /// Empty ids are ignored and repeated ids keep their first position.
    pub fn new(token: Option<String>, file_ids: Option<Vec<String>>) -> Result<Self> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(ValidationError::MissingToken)?;

        let mut seen = HashSet::new();
        let file_ids: Vec<String> = file_ids
            .unwrap_or_default()
            .into_iter()
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        if file_ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        Ok(Self { token, file_ids })
    }
}

/// An archive being produced.
pub struct ArchiveStream {
    filename: String,
    receiver: mpsc::Receiver<io::Result<Bytes>>,
}

impl ArchiveStream {
    /// Download filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Archive bytes. An `Err` item means the archive was aborted.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        futures::stream::unfold(self.receiver, |mut receiver| async move {
            receiver.recv().await.map(|item| (item, receiver))
        })
    }
}

/// Builds ZIP archives of registered folders' files.
pub struct ArchivePipeline {
    registry: Arc<Registry>,
    source: Arc<dyn DriveSource>,
    options: ArchiveOptions,
}

impl ArchivePipeline {
    /// Create a pipeline.
    pub fn new(
        registry: Arc<Registry>,
        source: Arc<dyn DriveSource>,
        options: ArchiveOptions,
    ) -> Self {
        Self {
            registry,
            source,
            options,
        }
    }

    /// Resolve the token and start streaming the archive.
    ///
    /// Errors returned here happen before any archive byte exists. Nothing
    /// is requested from the remote store for an unknown token.
    pub async fn stream_archive(&self, request: ArchiveRequest) -> Result<ArchiveStream> {
        let entry = self.registry.resolve(&request.token).await?;
        let filename = archive_filename(&entry.name, &self.options.default_filename);

        let (tx, receiver) = mpsc::channel(self.options.channel_capacity);
        let job = ArchiveJob {
            source: self.source.clone(),
            folder_id: entry.folder_id,
            file_ids: request.file_ids,
            options: self.options.clone(),
            tx,
        };
        info!(
            folder_id = %job.folder_id,
            files = job.file_ids.len(),
            filename = %filename,
            "Archive started"
        );
        tokio::spawn(job.run());

        Ok(ArchiveStream { filename, receiver })
    }
}

/// Why a job stopped early.
enum Abort {
    /// The receiving side is gone.
    Disconnected,
    /// A file could not be added.
    Failed(GateError),
}

impl From<GateError> for Abort {
    fn from(e: GateError) -> Self {
        Abort::Failed(e)
    }
}

struct ArchiveJob {
    source: Arc<dyn DriveSource>,
    folder_id: String,
    file_ids: Vec<String>,
    options: ArchiveOptions,
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ArchiveJob {
    async fn run(self) {
        let started = Instant::now();
        match self.write_archive().await {
            Ok(bytes) => info!(
                folder_id = %self.folder_id,
                files = self.file_ids.len(),
                bytes,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Archive completed"
            ),
            Err(Abort::Disconnected) => info!(
                folder_id = %self.folder_id,
                "Client disconnected, archive abandoned"
            ),
            Err(Abort::Failed(e)) => {
                error!(folder_id = %self.folder_id, error = %e, "Archive aborted");
                let _ = self
                    .tx
                    .send(Err(io::Error::other("archive aborted: a file could not be fetched")))
                    .await;
            }
        }
    }

    async fn write_archive(&self) -> std::result::Result<u64, Abort> {
        let mut writer = ZipStreamWriter::new(self.options.compression_level);
        let mut namer = EntryNamer::default();
        let mut sent = 0u64;

        for (index, file_id) in self.file_ids.iter().enumerate() {
            let meta = self
                .bounded(
                    self.options.fetch_timeout,
                    self.source.file_metadata(file_id),
                    "metadata fetch",
                )
                .await?;
            if !meta.parents.iter().any(|p| p == &self.folder_id) {
                return Err(Abort::Failed(GateError::Upstream(format!(
                    "file {file_id} is not in folder {}",
                    self.folder_id
                ))));
            }

            let entry_name = namer.unique(meta.name.as_deref());
            let mut content = self
                .bounded(
                    self.options.fetch_timeout,
                    self.source.open_content(file_id),
                    "content open",
                )
                .await?;

            writer.start_entry(&entry_name, meta.size)?;
            loop {
                let chunk = self
                    .bounded(
                        self.options.idle_timeout,
                        async {
                            content.next().await.transpose().map_err(|e| {
                                GateError::Upstream(format!("reading {file_id} failed: {e}"))
                            })
                        },
                        "content read",
                    )
                    .await?;
                let Some(chunk) = chunk else { break };
                writer.write_chunk(&chunk)?;
                sent += self.send(writer.take_output()).await?;
            }
            drop(content);
            writer.end_entry()?;
            sent += self.send(writer.take_output()).await?;

            debug!(file_id = %file_id, entry = %entry_name, index, "Entry appended");
        }

        sent += self.send(writer.finish()?).await?;
        Ok(sent)
    }

    /// Await `fut` unless it times out or the client goes away first.
    async fn bounded<T, F>(
        &self,
        limit: Duration,
        fut: F,
        what: &str,
    ) -> std::result::Result<T, Abort>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = self.tx.closed() => Err(Abort::Disconnected),
            outcome = tokio::time::timeout(limit, fut) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(Abort::Failed(e)),
                Err(_) => Err(Abort::Failed(GateError::Upstream(format!(
                    "{what} timed out after {limit:?}"
                )))),
            },
        }
    }

    async fn send(&self, chunk: Vec<u8>) -> std::result::Result<u64, Abort> {
        if chunk.is_empty() {
            return Ok(0);
        }
        let len = chunk.len() as u64;
        self.tx
            .send(Ok(Bytes::from(chunk)))
            .await
            .map_err(|_| Abort::Disconnected)?;
        Ok(len)
    }
}
