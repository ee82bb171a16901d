//! Drive v3 REST client.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::auth::{ServiceAccountAuth, ServiceAccountKey};
use super::{ByteStream, DriveSource, FileDescriptor, FileMetadata};
use crate::config::DriveConfig;
use crate::{GateError, Result};

/// User agent sent to the Drive API.
const USER_AGENT: &str = concat!("drivegate/", env!("CARGO_PKG_VERSION"));

/// Fields requested when listing a folder.
const LIST_FIELDS: &str =
    "nextPageToken,files(id,name,mimeType,webViewLink,webContentLink,trashed)";

/// Fields requested for archive entries.
const METADATA_FIELDS: &str = "name,parents,size";

/// Page size for folder listings (the API maximum).
const PAGE_SIZE: &str = "1000";

/// Upper bound on listing pages followed for one folder.
const MAX_PAGES: usize = 100;

/// Source of bearer tokens for Drive requests.
pub enum Authorizer {
    /// Service-account JWT grant.
    ServiceAccount(ServiceAccountAuth),
    /// A fixed access token.
    Static(String),
}

impl Authorizer {
    async fn bearer(&self) -> Result<String> {
        match self {
            Authorizer::ServiceAccount(auth) => auth.access_token().await,
            Authorizer::Static(token) => Ok(token.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPage {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    web_view_link: Option<String>,
    #[serde(default)]
    web_content_link: Option<String>,
    #[serde(default)]
    trashed: bool,
}

impl From<RemoteFile> for FileDescriptor {
    fn from(file: RemoteFile) -> Self {
        FileDescriptor {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            web_view_link: file.web_view_link,
            web_content_link: file.web_content_link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parents: Vec<String>,
    /// The API encodes int64 values as strings.
    #[serde(default)]
    size: Option<String>,
}

impl From<RemoteMetadata> for FileMetadata {
    fn from(meta: RemoteMetadata) -> Self {
        FileMetadata {
            name: meta.name.filter(|n| !n.is_empty()),
            parents: meta.parents,
            size: meta.size.and_then(|s| s.parse().ok()),
        }
    }
}

/// Quote a value for use inside a Drive search query string literal.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Google Drive client.
pub struct DriveClient {
    http: Client,
    api_base: Url,
    auth: Authorizer,
    request_timeout: Duration,
}

impl DriveClient {
    /// Build a client authenticated with the configured service account.
    pub fn from_config(config: &DriveConfig) -> Result<Self> {
        let key = match (&config.credentials_json, &config.credentials_file) {
            (Some(json), _) => ServiceAccountKey::from_json(json)?,
            (None, Some(path)) => ServiceAccountKey::from_file(path)?,
            (None, None) => {
                return Err(GateError::Config(
                    "no Google service-account credentials configured".to_string(),
                ))
            }
        };

        let http = Self::build_http(config)?;
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let auth = ServiceAccountAuth::new(key, http.clone(), request_timeout)?;
        tracing::info!(client_email = %auth.client_email(), "Drive client configured");

        Self::with_authorizer(config, http, Authorizer::ServiceAccount(auth))
    }

    /// Build a client that sends a fixed access token.
    pub fn with_static_token(config: &DriveConfig, token: impl Into<String>) -> Result<Self> {
        let http = Self::build_http(config)?;
        Self::with_authorizer(config, http, Authorizer::Static(token.into()))
    }

    fn with_authorizer(config: &DriveConfig, http: Client, auth: Authorizer) -> Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| GateError::Config(format!("invalid drive.api_base: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(GateError::Config(
                "drive.api_base must be an http(s) URL".to_string(),
            ));
        }
        Ok(Self {
            http,
            api_base,
            auth,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Content downloads can run much longer than any total timeout, so the
    /// shared client only bounds connecting and idle reads.
    fn build_http(config: &DriveConfig) -> Result<Client> {
        Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GateError::Config(format!("failed to create HTTP client: {e}")))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| GateError::Config("drive.api_base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        Ok(builder.bearer_auth(self.auth.bearer().await?))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let request = self
            .authorized(self.http.get(url).query(query).timeout(self.request_timeout))
            .await?;
        let response = check_status(request.send().await?, what).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-success response into an upstream error, logging the body.
async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%status, what, body = %body, "Drive API request failed");
    Err(GateError::Upstream(format!("{what} failed with HTTP {status}")))
}

#[async_trait]
impl DriveSource for DriveClient {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<FileDescriptor>> {
        let q = format!(
            "'{}' in parents and trashed = false",
            escape_query_literal(folder_id)
        );

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        for page_no in 0..MAX_PAGES {
            let mut query = vec![
                ("q", q.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: FileListPage = self.get_json(&["files"], &query, "list files").await?;
            debug!(folder_id, page_no, count = page.files.len(), "Listed page");
            files.extend(
                page.files
                    .into_iter()
                    .filter(|f| !f.trashed)
                    .map(FileDescriptor::from),
            );

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => return Ok(files),
            }
        }

        warn!(folder_id, "Listing truncated after {} pages", MAX_PAGES);
        Ok(files)
    }

    async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata> {
        let meta: RemoteMetadata = self
            .get_json(
                &["files", file_id],
                &[("fields", METADATA_FIELDS), ("supportsAllDrives", "true")],
                "get file metadata",
            )
            .await?;
        Ok(meta.into())
    }

    async fn open_content(&self, file_id: &str) -> Result<ByteStream> {
        let url = self.endpoint(&["files", file_id])?;
        let request = self
            .authorized(
                self.http
                    .get(url)
                    .query(&[("alt", "media"), ("supportsAllDrives", "true")]),
            )
            .await?;
        let response = check_status(request.send().await?, "download file").await?;

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }
}
