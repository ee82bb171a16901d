//! Request DTOs for Web API.

use serde::Deserialize;

use crate::archive::ArchiveRequest;
use crate::registry::RegistrationRequest;

/// Folder registration request.
///
/// Missing fields deserialize as empty so that they are reported by
/// registration validation rather than as malformed JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFolderRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Shareable Google Drive folder link.
    #[serde(default)]
    pub folder_link: String,
    /// Whether the token should be unguessable.
    #[serde(default = "default_private")]
    pub private: bool,
}

fn default_private() -> bool {
    true
}

impl From<RegisterFolderRequest> for RegistrationRequest {
    fn from(req: RegisterFolderRequest) -> Self {
        RegistrationRequest::new(req.name, req.folder_link, req.private)
    }
}

/// `?token=` query parameter.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    /// Access token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Archive download request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Access token.
    #[serde(default)]
    pub token: Option<String>,
    /// Files to include, in archive order.
    #[serde(default)]
    pub file_ids: Option<Vec<String>>,
}

impl TryFrom<DownloadRequest> for ArchiveRequest {
    type Error = crate::GateError;

    fn try_from(req: DownloadRequest) -> Result<Self, Self::Error> {
        ArchiveRequest::new(req.token, req.file_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_defaults_private() {
        let req: RegisterFolderRequest = serde_json::from_str(
            r#"{"name": "Trip", "folderLink": "https://drive.google.com/drive/folders/x"}"#,
        )
        .unwrap();
        assert_eq!(req.name, "Trip");
        assert!(req.private);
    }

    #[test]
    fn test_register_request_missing_fields() {
        let req: RegisterFolderRequest = serde_json::from_str("{}").unwrap();
        assert!(req.name.is_empty());
        assert!(req.folder_link.is_empty());
    }

    #[test]
    fn test_download_request_camel_case() {
        let req: DownloadRequest =
            serde_json::from_str(r#"{"token": "abc", "fileIds": ["1", "2"]}"#).unwrap();
        let archive = ArchiveRequest::try_from(req).unwrap();
        assert_eq!(archive.token, "abc");
        assert_eq!(archive.file_ids, vec!["1", "2"]);
    }
}
