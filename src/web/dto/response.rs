//! Response DTOs for Web API.

use serde::Serialize;

use crate::registry::RegistryEntry;

/// Path of the gallery page.
pub const GALLERY_PATH: &str = "/gallery";

/// Folder registration response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFolderResponse {
    /// Issued token.
    pub token: String,
    /// Gallery page for the token.
    pub gallery_path: String,
}

impl From<&RegistryEntry> for RegisterFolderResponse {
    fn from(entry: &RegistryEntry) -> Self {
        Self {
            token: entry.token.clone(),
            gallery_path: format!(
                "{GALLERY_PATH}?token={}",
                urlencoding::encode(&entry.token)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_response_shape() {
        let entry = RegistryEntry {
            token: "Ab3dE9xZ".to_string(),
            folder_id: "1F".to_string(),
            name: "Trip".to_string(),
            private: true,
            created_at: None,
        };
        let value = serde_json::to_value(RegisterFolderResponse::from(&entry)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"token": "Ab3dE9xZ", "galleryPath": "/gallery?token=Ab3dE9xZ"})
        );
    }
}
