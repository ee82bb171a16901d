//! Folder-link parsing.

use url::Url;

use crate::error::ValidationError;

/// Host serving Google Drive share links.
const DRIVE_HOST: &str = "drive.google.com";

/// Extract the folder id from a Google Drive folder share link.
///
/// Accepts `http(s)://drive.google.com/.../folders/<id>[/...][?...]` where
/// `<id>` is made of ASCII letters, digits, `-` and `_`.
pub fn extract_folder_id(link: &str) -> Result<String, ValidationError> {
    let url = Url::parse(link.trim()).map_err(|_| ValidationError::InvalidLink)?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str() != Some(DRIVE_HOST) {
        return Err(ValidationError::InvalidLink);
    }

    let segments: Vec<&str> = url
        .path_segments()
        .ok_or(ValidationError::InvalidLink)?
        .collect();

    let id = segments
        .windows(2)
        .find(|pair| pair[0] == "folders")
        .map(|pair| pair[1])
        .ok_or(ValidationError::InvalidLink)?;

    if is_valid_id(id) {
        Ok(id.to_string())
    } else {
        Err(ValidationError::InvalidLink)
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_link() {
        assert_eq!(
            extract_folder_id("https://drive.google.com/drive/folders/1AbC-d_9").unwrap(),
            "1AbC-d_9"
        );
    }

    #[test]
    fn test_link_with_query_and_user_index() {
        assert_eq!(
            extract_folder_id("https://drive.google.com/drive/folders/1xyz?usp=sharing").unwrap(),
            "1xyz"
        );
        assert_eq!(
            extract_folder_id("https://drive.google.com/drive/u/0/folders/1xyz").unwrap(),
            "1xyz"
        );
        assert_eq!(
            extract_folder_id("  https://DRIVE.google.com/drive/folders/1xyz/  ").unwrap(),
            "1xyz"
        );
    }

    #[test]
    fn test_rejects_non_links() {
        assert_eq!(
            extract_folder_id("not-a-drive-link"),
            Err(ValidationError::InvalidLink)
        );
        assert_eq!(extract_folder_id(""), Err(ValidationError::InvalidLink));
    }

    #[test]
    fn test_rejects_other_hosts() {
        assert_eq!(
            extract_folder_id("https://example.com/drive/folders/1xyz"),
            Err(ValidationError::InvalidLink)
        );
        assert_eq!(
            extract_folder_id("ftp://drive.google.com/drive/folders/1xyz"),
            Err(ValidationError::InvalidLink)
        );
    }

    #[test]
    fn test_rejects_file_links_and_bad_ids() {
        assert_eq!(
            extract_folder_id("https://drive.google.com/file/d/1xyz/view"),
            Err(ValidationError::InvalidLink)
        );
        assert_eq!(
            extract_folder_id("https://drive.google.com/drive/folders/"),
            Err(ValidationError::InvalidLink)
        );
        assert_eq!(
            extract_folder_id("https://drive.google.com/drive/folders/ab%20cd"),
            Err(ValidationError::InvalidLink)
        );
    }
}
