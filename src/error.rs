//! Error types for drivegate.

use thiserror::Error;

/// Rejected request input.
///
/// The display text is shown to clients as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The folder link is not a Google Drive folder link.
    #[error("Invalid Google Drive folder link.")]
    InvalidLink,

    /// The display name is empty.
    #[error("Please provide a name.")]
    MissingName,

    /// No access token was supplied.
    #[error("Missing token")]
    MissingToken,

    /// The archive request selected no files.
    #[error("No files selected")]
    EmptySelection,
}

/// Common error type for drivegate.
#[derive(Error, Debug)]
pub enum GateError {
    /// Malformed or missing request fields.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The token does not resolve in the registry.
    #[error("invalid token")]
    Authorization,

    /// A call to the remote store failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Reading or writing the registry failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for GateError {
    fn from(e: sqlx::Error) -> Self {
        GateError::Persistence(e.to_string())
    }
}

impl From<reqwest::Error> for GateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GateError::Upstream(format!("request timed out: {e}"))
        } else {
            GateError::Upstream(e.to_string())
        }
    }
}

/// Result type alias for drivegate operations.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = GateError::Validation(ValidationError::InvalidLink);
        assert_eq!(
            err.to_string(),
            "validation error: Invalid Google Drive folder link."
        );
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: GateError = ValidationError::EmptySelection.into();
        assert!(matches!(
            err,
            GateError::Validation(ValidationError::EmptySelection)
        ));
    }

    #[test]
    fn test_authorization_error_display() {
        assert_eq!(GateError::Authorization.to_string(), "invalid token");
    }

    #[test]
    fn test_upstream_error_display() {
        let err = GateError::Upstream("HTTP 404".to_string());
        assert_eq!(err.to_string(), "upstream error: HTTP 404");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GateError = io_err.into();
        assert!(matches!(err, GateError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
