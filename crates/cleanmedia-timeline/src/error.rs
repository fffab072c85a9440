//! Error types for cleanmedia-timeline.

use crate::builder::Rejection;
use std::io;
use thiserror::Error;

/// Result type for cleanmedia-timeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cleanmedia-timeline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A segment, detection or document violates an invariant.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Strict mode build aborted because at least one detection was invalid.
    #[error("Build rejected {} invalid detection(s); first: {}", .rejections.len(), first_reason(.rejections))]
    Rejected { rejections: Vec<Rejection> },

    /// Metadata document written by an unknown schema version.
    #[error("Unsupported metadata version {found} (supported: {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Metadata document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error is a version mismatch rather than a corrupt file.
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, Self::UnsupportedVersion { .. })
    }
}

fn first_reason(rejections: &[Rejection]) -> String {
    rejections
        .first()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "none".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Detection;

    #[test]
    fn test_validation_display() {
        let err = Error::validation("start must be before end");
        assert_eq!(
            err.to_string(),
            "Validation error: start must be before end"
        );
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = Error::UnsupportedVersion {
            found: 999,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported metadata version 999 (supported: 1)"
        );
        assert!(err.is_unsupported_version());
    }

    #[test]
    fn test_rejected_display_names_first_entry() {
        let err = Error::Rejected {
            rejections: vec![Rejection {
                index: 3,
                detection: Detection::new(5.0, 4.0, "profanity", "mute", 1.0, "subtitle"),
                reason: "start must be before end".to_string(),
            }],
        };
        let msg = err.to_string();
        assert!(msg.contains("1 invalid detection"));
        assert!(msg.contains("#3"));
    }

    #[test]
    fn test_io_from_std() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }
}
