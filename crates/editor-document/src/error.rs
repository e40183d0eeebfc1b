//! Error types.
//!
//! Errors are split by concern:
//!
//! - [`DocumentError`]: recoverable I/O outcomes of a load or save session. These are reported
//!   verbatim through [`crate::DocumentEvent::Loaded`] / [`crate::DocumentEvent::Saved`] and are
//!   never retried automatically.
//! - [`SessionError`]: caller contract violations (starting a second concurrent load/save,
//!   saving a document that has no location). They fail fast and leave the document untouched.
//! - [`EditError`]: invalid buffer offsets/ranges.
//! - [`crate::SearchError`] lives next to the search engine.

use std::io;

use thiserror::Error;

/// Recoverable failure of a load or save session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("file not found: {0}")]
    /// The location does not exist.
    NotFound(String),

    #[error("permission denied: {0}")]
    /// The location exists but cannot be read or written.
    PermissionDenied(String),

    #[error("{0} is a directory")]
    /// The location points to a directory.
    IsDirectory(String),

    #[error("unsupported location scheme '{0}'")]
    /// The collaborator cannot handle this kind of location.
    UnsupportedScheme(String),

    #[error("unsupported character encoding '{0}'")]
    /// The requested character encoding is unknown to the collaborator.
    UnsupportedEncoding(String),

    #[error("the contents could not be converted using the '{encoding}' character encoding")]
    /// The contents are not valid in the requested encoding.
    ConversionFailed {
        /// Charset name of the encoding that failed.
        encoding: String,
    },

    #[error("the file has been modified since it was last loaded or saved")]
    /// Stale-save conflict: the file on disk is newer than the document's modification time.
    ExternallyModified,

    #[error("operation canceled")]
    /// The session was canceled on request.
    Canceled,

    #[error("I/O error: {message}")]
    /// Any other I/O failure.
    Io {
        /// Kind of the underlying I/O error.
        kind: io::ErrorKind,
        /// Human readable message of the underlying I/O error.
        message: String,
    },
}

impl DocumentError {
    /// Map an I/O error raised while accessing `target` into the document error taxonomy.
    pub fn from_io(err: io::Error, target: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(target.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(target.to_string()),
            io::ErrorKind::IsADirectory => Self::IsDirectory(target.to_string()),
            kind => Self::Io {
                kind,
                message: err.to_string(),
            },
        }
    }

    /// Returns `true` for [`DocumentError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Caller contract violation when starting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a load is already in progress for this document")]
    /// A load session is already active.
    LoadInProgress,

    #[error("a save is already in progress for this document")]
    /// A save session is already active.
    SaveInProgress,

    #[error("the document has no location to save to")]
    /// `save` was called on an untitled document.
    NoLocation,
}

/// Invalid buffer edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("invalid offset: {0}")]
    /// Offset is past the end of the buffer.
    InvalidOffset(usize),

    #[error("invalid range: {start}..{end}")]
    /// Range is reversed or past the end of the buffer.
    InvalidRange {
        /// Inclusive start character offset.
        start: usize,
        /// Exclusive end character offset.
        end: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let err = DocumentError::from_io(io::Error::from(io::ErrorKind::NotFound), "/tmp/x");
        assert_eq!(err, DocumentError::NotFound("/tmp/x".to_string()));
        assert!(err.is_not_found());

        let err = DocumentError::from_io(
            io::Error::from(io::ErrorKind::PermissionDenied),
            "/tmp/x",
        );
        assert_eq!(err, DocumentError::PermissionDenied("/tmp/x".to_string()));

        let err = DocumentError::from_io(io::Error::other("boom"), "/tmp/x");
        assert!(matches!(
            err,
            DocumentError::Io {
                kind: io::ErrorKind::Other,
                ..
            }
        ));
    }
}
