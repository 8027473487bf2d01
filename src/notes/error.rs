//! Error types for note posting

use crate::backend::BackendError;
use crate::models::IncidentId;
use std::path::PathBuf;

/// Result type for note posting
pub type NoteResult<T> = std::result::Result<T, NoteError>;

/// Errors that can occur while posting a note
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    /// The image could not be read
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backend rejected the upload or the note
    #[error("failed to post note on incident {incident_id}: {source}")]
    Backend {
        incident_id: IncidentId,
        source: BackendError,
    },

    /// The upload response did not name the stored attachment
    #[error("attachment upload on incident {0} returned no attachment_id")]
    MissingAttachmentId(IncidentId),
}
