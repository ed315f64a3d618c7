//! Attachment error types.

use thiserror::Error;

use postline_shared::AppError;
use postline_shared::types::{AttachmentId, PostId};

use crate::storage::StorageError;

/// Attachment operation errors.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Attachment not found.
    #[error("attachment not found: {0}")]
    NotFound(AttachmentId),

    /// No attachment record owns this blob name.
    #[error("attachment blob not found: {0}")]
    BlobNotFound(String),

    /// Attachment already belongs to a post.
    #[error("attachment {attachment_id} is already linked to post {post_id}")]
    AlreadyLinked {
        /// The attachment.
        attachment_id: AttachmentId,
        /// The post that owns it.
        post_id: PostId,
    },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl AttachmentError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(id: AttachmentId) -> Self {
        Self::NotFound(id)
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => Self::NotFound(format!("blob {key}")),
            e if e.is_rejection() => Self::Validation(e.to_string()),
            e => Self::Storage(e.to_string()),
        }
    }
}

impl From<AttachmentError> for AppError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::NotFound(_) | AttachmentError::BlobNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            AttachmentError::AlreadyLinked { .. } => Self::Conflict(err.to_string()),
            AttachmentError::Storage(e) => e.into(),
            AttachmentError::Repository(msg) => Self::Database(msg),
        }
    }
}
