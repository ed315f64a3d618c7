//! Post error types.

use thiserror::Error;

use postline_shared::AppError;
use postline_shared::types::{AttachmentId, PostId};

use crate::attachment::AttachmentError;
use crate::storage::StorageError;

/// Post and timeline errors.
#[derive(Debug, Error)]
pub enum PostError {
    /// Post not found.
    #[error("post not found: {0}")]
    NotFound(PostId),

    /// Username does not resolve to a user.
    #[error("user not found: {0}")]
    OwnerNotFound(String),

    /// Caller does not own the post.
    #[error("not allowed to delete post {0}")]
    Forbidden(PostId),

    /// Content failed validation.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// Referenced attachment does not exist.
    #[error("attachment not found: {0}")]
    AttachmentNotFound(AttachmentId),

    /// Referenced attachment belongs to another post.
    #[error("attachment {attachment_id} is already linked to post {post_id}")]
    AttachmentAlreadyLinked {
        /// The attachment.
        attachment_id: AttachmentId,
        /// The post that owns it.
        post_id: PostId,
    },

    /// Blob storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl PostError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<AttachmentError> for PostError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::NotFound(id) => Self::AttachmentNotFound(id),
            AttachmentError::AlreadyLinked {
                attachment_id,
                post_id,
            } => Self::AttachmentAlreadyLinked {
                attachment_id,
                post_id,
            },
            AttachmentError::Storage(e) => Self::Storage(e),
            AttachmentError::BlobNotFound(name) => Self::Storage(StorageError::not_found(name)),
            AttachmentError::Repository(msg) => Self::Repository(msg),
        }
    }
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::NotFound(_)
            | PostError::OwnerNotFound(_)
            | PostError::AttachmentNotFound(_) => Self::NotFound(err.to_string()),
            PostError::Forbidden(_) => Self::Forbidden(err.to_string()),
            PostError::InvalidContent(msg) => Self::Validation(msg),
            PostError::AttachmentAlreadyLinked { .. } => Self::Conflict(err.to_string()),
            PostError::Storage(e) => e.into(),
            PostError::Repository(msg) => Self::Database(msg),
        }
    }
}
