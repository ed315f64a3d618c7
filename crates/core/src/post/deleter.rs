//! Cascading post deletion.

use std::sync::Arc;

use tracing::{info, warn};

use postline_shared::types::{PostId, UserId};

use super::error::PostError;
use super::repository::PostRepository;
use crate::storage::BlobStore;

/// Deletes posts together with their attachment row and blob.
pub struct PostDeleter<P: PostRepository, B: BlobStore> {
    posts: Arc<P>,
    blobs: Arc<B>,
}

impl<P: PostRepository, B: BlobStore> PostDeleter<P, B> {
    /// Create a new deleter.
    #[must_use]
    pub fn new(posts: Arc<P>, blobs: Arc<B>) -> Self {
        Self { posts, blobs }
    }

    /// Delete a post owned by `requester`.
    ///
    /// The blob goes first. A blob that is already gone is logged and skipped;
    /// a blob I/O failure aborts before any row is touched. The attachment row
    /// and the post row are then removed in one transaction, attachment first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the post does not exist
    /// - `Forbidden` if `requester` does not own it
    /// - `Storage` if the blob cannot be deleted
    pub async fn delete_post(&self, post_id: PostId, requester: UserId) -> Result<(), PostError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound(post_id))?;

        if !post.is_owned_by(requester) {
            warn!(post_id = %post_id, requester = %requester, "Delete refused for non-owner");
            return Err(PostError::Forbidden(post_id));
        }

        if let Some(attachment) = &post.attachment {
            let removed = self.blobs.delete_if_exists(&attachment.blob_name).await?;
            if !removed {
                warn!(
                    post_id = %post_id,
                    blob = %attachment.blob_name,
                    "Attachment blob already absent"
                );
            }
        }

        self.posts.delete(post_id, post.attachment_id()).await?;

        info!(post_id = %post_id, had_attachment = post.attachment.is_some(), "Post deleted");
        Ok(())
    }
}
