//! Post creation with attachment linking.

use std::sync::Arc;

use tracing::info;

use postline_shared::types::AttachmentId;

use super::error::PostError;
use super::repository::PostRepository;
use super::types::{NewPost, Post};
use crate::attachment::{AttachmentError, AttachmentRepository};

/// Creates posts, binding an uploaded attachment in the same transaction.
pub struct AttachmentLinker<P: PostRepository, A: AttachmentRepository> {
    posts: Arc<P>,
    attachments: Arc<A>,
}

impl<P: PostRepository, A: AttachmentRepository> AttachmentLinker<P, A> {
    /// Create a new linker.
    #[must_use]
    pub fn new(posts: Arc<P>, attachments: Arc<A>) -> Self {
        Self { posts, attachments }
    }

    /// Persist `post`, linking `attachment` to it when given.
    ///
    /// The attachment must exist and be unlinked. The post insert and the link
    /// commit as one transaction; the repository re-checks the link condition
    /// inside it, so a concurrent link or sweep cannot slip in between.
    ///
    /// # Errors
    ///
    /// - `AttachmentNotFound` if the attachment does not exist
    /// - `AttachmentAlreadyLinked` if it belongs to another post
    /// - a repository error if the transaction fails
    pub async fn link_on_create(
        &self,
        post: NewPost,
        attachment: Option<AttachmentId>,
    ) -> Result<Post, PostError> {
        if let Some(id) = attachment {
            let found = self
                .attachments
                .find_by_id(id)
                .await?
                .ok_or_else(|| AttachmentError::not_found(id))?;

            if let Some(post_id) = found.post_id {
                return Err(PostError::AttachmentAlreadyLinked {
                    attachment_id: id,
                    post_id,
                });
            }
        }

        let created = self.posts.insert(post, attachment).await?;

        info!(
            post_id = %created.id,
            owner_id = %created.owner_id,
            attachment_id = ?created.attachment_id().map(|a| a.into_inner()),
            "Post created"
        );

        Ok(created)
    }
}
