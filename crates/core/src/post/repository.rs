//! Persistence contracts for posts and owners.

use std::future::Future;

use postline_shared::types::{AttachmentId, PageRequest, PostId, UserId};

use super::error::PostError;
use super::types::{NewPost, Post, TimelineQuery};

/// Repository trait for post persistence.
///
/// Ids are assigned by the store, strictly increasing and visible on commit.
/// Returned posts carry their linked attachment.
pub trait PostRepository: Send + Sync {
    /// Find post by ID.
    fn find_by_id(
        &self,
        id: PostId,
    ) -> impl Future<Output = Result<Option<Post>, PostError>> + Send;

    /// One page of posts matching `query`, newest first, plus the total match count.
    fn find_page(
        &self,
        query: TimelineQuery,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<Post>, u64), PostError>> + Send;

    /// Posts with `id > anchor`, oldest first, at most `limit` of them.
    fn find_after(
        &self,
        anchor: PostId,
        owner: Option<UserId>,
        limit: Option<u64>,
    ) -> impl Future<Output = Result<Vec<Post>, PostError>> + Send;

    /// Number of posts with `id > anchor`, counted by the store.
    fn count_after(
        &self,
        anchor: PostId,
        owner: Option<UserId>,
    ) -> impl Future<Output = Result<u64, PostError>> + Send;

    /// Insert a post and, if given, link the attachment to it.
    ///
    /// Both writes commit together or not at all. The link only succeeds if the
    /// attachment is still unlinked when the transaction writes it.
    fn insert(
        &self,
        post: NewPost,
        attachment: Option<AttachmentId>,
    ) -> impl Future<Output = Result<Post, PostError>> + Send;

    /// Delete a post, deleting its attachment row first, in one transaction.
    fn delete(
        &self,
        id: PostId,
        attachment: Option<AttachmentId>,
    ) -> impl Future<Output = Result<(), PostError>> + Send;
}

/// Maps usernames to owner ids.
pub trait OwnerResolver: Send + Sync {
    /// Resolve a username.
    ///
    /// Fails with `OwnerNotFound` if no such user exists.
    fn resolve(&self, username: &str) -> impl Future<Output = Result<UserId, PostError>> + Send;
}
