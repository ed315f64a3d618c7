//! Persistence contract for attachment metadata.

use std::future::Future;

use chrono::{DateTime, Utc};

use postline_shared::types::AttachmentId;

use super::error::AttachmentError;
use super::types::{Attachment, NewAttachment};

/// Repository trait for attachment persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait AttachmentRepository: Send + Sync {
    /// Exclusive hold on an unlinked attachment, taken by the reaper.
    type Claim: ReapClaim;

    /// Create a new, unlinked attachment record.
    fn create(
        &self,
        input: NewAttachment,
    ) -> impl Future<Output = Result<Attachment, AttachmentError>> + Send;

    /// Find attachment by ID.
    fn find_by_id(
        &self,
        id: AttachmentId,
    ) -> impl Future<Output = Result<Option<Attachment>, AttachmentError>> + Send;

    /// Find attachment by blob name.
    fn find_by_blob_name(
        &self,
        blob_name: &str,
    ) -> impl Future<Output = Result<Option<Attachment>, AttachmentError>> + Send;

    /// Unlinked attachments created strictly before `cutoff`, oldest first.
    fn find_unlinked_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Attachment>, AttachmentError>> + Send;

    /// Re-read the attachment and hold it if it is still unlinked.
    ///
    /// Returns `None` when the attachment is gone or was linked in the meantime.
    /// While the claim is held a concurrent link of the same attachment cannot commit.
    fn claim_unlinked(
        &self,
        id: AttachmentId,
    ) -> impl Future<Output = Result<Option<Self::Claim>, AttachmentError>> + Send;
}

/// A held, still-unlinked attachment.
///
/// Dropping a claim without calling either method releases it unchanged.
pub trait ReapClaim: Send {
    /// The attachment as re-read under the claim.
    fn attachment(&self) -> &Attachment;

    /// Delete the metadata row and release the claim.
    fn delete(self) -> impl Future<Output = Result<(), AttachmentError>> + Send;

    /// Release the claim leaving the row in place.
    fn release(self) -> impl Future<Output = Result<(), AttachmentError>> + Send;
}
