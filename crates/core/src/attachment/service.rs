//! Attachment service implementation.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use super::error::AttachmentError;
use super::repository::AttachmentRepository;
use super::types::{Attachment, NewAttachment, UploadInput};
use crate::storage::{BlobStore, UploadPolicy};

/// Attachment service for uploads and downloads.
pub struct AttachmentService<R: AttachmentRepository, B: BlobStore> {
    repo: Arc<R>,
    blobs: Arc<B>,
    policy: UploadPolicy,
}

impl<R: AttachmentRepository, B: BlobStore> AttachmentService<R, B> {
    /// Create a new attachment service.
    #[must_use]
    pub fn new(repo: Arc<R>, blobs: Arc<B>, policy: UploadPolicy) -> Self {
        Self {
            repo,
            blobs,
            policy,
        }
    }

    /// Store an uploaded file and record it as an unlinked attachment.
    ///
    /// The blob is written first. If the record cannot be created the blob is
    /// removed again; should that fail too, nothing references the blob.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File size exceeds limit
    /// - MIME type is not allowed
    /// - Storage write fails
    /// - Database operation fails
    pub async fn upload(&self, input: UploadInput) -> Result<Attachment, AttachmentError> {
        let content_type = input.resolved_content_type();
        let size = u64::try_from(input.bytes.len()).unwrap_or(u64::MAX);
        self.policy.validate(&content_type, size)?;

        let blob_name = self.blobs.put(input.bytes, &content_type).await?;

        let record = NewAttachment {
            created_at: Utc::now(),
            blob_name: blob_name.clone(),
            content_type,
        };

        match self.repo.create(record).await {
            Ok(attachment) => {
                info!(
                    attachment_id = %attachment.id,
                    blob = %attachment.blob_name,
                    content_type = %attachment.content_type,
                    size,
                    "Attachment uploaded"
                );
                Ok(attachment)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete_if_exists(&blob_name).await {
                    warn!(blob = %blob_name, error = %cleanup, "Failed to remove blob of unrecorded upload");
                }
                Err(e)
            }
        }
    }

    /// Load a stored file by blob name, with its metadata.
    ///
    /// # Errors
    ///
    /// Returns `BlobNotFound` if no record owns the name, or a storage error if
    /// the blob cannot be read.
    pub async fn download(&self, blob_name: &str) -> Result<(Attachment, Bytes), AttachmentError> {
        let attachment = self
            .repo
            .find_by_blob_name(blob_name)
            .await?
            .ok_or_else(|| AttachmentError::BlobNotFound(blob_name.to_string()))?;

        let bytes = self.blobs.get(&attachment.blob_name).await?;
        Ok((attachment, bytes))
    }
}
