//! Attachment lifecycle.
//!
//! This module provides:
//! - Upload: blob write followed by an unlinked metadata record
//! - Lookup and download of stored blobs
//! - The repository contract used by post creation, post deletion and the reaper

mod error;
mod repository;
mod service;
mod types;

pub use error::AttachmentError;
pub use repository::{AttachmentRepository, ReapClaim};
pub use service::AttachmentService;
pub use types::{Attachment, NewAttachment, UploadInput};
