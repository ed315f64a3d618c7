//! Core business logic for Postline.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached through the repository traits, files through `BlobStore`.
//!
//! # Modules
//!
//! - `post` - Timeline pagination, post creation with attachment linking, deletion
//! - `attachment` - Attachment records and uploads
//! - `reaper` - Periodic removal of never-linked attachments
//! - `storage` - Blob storage over OpenDAL

pub mod attachment;
pub mod post;
pub mod reaper;
pub mod storage;

#[cfg(test)]
mod testing;
