//! Blob storage for attachment files using Apache OpenDAL.
//!
//! Supported backends:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem
//! - Process memory (tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 BlobStore (put / delete_if_exists / get)        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      Apache OpenDAL                             │
//! │ op.write("key", data)      │ op.stat("key")                     │
//! │ op.read("key")             │ op.delete("key")                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod service;

pub use config::{StorageConfig, UploadPolicy};
pub use error::StorageError;
pub use postline_shared::config::StorageProvider;
pub use service::{BlobStore, StorageService};
