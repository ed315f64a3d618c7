//! Background removal of attachments that were uploaded but never linked.
//!
//! A sweep lists unlinked attachments older than the retention window, then for
//! each one re-reads it under a claim, deletes the blob and deletes the row.
//! Blob failures defer the candidate to the next sweep. Only one sweep runs at
//! a time.

mod service;

pub use service::{Reaper, SweepReport};
