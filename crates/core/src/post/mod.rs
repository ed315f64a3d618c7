//! Posts and the timeline.
//!
//! - `TimelineService`: keyset pagination over post ids in both directions
//! - `AttachmentLinker`: post creation, atomically claiming an uploaded attachment
//! - `PostDeleter`: owner-checked deletion cascading to the attachment and its blob

mod deleter;
mod error;
mod linker;
mod repository;
mod timeline;
mod types;

pub use deleter::PostDeleter;
pub use error::PostError;
pub use linker::AttachmentLinker;
pub use repository::{OwnerResolver, PostRepository};
pub use timeline::TimelineService;
pub use types::{Direction, NewPost, Post, TimelineQuery};
