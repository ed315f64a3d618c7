//! Repository implementations for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod attachment;
pub mod post;
pub mod user;

pub use attachment::{AttachmentRepository, DbReapClaim};
pub use post::PostRepository;
pub use user::UserRepository;
